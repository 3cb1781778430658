// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the bus client facade over a mock bus.

use std::sync::Arc;
use std::time::Duration;

use busline_client::{BusClientFacade, FacadeState};
use busline_config::complete_str;
use busline_core::{BuslineError, Handler, QoS};
use busline_router::CallbackRegistry;
use busline_test_utils::{FailingHandler, MockBusClient, RecordingHandler, TestHarness};

const NON_BLOCKING: &str = r#"
[mqtt_session]
client_id = "loung"
loop_mode = "non_blocking"

[subscription]
qos = 1
"#;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn start_before_initialise_is_a_state_error() {
    let (client, handle) = MockBusClient::new();
    let mut facade = BusClientFacade::new(Box::new(client), Arc::new(CallbackRegistry::new()));

    let err = facade.start().await.unwrap_err();
    assert!(matches!(err, BuslineError::State { operation: "start", .. }));
    assert_eq!(err.to_string(), "cannot start while Unconfigured");
    assert!(handle.calls().is_empty());
    assert_eq!(facade.state(), FacadeState::Unconfigured);
}

#[tokio::test]
async fn initialise_twice_is_a_state_error() {
    let mut harness = TestHarness::new(NON_BLOCKING, vec![]).unwrap();
    let config = complete_str(NON_BLOCKING).unwrap();
    let err = harness.facade.initialise(config).unwrap_err();
    assert!(matches!(err, BuslineError::State { operation: "initialise", .. }));
    assert_eq!(harness.facade.state(), FacadeState::Initialised);
}

#[tokio::test]
async fn replies_are_published_and_stop_tears_down() {
    let handler: Arc<dyn Handler> = RecordingHandler::new("ping").replying_on("loung/pong").shared();
    let mut harness = TestHarness::new(NON_BLOCKING, vec![handler]).unwrap();

    harness.facade.start().await.unwrap();
    assert_eq!(harness.facade.state(), FacadeState::Connected);
    assert_eq!(harness.bus.subscriptions(), vec![("loung/+".to_string(), QoS::AtLeastOnce)]);

    harness.bus.inject("loung/ping", "42");
    let published = harness.bus.wait_for_published(1, WAIT).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "loung/pong");
    assert_eq!(published[0].payload_str(), "42");

    harness.facade.stop().await.unwrap();
    assert_eq!(harness.facade.state(), FacadeState::Disconnected);
    assert_eq!(
        harness.bus.calls(),
        vec!["connect", "subscribe", "unsubscribe", "disconnect"]
    );
    assert!(!harness.bus.is_connected());
}

#[tokio::test]
async fn connect_failure_leaves_facade_disconnected() {
    let mut harness = TestHarness::new(NON_BLOCKING, vec![]).unwrap();
    harness.bus.fail_connect(true);

    let err = harness.facade.start().await.unwrap_err();
    assert!(matches!(err, BuslineError::Bus { .. }));
    assert_eq!(harness.facade.state(), FacadeState::Disconnected);
    assert_eq!(harness.bus.calls(), vec!["connect", "disconnect"]);
}

#[tokio::test]
async fn subscribe_failure_closes_the_connection() {
    let mut harness = TestHarness::new(NON_BLOCKING, vec![]).unwrap();
    harness.bus.fail_subscribe(true);

    assert!(harness.facade.start().await.is_err());
    assert_eq!(harness.facade.state(), FacadeState::Disconnected);
    assert_eq!(harness.bus.calls(), vec!["connect", "subscribe", "disconnect"]);
    assert!(!harness.bus.is_connected());
}

#[tokio::test]
async fn stop_is_idempotent_from_any_state() {
    let (client, _handle) = MockBusClient::new();
    let mut facade = BusClientFacade::new(Box::new(client), Arc::new(CallbackRegistry::new()));
    facade.stop().await.unwrap();
    assert_eq!(facade.state(), FacadeState::Disconnected);
    facade.stop().await.unwrap();
    assert_eq!(facade.state(), FacadeState::Disconnected);

    let err = facade.start().await.unwrap_err();
    assert_eq!(err.to_string(), "cannot start while Disconnected");
}

#[tokio::test]
async fn bad_messages_do_not_stop_the_loop() {
    let recorder = RecordingHandler::new("ping").replying_on("loung/pong").shared();
    let failing = Arc::new(FailingHandler::new("ping"));
    let mut harness = TestHarness::new(
        NON_BLOCKING,
        vec![failing.clone() as Arc<dyn Handler>, recorder.clone() as Arc<dyn Handler>],
    )
    .unwrap();
    harness.facade.start().await.unwrap();

    harness.bus.inject("elsewhere/ping", "1");
    harness.bus.inject("loung/unknown", "1");
    harness.bus.inject("loung/ping", "");
    harness.bus.inject("loung/ping", "true");

    let published = harness.bus.wait_for_published(1, WAIT).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload_str(), "true");
    assert_eq!(failing.calls(), 1);
    assert_eq!(recorder.count(), 1);

    harness.facade.stop().await.unwrap();
}

#[tokio::test]
async fn publish_failure_does_not_stop_the_loop() {
    let recorder = RecordingHandler::new("ping").replying_on("loung/pong").shared();
    let mut harness = TestHarness::new(NON_BLOCKING, vec![recorder.clone() as Arc<dyn Handler>]).unwrap();
    harness.facade.start().await.unwrap();

    harness.bus.fail_publish(true);
    harness.bus.inject("loung/ping", "1");
    while recorder.count() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    harness.bus.fail_publish(false);
    harness.bus.inject("loung/ping", "2");

    let published = harness.bus.wait_for_published(1, WAIT).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload_str(), "2");
    harness.facade.stop().await.unwrap();
}

#[tokio::test]
async fn closed_bus_ends_the_loop_cleanly() {
    let mut harness = TestHarness::new(NON_BLOCKING, vec![]).unwrap();
    harness.facade.start().await.unwrap();
    harness.bus.close();

    assert!(harness.bus.wait_for_call("disconnect", WAIT).await);
    harness.facade.stop().await.unwrap();
    assert_eq!(harness.facade.state(), FacadeState::Disconnected);
}

#[tokio::test]
async fn blocking_mode_returns_after_cancellation() {
    let config = "[mqtt_session]\nclient_id = \"loung\"\nloop_mode = \"blocking\"\n";
    let recorder = RecordingHandler::new("ping").replying_on("loung/pong").shared();
    let mut harness = TestHarness::new(config, vec![recorder.clone() as Arc<dyn Handler>]).unwrap();

    harness.bus.inject("loung/ping", "hello");
    let token = harness.facade.shutdown_token();
    let bus = harness.bus.clone();
    tokio::spawn(async move {
        bus.wait_for_published(1, WAIT).await;
        token.cancel();
    });

    harness.facade.start().await.unwrap();
    assert_eq!(harness.facade.state(), FacadeState::Disconnected);
    assert_eq!(recorder.count(), 1);
    assert_eq!(
        harness.bus.calls(),
        vec!["connect", "subscribe", "unsubscribe", "disconnect"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_waits_for_in_flight_handler() {
    let slow = RecordingHandler::new("ping")
        .replying_on("loung/pong")
        .with_delay(Duration::from_millis(200))
        .shared();
    let mut harness = TestHarness::new(NON_BLOCKING, vec![slow.clone() as Arc<dyn Handler>]).unwrap();
    harness.facade.start().await.unwrap();

    harness.bus.inject("loung/ping", "1");
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.facade.stop().await.unwrap();

    assert_eq!(slow.count(), 1);
    assert_eq!(harness.bus.published().len(), 1);
    assert_eq!(harness.bus.calls().last(), Some(&"disconnect"));
}

#[tokio::test]
async fn registrations_after_start_take_effect() {
    let mut harness = TestHarness::new(NON_BLOCKING, vec![]).unwrap();
    harness.facade.start().await.unwrap();

    let late = RecordingHandler::new("late").replying_on("loung/ack").shared();
    harness.registry.add_callback(late.clone());
    harness.bus.inject("loung/late", "1");

    let published = harness.bus.wait_for_published(1, WAIT).await;
    assert_eq!(published.len(), 1);
    harness.facade.stop().await.unwrap();
}
