// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end routing: handler units on disk, loaded through the built-in
//! catalog, driven by inbound messages on a mock bus.

use std::fs;
use std::time::Duration;

use busline_plugin::{builtin_catalog, HandlerLoader};
use busline_test_utils::TestHarness;

const CONFIG: &str = r#"
[mqtt_session]
client_id = "loung"
loop_mode = "non_blocking"
"#;

const UNITS: &str = r#"
[[handler]]
kind = "reverse_string"
message_name = "reverse"
[handler.settings]
reply_topic = "loung/replies/reverse"

[[handler]]
kind = "add_integer"
message_name = "mqtt_publish"
[handler.settings]
addend = 5
reply_topic = "loung/replies/sum"
reply_qos = 1

[[handler]]
kind = "invert_boolean"
message_name = "toggle"
[handler.settings]
reply_topic = "loung/replies/toggle"
reply_retain = true
"#;

const WAIT: Duration = Duration::from_secs(2);

fn harness_with_units() -> (TestHarness, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("builtins.toml"), UNITS).unwrap();

    let report = HandlerLoader::new(builtin_catalog()).load_local(dir.path());
    assert!(report.is_clean(), "{report:?}");
    (TestHarness::new(CONFIG, report.handlers).unwrap(), dir)
}

#[tokio::test]
async fn loaded_handlers_reply_through_the_bus() {
    let (mut harness, _dir) = harness_with_units();
    assert_eq!(harness.registry.message_names(), vec!["mqtt_publish", "reverse", "toggle"]);
    harness.facade.start().await.unwrap();

    harness.bus.inject("loung/mqtt_publish", "60");
    harness.bus.inject("loung/reverse", "hello");
    harness.bus.inject("loung/toggle", "TRUE");

    let mut published = harness.bus.wait_for_published(3, WAIT).await;
    published.sort_by(|a, b| a.topic.cmp(&b.topic));
    assert_eq!(published.len(), 3);

    assert_eq!(published[0].topic, "loung/replies/reverse");
    assert_eq!(published[0].payload_str(), "olleh");

    assert_eq!(published[1].topic, "loung/replies/sum");
    assert_eq!(published[1].payload_str(), "65");
    assert_eq!(published[1].qos.level(), 1);

    assert_eq!(published[2].topic, "loung/replies/toggle");
    assert_eq!(published[2].payload_str(), "false");
    assert!(published[2].retain);

    harness.facade.stop().await.unwrap();
}

#[tokio::test]
async fn wrong_payload_form_produces_no_reply() {
    let (mut harness, _dir) = harness_with_units();
    harness.facade.start().await.unwrap();

    harness.bus.inject("loung/mqtt_publish", "sixty");
    harness.bus.inject("loung/reverse", "ok");

    let published = harness.bus.wait_for_published(1, WAIT).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload_str(), "ko");

    harness.facade.stop().await.unwrap();
}
