// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory bus client for deterministic testing.
//!
//! `MockBusClient` implements `BusClient`. Its paired `MockBusHandle` stays
//! with the test to inject inbound messages, inspect publishes and
//! subscriptions, and inject failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use busline_client::BusClient;
use busline_core::{BuslineError, InboundMessage, Publisher, QoS};
use tokio::sync::mpsc;

/// A message captured by the mock publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl PublishedMessage {
    /// The payload as text (lossy).
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Default)]
struct Shared {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, QoS)>>,
    calls: Mutex<Vec<&'static str>>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_publish: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn record(&self, call: &'static str) {
        lock(&self.calls).push(call);
    }
}

/// A mock bus client backed by an in-memory queue.
pub struct MockBusClient {
    shared: Arc<Shared>,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// Test-side control of a [`MockBusClient`].
#[derive(Clone)]
pub struct MockBusHandle {
    shared: Arc<Shared>,
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<InboundMessage>>>>,
}

impl MockBusClient {
    /// Creates a client and the handle that controls it.
    pub fn new() -> (Self, MockBusHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        let client = Self {
            shared: Arc::clone(&shared),
            inbound: rx,
        };
        let handle = MockBusHandle {
            shared,
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (client, handle)
    }
}

impl MockBusHandle {
    /// Queues an inbound message for the client.
    pub fn inject(&self, topic: &str, payload: &str) {
        self.inject_message(InboundMessage::new(topic, payload, 0, false));
    }

    pub fn inject_message(&self, message: InboundMessage) {
        if let Some(tx) = lock(&self.sender).as_ref() {
            let _ = tx.send(message);
        }
    }

    /// Closes the inbound queue; the client reports the connection closed
    /// once the queued messages are drained.
    pub fn close(&self) {
        lock(&self.sender).take();
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.shared.published).clone()
    }

    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        lock(&self.shared.subscriptions).clone()
    }

    /// Names of the `BusClient` methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.shared.calls).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.shared.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.shared.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Waits until at least `count` messages were published, or `timeout`
    /// elapses, and returns what was published.
    pub async fn wait_for_published(&self, count: usize, timeout: Duration) -> Vec<PublishedMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let published = self.published();
            if published.len() >= count || tokio::time::Instant::now() >= deadline {
                return published;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Waits until `call` was recorded, or `timeout` elapses.
    pub async fn wait_for_call(&self, call: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.calls().iter().any(|c| *c == call) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl BusClient for MockBusClient {
    async fn connect(&mut self) -> Result<(), BuslineError> {
        self.shared.record("connect");
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(BuslineError::Bus {
                message: "connection refused".to_string(),
                source: None,
            });
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<(), BuslineError> {
        self.shared.record("subscribe");
        if self.shared.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BuslineError::Bus {
                message: format!("subscribe to {filter} rejected"),
                source: None,
            });
        }
        lock(&self.shared.subscriptions).push((filter.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&mut self, filter: &str) -> Result<(), BuslineError> {
        self.shared.record("unsubscribe");
        lock(&self.shared.subscriptions).retain(|(f, _)| f != filter);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BuslineError> {
        Ok(self.inbound.recv().await)
    }

    fn publisher(&self) -> Arc<dyn Publisher> {
        Arc::new(MockPublisher {
            shared: Arc::clone(&self.shared),
        })
    }

    async fn disconnect(&mut self) -> Result<(), BuslineError> {
        self.shared.record("disconnect");
        self.shared.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MockPublisher {
    shared: Arc<Shared>,
}

impl Publisher for MockPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BuslineError> {
        if self.shared.fail_publish.load(Ordering::SeqCst) {
            return Err(BuslineError::Publish {
                topic: topic.to_string(),
                message: "queue full".to_string(),
            });
        }
        lock(&self.shared.published).push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            qos,
            retain,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_messages_are_received_in_order() {
        let (mut client, handle) = MockBusClient::new();
        handle.inject("dev/a", "1");
        handle.inject("dev/b", "2");
        handle.close();

        assert_eq!(client.next_message().await.unwrap().unwrap().topic, "dev/a");
        assert_eq!(client.next_message().await.unwrap().unwrap().topic, "dev/b");
        assert!(client.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn publishes_are_captured() {
        let (client, handle) = MockBusClient::new();
        client
            .publisher()
            .publish("out", b"hi".to_vec(), QoS::AtLeastOnce, true)
            .unwrap();
        let published = handle.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].payload_str(), "hi");
        assert!(published[0].retain);
    }

    #[tokio::test]
    async fn connect_failure_is_injectable() {
        let (mut client, handle) = MockBusClient::new();
        handle.fail_connect(true);
        assert!(client.connect().await.is_err());
        assert!(!handle.is_connected());
        assert_eq!(handle.calls(), vec!["connect"]);
    }
}
