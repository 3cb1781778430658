// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instrumented handlers for assertions in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use busline_core::{BuslineError, CommandMessage, Handler};

/// Records every message it receives and optionally echoes it.
pub struct RecordingHandler {
    message_name: String,
    reply_topic: Option<String>,
    delay: Option<Duration>,
    received: Mutex<Vec<CommandMessage>>,
}

impl RecordingHandler {
    pub fn new(message_name: &str) -> Self {
        Self {
            message_name: message_name.to_string(),
            reply_topic: None,
            delay: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Echo each received payload to `topic`.
    pub fn replying_on(mut self, topic: &str) -> Self {
        self.reply_topic = Some(topic.to_string());
        self
    }

    /// Block the dispatching thread for `delay` before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn received(&self) -> Vec<CommandMessage> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.received().len()
    }
}

impl Handler for RecordingHandler {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());

        match &self.reply_topic {
            Some(topic) => CommandMessage::new(
                self.message_name.as_str(),
                message.payload().clone(),
                topic.as_str(),
                message.qos(),
                false,
            )
            .map(Some),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Fails on every call.
pub struct FailingHandler {
    message_name: String,
    calls: AtomicUsize,
}

impl FailingHandler {
    pub fn new(message_name: &str) -> Self {
        Self {
            message_name: message_name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for FailingHandler {
    fn message_name(&self) -> &str {
        &self.message_name
    }

    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BuslineError::handler(
            self.name(),
            message.message_name(),
            "injected failure",
        ))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
