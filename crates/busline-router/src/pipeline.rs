// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Convertor → Caller → Forwarder wiring.
//!
//! The pipeline never aborts on a single bad message: conversion, handler,
//! and publish failures are logged and reported in the [`PipelineOutcome`].

use std::sync::Arc;

use busline_core::{BuslineError, InboundMessage, MessageConvertor, Publisher};
use tracing::{debug, warn};

use crate::caller::CallbackRegistry;
use crate::forwarder::MessageForwarder;

/// What happened to one inbound message.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Set once the message was converted.
    pub message_name: Option<String>,
    /// Whether at least one handler was registered for the message.
    pub routed: bool,
    /// Replies successfully handed to the publisher.
    pub forwarded: usize,
    pub failures: Vec<BuslineError>,
}

impl PipelineOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Routes inbound messages to handlers and publishes their replies.
pub struct Pipeline {
    convertor: Arc<dyn MessageConvertor>,
    registry: Arc<CallbackRegistry>,
    forwarder: MessageForwarder,
}

impl Pipeline {
    pub fn new(convertor: Arc<dyn MessageConvertor>, registry: Arc<CallbackRegistry>) -> Self {
        Self {
            convertor,
            registry,
            forwarder: MessageForwarder::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Processes one inbound message, publishing replies through `publisher`.
    pub fn handle(&self, raw: &InboundMessage, publisher: &dyn Publisher) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::default();

        let message = match self.convertor.convert(raw) {
            Ok(message) => message,
            Err(error) => {
                warn!(topic = %raw.topic, error = %error, "dropping inbound message");
                outcome.failures.push(error);
                return outcome;
            }
        };
        outcome.message_name = Some(message.message_name().to_string());

        let mut dispatch = self.registry.dispatch(&message);
        outcome.routed = dispatch.is_routable();
        if !outcome.routed {
            warn!(
                message_name = message.message_name(),
                topic = message.topic(),
                "no callback registered"
            );
            return outcome;
        }
        debug!(
            message_name = message.message_name(),
            payload = %message.payload(),
            handlers = dispatch.handler_count(),
            "dispatching"
        );

        for reply in dispatch.by_ref() {
            match self.forwarder.forward(&reply, publisher) {
                Ok(()) => outcome.forwarded += 1,
                Err(error) => {
                    warn!(
                        message_name = reply.message_name(),
                        topic = reply.topic(),
                        error = %error,
                        "failed to forward reply"
                    );
                    outcome.failures.push(error);
                }
            }
        }
        outcome.failures.extend(dispatch.into_failures());
        outcome
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
