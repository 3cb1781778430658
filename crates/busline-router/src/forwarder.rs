// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishing handler replies back to the bus.

use busline_core::{BuslineError, CommandMessage, Payload, Publisher};
use tracing::debug;

/// Encodes a payload to wire bytes. Inverse of
/// [`decode_payload`](crate::convertor::decode_payload) for canonical input.
pub fn encode_payload(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Text(text) => text.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

/// Turns command messages into publish calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageForwarder;

impl MessageForwarder {
    pub fn new() -> Self {
        Self
    }

    /// Publishes `message` through `publisher`, exactly once.
    pub fn forward<P>(&self, message: &CommandMessage, publisher: &P) -> Result<(), BuslineError>
    where
        P: Publisher + ?Sized,
    {
        let payload = encode_payload(message.payload());
        debug!(
            message_name = message.message_name(),
            topic = message.topic(),
            qos = message.qos().level(),
            retain = message.retain(),
            "forwarding message"
        );
        publisher
            .publish(message.topic(), payload, message.qos(), message.retain())
            .map_err(|e| match e {
                e @ BuslineError::Publish { .. } => e,
                other => BuslineError::Publish {
                    topic: message.topic().to_string(),
                    message: other.to_string(),
                },
            })
    }
}
