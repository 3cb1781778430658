// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The command message model exchanged between the bus and handlers.
//!
//! A [`CommandMessage`] is an immutable value: it is built once (by the
//! convertor for inbound traffic, or by a handler for replies), handed to the
//! next pipeline stage, and dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::BuslineError;

/// Quality of Service levels of the publish/subscribe transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce = 0,
    /// Acknowledged delivery, duplicates possible.
    AtLeastOnce = 1,
    /// Assured single delivery.
    ExactlyOnce = 2,
}

impl QoS {
    /// Numeric level as used on the wire.
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for QoS {
    type Error = BuslineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(BuslineError::InvalidMessage(format!(
                "qos must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.level()
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// The three payload shapes a command message may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

/// Discriminant of [`Payload`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum PayloadKind {
    Boolean,
    Integer,
    Text,
}

impl Payload {
    /// Returns which of the three shapes this payload has.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Boolean(_) => PayloadKind::Boolean,
            Payload::Integer(_) => PayloadKind::Integer,
            Payload::Text(_) => PayloadKind::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Payload::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the wire text of the payload: `true`/`false`, decimal, or the
/// string itself.
impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Boolean(b) => write!(f, "{b}"),
            Payload::Integer(i) => write!(f, "{i}"),
            Payload::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Boolean(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Integer(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

/// The typed, immutable unit exchanged between the bus and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandMessage {
    message_name: String,
    payload: Payload,
    topic: String,
    qos: QoS,
    retain: bool,
}

impl CommandMessage {
    /// Builds a command message.
    ///
    /// Fails with [`BuslineError::InvalidMessage`] when the message name or the
    /// topic is empty.
    pub fn new(
        message_name: impl Into<String>,
        payload: impl Into<Payload>,
        topic: impl Into<String>,
        qos: QoS,
        retain: bool,
    ) -> Result<Self, BuslineError> {
        let message_name = message_name.into();
        let topic = topic.into();

        if message_name.trim().is_empty() {
            return Err(BuslineError::InvalidMessage(
                "message name must not be empty".to_string(),
            ));
        }
        if topic.is_empty() {
            return Err(BuslineError::InvalidMessage(format!(
                "topic must not be empty (message `{message_name}`)"
            )));
        }

        Ok(Self {
            message_name,
            payload: payload.into(),
            topic,
            qos,
            retain,
        })
    }

    pub fn message_name(&self) -> &str {
        &self.message_name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn retain(&self) -> bool {
        self.retain
    }
}

/// A raw message as delivered by the bus client, before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Raw QoS level; validated by the convertor.
    pub qos: u8,
    pub retain: bool,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, qos: u8, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        }
    }
}
