// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers compiled into the binary and their factories.
//!
//! Every built-in replies on a configured topic. Common settings:
//!
//! | key | type | default |
//! |---|---|---|
//! | `reply_topic` | string | required |
//! | `reply_qos` | integer 0..=2 | `0` |
//! | `reply_retain` | bool | `false` |

mod handlers;

use std::sync::Arc;

use busline_core::{BuslineError, CommandMessage, Handler, Payload, QoS};

pub use handlers::{AddInteger, Echo, InvertBoolean, ReverseString};

use crate::catalog::HandlerFactory;
use crate::manifest::HandlerSpec;

/// Where and how a built-in publishes its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySettings {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
}

impl ReplySettings {
    /// Reads the reply settings of `spec`.
    pub fn from_spec(spec: &HandlerSpec) -> Result<Self, BuslineError> {
        let topic = match spec.settings.get("reply_topic") {
            Some(toml::Value::String(t)) if !t.is_empty() => t.clone(),
            Some(_) => return Err(setting_error(spec, "reply_topic must be a non-empty string")),
            None => return Err(setting_error(spec, "reply_topic is required")),
        };

        let qos = match spec.settings.get("reply_qos") {
            None => QoS::AtMostOnce,
            Some(toml::Value::Integer(level)) => u8::try_from(*level)
                .ok()
                .and_then(|l| QoS::try_from(l).ok())
                .ok_or_else(|| setting_error(spec, "reply_qos must be 0, 1 or 2"))?,
            Some(_) => return Err(setting_error(spec, "reply_qos must be an integer")),
        };

        let retain = match spec.settings.get("reply_retain") {
            None => false,
            Some(toml::Value::Boolean(b)) => *b,
            Some(_) => return Err(setting_error(spec, "reply_retain must be a boolean")),
        };

        Ok(Self { topic, qos, retain })
    }

    /// Builds the reply message for a handler answering `message_name`.
    pub fn reply(
        &self,
        message_name: &str,
        payload: impl Into<Payload>,
    ) -> Result<CommandMessage, BuslineError> {
        CommandMessage::new(message_name, payload, self.topic.as_str(), self.qos, self.retain)
    }
}

pub(crate) fn setting_error(spec: &HandlerSpec, reason: &str) -> BuslineError {
    BuslineError::Load {
        unit: format!("{} ({})", spec.message_name, spec.kind),
        reason: reason.to_string(),
    }
}

/// Error for an inbound payload of the wrong shape.
pub(crate) fn wrong_form(handler: &str, message: &CommandMessage, expected: &str) -> BuslineError {
    BuslineError::handler(
        handler,
        message.message_name(),
        format!(
            "wrong command message form: expected {expected} payload, got {}",
            message.payload().kind()
        ),
    )
}

pub struct ReverseStringFactory;

impl HandlerFactory for ReverseStringFactory {
    fn kind(&self) -> &str {
        "reverse_string"
    }

    fn description(&self) -> &str {
        "replies with the inbound text reversed"
    }

    fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError> {
        Ok(Arc::new(ReverseString::new(
            &spec.message_name,
            ReplySettings::from_spec(spec)?,
        )))
    }
}

pub struct AddIntegerFactory;

impl HandlerFactory for AddIntegerFactory {
    fn kind(&self) -> &str {
        "add_integer"
    }

    fn description(&self) -> &str {
        "replies with the inbound integer plus `addend`"
    }

    fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError> {
        let addend = match spec.settings.get("addend") {
            Some(toml::Value::Integer(n)) => *n,
            Some(_) => return Err(setting_error(spec, "addend must be an integer")),
            None => return Err(setting_error(spec, "addend is required")),
        };
        Ok(Arc::new(AddInteger::new(
            &spec.message_name,
            addend,
            ReplySettings::from_spec(spec)?,
        )))
    }
}

pub struct InvertBooleanFactory;

impl HandlerFactory for InvertBooleanFactory {
    fn kind(&self) -> &str {
        "invert_boolean"
    }

    fn description(&self) -> &str {
        "replies with the negated inbound boolean"
    }

    fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError> {
        Ok(Arc::new(InvertBoolean::new(
            &spec.message_name,
            ReplySettings::from_spec(spec)?,
        )))
    }
}

pub struct EchoFactory;

impl HandlerFactory for EchoFactory {
    fn kind(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "replies with the inbound payload unchanged"
    }

    fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError> {
        Ok(Arc::new(Echo::new(
            &spec.message_name,
            ReplySettings::from_spec(spec)?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(settings: &str) -> HandlerSpec {
        HandlerSpec {
            kind: "echo".to_string(),
            message_name: "ping".to_string(),
            enabled: true,
            settings: settings.parse().unwrap(),
        }
    }

    #[test]
    fn reply_settings_defaults() {
        let reply = ReplySettings::from_spec(&spec_with("reply_topic = \"out\"")).unwrap();
        assert_eq!(reply.topic, "out");
        assert_eq!(reply.qos, QoS::AtMostOnce);
        assert!(!reply.retain);
    }

    #[test]
    fn reply_settings_explicit() {
        let reply = ReplySettings::from_spec(&spec_with(
            "reply_topic = \"out\"\nreply_qos = 2\nreply_retain = true",
        ))
        .unwrap();
        assert_eq!(reply.qos, QoS::ExactlyOnce);
        assert!(reply.retain);
    }

    #[test]
    fn reply_topic_is_required() {
        let err = ReplySettings::from_spec(&spec_with("")).unwrap_err().to_string();
        assert!(err.contains("reply_topic is required"));
    }

    #[test]
    fn reply_qos_out_of_range() {
        let err = ReplySettings::from_spec(&spec_with("reply_topic = \"out\"\nreply_qos = 7"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("reply_qos"));
    }

    #[test]
    fn add_integer_requires_addend() {
        let mut spec = spec_with("reply_topic = \"out\"");
        spec.kind = "add_integer".to_string();
        assert!(AddIntegerFactory.create(&spec).is_err());
    }
}
