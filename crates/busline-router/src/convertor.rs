// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of raw wire messages into command messages.
//!
//! Payload decoding order is fixed: UTF-8 text, then boolean literal, then
//! canonical decimal integer, then plain text.

use busline_core::{BuslineError, CommandMessage, InboundMessage, MessageConvertor, Payload, QoS};

/// Maps topics to message names.
///
/// The message name is the last level of the topic. With a base topic set,
/// only topics of the exact form `<base>/<name>` are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMapper {
    base_topic: Option<String>,
}

impl TopicMapper {
    /// Accepts only `<base_topic>/<name>`.
    pub fn with_base(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: Some(base_topic.into()),
        }
    }

    /// Accepts any topic and uses its last level as the name.
    pub fn last_level() -> Self {
        Self { base_topic: None }
    }

    pub fn base_topic(&self) -> Option<&str> {
        self.base_topic.as_deref()
    }

    /// Derives the message name for `topic`.
    pub fn message_name<'t>(&self, topic: &'t str) -> Result<&'t str, BuslineError> {
        if topic.contains(['+', '#']) {
            return Err(BuslineError::InvalidMessage(format!(
                "topic `{topic}` contains a wildcard"
            )));
        }

        let name = match &self.base_topic {
            Some(base) => topic
                .strip_prefix(base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|rest| !rest.contains('/'))
                .ok_or_else(|| {
                    BuslineError::InvalidMessage(format!(
                        "topic `{topic}` is not of the form `{base}/<name>`"
                    ))
                })?,
            None => topic.rsplit('/').next().unwrap_or(topic),
        };

        if name.trim().is_empty() {
            return Err(BuslineError::InvalidMessage(format!(
                "topic `{topic}` has an empty message name"
            )));
        }
        Ok(name)
    }

    /// The topic a message called `name` arrives on, when a base is set.
    pub fn topic_for(&self, name: &str) -> Option<String> {
        self.base_topic.as_ref().map(|base| format!("{base}/{name}"))
    }
}

impl Default for TopicMapper {
    fn default() -> Self {
        Self::last_level()
    }
}

/// Decodes raw payload bytes into a typed [`Payload`].
pub fn decode_payload(bytes: &[u8]) -> Result<Payload, BuslineError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BuslineError::InvalidMessage(format!("payload is not UTF-8: {e}")))?;

    if text.is_empty() {
        return Err(BuslineError::InvalidMessage("payload is empty".to_string()));
    }

    if text.eq_ignore_ascii_case("true") {
        return Ok(Payload::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Payload::Boolean(false));
    }

    // Only canonical renderings become integers, so "007" and "+5" stay text
    // and re-encode to the same bytes.
    if let Some(value) = text.parse::<i64>().ok().filter(|v| v.to_string() == text) {
        return Ok(Payload::Integer(value));
    }

    Ok(Payload::Text(text.to_string()))
}

/// The bus-facing [`MessageConvertor`].
#[derive(Debug, Clone, Default)]
pub struct WireConvertor {
    mapper: TopicMapper,
}

impl WireConvertor {
    pub fn new(mapper: TopicMapper) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &TopicMapper {
        &self.mapper
    }
}

impl MessageConvertor for WireConvertor {
    fn convert(&self, raw: &InboundMessage) -> Result<CommandMessage, BuslineError> {
        let name = self.mapper.message_name(&raw.topic)?;
        let payload = decode_payload(&raw.payload)?;
        let qos = QoS::try_from(raw.qos)?;
        CommandMessage::new(name, payload, raw.topic.as_str(), qos, raw.retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_are_case_insensitive() {
        assert_eq!(decode_payload(b"true").unwrap(), Payload::Boolean(true));
        assert_eq!(decode_payload(b"TRUE").unwrap(), Payload::Boolean(true));
        assert_eq!(decode_payload(b"False").unwrap(), Payload::Boolean(false));
    }

    #[test]
    fn canonical_integers_are_decoded() {
        assert_eq!(decode_payload(b"42").unwrap(), Payload::Integer(42));
        assert_eq!(decode_payload(b"-7").unwrap(), Payload::Integer(-7));
        assert_eq!(decode_payload(b"0").unwrap(), Payload::Integer(0));
    }

    #[test]
    fn non_canonical_numbers_stay_text() {
        assert_eq!(decode_payload(b"007").unwrap(), Payload::Text("007".into()));
        assert_eq!(decode_payload(b"+5").unwrap(), Payload::Text("+5".into()));
        assert_eq!(decode_payload(b"1.5").unwrap(), Payload::Text("1.5".into()));
        assert_eq!(
            decode_payload(b"99999999999999999999").unwrap(),
            Payload::Text("99999999999999999999".into())
        );
    }

    #[test]
    fn text_falls_through() {
        assert_eq!(decode_payload(b"hello").unwrap(), Payload::Text("hello".into()));
        assert_eq!(decode_payload(b"truely").unwrap(), Payload::Text("truely".into()));
    }

    #[test]
    fn empty_and_invalid_utf8_are_rejected() {
        assert!(matches!(decode_payload(b""), Err(BuslineError::InvalidMessage(_))));
        assert!(matches!(
            decode_payload(&[0xff, 0xfe]),
            Err(BuslineError::InvalidMessage(_))
        ));
    }

    #[test]
    fn last_level_is_the_message_name() {
        let mapper = TopicMapper::last_level();
        assert_eq!(mapper.message_name("loung/mqtt_publish").unwrap(), "mqtt_publish");
        assert_eq!(mapper.message_name("ping").unwrap(), "ping");
        assert!(mapper.message_name("loung/").is_err());
        assert!(mapper.message_name("loung/#").is_err());
    }

    #[test]
    fn base_topic_must_match_exactly() {
        let mapper = TopicMapper::with_base("home/pc");
        assert_eq!(mapper.message_name("home/pc/shutdown").unwrap(), "shutdown");
        assert!(mapper.message_name("home/pcx/shutdown").is_err());
        assert!(mapper.message_name("home/pc/a/b").is_err());
        assert!(mapper.message_name("home/pc").is_err());
        assert!(mapper.message_name("other/shutdown").is_err());
        assert_eq!(mapper.topic_for("shutdown").as_deref(), Some("home/pc/shutdown"));
    }

    #[test]
    fn convert_builds_a_command_message() {
        let convertor = WireConvertor::new(TopicMapper::with_base("loung"));
        let raw = InboundMessage::new("loung/mqtt_publish", "60", 1, true);
        let message = convertor.convert(&raw).unwrap();
        assert_eq!(message.message_name(), "mqtt_publish");
        assert_eq!(message.payload(), &Payload::Integer(60));
        assert_eq!(message.topic(), "loung/mqtt_publish");
        assert_eq!(message.qos(), QoS::AtLeastOnce);
        assert!(message.retain());
    }

    #[test]
    fn convert_rejects_bad_qos() {
        let convertor = WireConvertor::default();
        let raw = InboundMessage::new("a/b", "x", 3, false);
        assert!(matches!(
            convertor.convert(&raw),
            Err(BuslineError::InvalidMessage(_))
        ));
    }
}
