// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion of a raw configuration mapping into a [`RuntimeConfig`].
//!
//! Every recognized key is taken from the raw mapping when present and of the
//! expected type, and from the [`ConfigDefaults`] table when absent. Unknown
//! keys and sections are ignored. All problems are collected before failing,
//! and no partially completed config is ever returned.

use std::path::PathBuf;
use std::str::FromStr;

use busline_core::QoS;
use secrecy::SecretString;
use strum::VariantNames;
use toml::{Table, Value};

use crate::diagnostic::{suggest_value, ConfigError};
use crate::model::{
    BrokerConfig, CallbacksConfig, ConfigDefaults, LogLevel, LoggingConfig, LoopMode,
    ProtocolVersion, RuntimeConfig, SessionConfig, SubscriptionConfig, Transport,
};

/// Validates and completes raw configuration mappings.
#[derive(Debug, Clone, Default)]
pub struct ConfigCompleter {
    defaults: ConfigDefaults,
}

impl ConfigCompleter {
    pub fn new(defaults: ConfigDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ConfigDefaults {
        &self.defaults
    }

    /// Completes `raw` into a runtime configuration.
    ///
    /// `raw` is only read. Returns every problem found, not just the first.
    pub fn complete(&self, raw: &Table) -> Result<RuntimeConfig, Vec<ConfigError>> {
        let d = &self.defaults;
        let mut r = Resolver::new(raw);

        let broker = BrokerConfig {
            ip: r.string("mqtt_broker", "ip", &d.broker_ip),
            port: r.integer("mqtt_broker", "port", d.broker_port),
            keepalive: r.integer("mqtt_broker", "keepalive", d.keepalive),
            user_name: r.optional_string("mqtt_broker", "user_name"),
            password: r
                .optional_string("mqtt_broker", "password")
                .map(SecretString::from),
            password_required: r.boolean("mqtt_broker", "password_required", d.password_required),
        };

        let session = SessionConfig {
            client_id: r.string("mqtt_session", "client_id", &d.client_id),
            clean: r.boolean("mqtt_session", "clean", d.clean_session),
            transport: r.choice::<Transport>("mqtt_session", "transport", d.transport),
            protocol: r.choice::<ProtocolVersion>("mqtt_session", "protocol", d.protocol),
            loop_mode: r.choice::<LoopMode>("mqtt_session", "loop_mode", d.loop_mode),
        };

        let default_base = d
            .base_topic
            .clone()
            .unwrap_or_else(|| session.client_id.clone());
        let subscription = SubscriptionConfig {
            base_topic: r.string("subscription", "base_topic", &default_base),
            qos: r.qos("subscription", "qos", d.subscription_qos),
        };

        let logging = LoggingConfig {
            level: r.choice::<LogLevel>("logging", "level", d.log_level),
            log_bus_client: r.boolean("logging", "log_bus_client", d.log_bus_client),
        };

        let callbacks = CallbacksConfig {
            local_dir: r.path("callbacks", "local_dir", &d.local_dir),
            plugin_dir: r.path("callbacks", "plugin_dir", &d.plugin_dir),
            plugin_prefixes: r.string_list("callbacks", "plugin_prefixes", &d.plugin_prefixes),
            include_examples: r.boolean("callbacks", "include_examples", d.include_examples),
        };

        let config = RuntimeConfig {
            broker,
            session,
            subscription,
            logging,
            callbacks,
        };

        let mut errors = r.errors;
        errors.extend(validate(&config));
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

/// Semantic checks that hold regardless of where a value came from.
fn validate(config: &RuntimeConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.broker.ip.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "mqtt_broker.ip must not be empty".to_string(),
        });
    }

    if config.broker.port == 0 {
        errors.push(ConfigError::Validation {
            message: "mqtt_broker.port must be between 1 and 65535".to_string(),
        });
    }

    if config.session.client_id.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "mqtt_session.client_id must not be empty".to_string(),
        });
    }

    let base = &config.subscription.base_topic;
    if base.is_empty() || base.ends_with('/') {
        errors.push(ConfigError::Validation {
            message: format!("subscription.base_topic `{base}` must be a non-empty topic"),
        });
    } else if base.contains(['+', '#']) {
        errors.push(ConfigError::Validation {
            message: format!("subscription.base_topic `{base}` must not contain wildcards"),
        });
    }

    for (i, prefix) in config.callbacks.plugin_prefixes.iter().enumerate() {
        if prefix.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("callbacks.plugin_prefixes[{i}] must not be empty"),
            });
        }
    }

    errors
}

/// Reads typed values out of the raw table, recording problems as it goes.
struct Resolver<'a> {
    raw: &'a Table,
    errors: Vec<ConfigError>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a Table) -> Self {
        Self {
            raw,
            errors: Vec::new(),
        }
    }

    /// Looks up `section.key`. A section that is present but not a table is
    /// reported once per lookup and treated as absent.
    fn lookup(&mut self, section: &str, key: &str) -> Option<&'a Value> {
        let raw = self.raw;
        match raw.get(section) {
            None => None,
            Some(Value::Table(table)) => table.get(key),
            Some(other) => {
                let already_reported = self.errors.iter().any(|e| e.key() == Some(section));
                if !already_reported {
                    self.errors.push(ConfigError::InvalidType {
                        key: section.to_string(),
                        expected: "a table".to_string(),
                        found: other.type_str().to_string(),
                    });
                }
                None
            }
        }
    }

    fn type_error(&mut self, section: &str, key: &str, expected: &str, found: &Value) {
        self.errors.push(ConfigError::InvalidType {
            key: format!("{section}.{key}"),
            expected: expected.to_string(),
            found: found.type_str().to_string(),
        });
    }

    fn string(&mut self, section: &str, key: &str, default: &str) -> String {
        self.optional_string(section, key)
            .unwrap_or_else(|| default.to_string())
    }

    fn optional_string(&mut self, section: &str, key: &str) -> Option<String> {
        let value = self.lookup(section, key)?;
        match scalar_text(value) {
            Some(text) => Some(text),
            None => {
                self.type_error(section, key, "a string", value);
                None
            }
        }
    }

    fn path(&mut self, section: &str, key: &str, default: &std::path::Path) -> PathBuf {
        self.optional_string(section, key)
            .map(PathBuf::from)
            .unwrap_or_else(|| default.to_path_buf())
    }

    fn boolean(&mut self, section: &str, key: &str, default: bool) -> bool {
        match self.lookup(section, key) {
            None => default,
            Some(Value::Boolean(b)) => *b,
            Some(other) => {
                self.type_error(section, key, "a boolean", other);
                default
            }
        }
    }

    fn integer<T>(&mut self, section: &str, key: &str, default: T) -> T
    where
        T: TryFrom<i64> + Copy + Bounded,
    {
        match self.lookup(section, key) {
            None => default,
            Some(Value::Integer(i)) => match T::try_from(*i) {
                Ok(v) => v,
                Err(_) => {
                    self.errors.push(ConfigError::InvalidValue {
                        key: format!("{section}.{key}"),
                        value: i.to_string(),
                        accepted: T::RANGE.to_string(),
                        suggestion: None,
                    });
                    default
                }
            },
            Some(other) => {
                self.type_error(section, key, "an integer", other);
                default
            }
        }
    }

    fn qos(&mut self, section: &str, key: &str, default: QoS) -> QoS {
        match self.lookup(section, key) {
            None => default,
            Some(Value::Integer(i)) => {
                match u8::try_from(*i).ok().and_then(|level| QoS::try_from(level).ok()) {
                    Some(qos) => qos,
                    None => {
                        self.errors.push(ConfigError::InvalidValue {
                            key: format!("{section}.{key}"),
                            value: i.to_string(),
                            accepted: "0, 1, 2".to_string(),
                            suggestion: None,
                        });
                        default
                    }
                }
            }
            Some(other) => {
                self.type_error(section, key, "an integer", other);
                default
            }
        }
    }

    fn choice<T>(&mut self, section: &str, key: &str, default: T) -> T
    where
        T: FromStr + VariantNames,
    {
        match self.lookup(section, key) {
            None => default,
            Some(value) => match scalar_text(value) {
                Some(text) => match T::from_str(&text) {
                    Ok(v) => v,
                    Err(_) => {
                        self.errors.push(ConfigError::InvalidValue {
                            key: format!("{section}.{key}"),
                            suggestion: suggest_value(&text, T::VARIANTS),
                            value: text,
                            accepted: T::VARIANTS.join(", "),
                        });
                        default
                    }
                },
                None => {
                    let expected = format!("one of: {}", T::VARIANTS.join(", "));
                    self.type_error(section, key, &expected, value);
                    default
                }
            },
        }
    }

    fn string_list(&mut self, section: &str, key: &str, default: &[String]) -> Vec<String> {
        match self.lookup(section, key) {
            None => default.to_vec(),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => {
                            self.type_error(section, &format!("{key}[{i}]"), "a string", other)
                        }
                    }
                }
                out
            }
            Some(other) => {
                self.type_error(section, key, "an array of strings", other);
                default.to_vec()
            }
        }
    }
}

/// Text form of a string-valued setting.
///
/// Environment overrides arrive as typed scalars, so `BUSLINE_..._PROTOCOL=5`
/// is an integer and a numeric password or client id must still be read as
/// text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// Integer types with a printable accepted range.
trait Bounded {
    const RANGE: &'static str;
}

impl Bounded for u16 {
    const RANGE: &'static str = "0..=65535";
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn empty_mapping_completes_to_defaults() {
        let config = ConfigCompleter::default().complete(&Table::new()).unwrap();
        assert_eq!(config.broker.ip, "127.0.0.1");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.keepalive, 60);
        assert!(config.broker.user_name.is_none());
        assert!(config.broker.password.is_none());
        assert_eq!(config.session.client_id, "busline");
        assert!(config.session.clean);
        assert_eq!(config.session.transport, Transport::Tcp);
        assert_eq!(config.session.protocol, ProtocolVersion::V311);
        assert_eq!(config.session.loop_mode, LoopMode::Blocking);
        assert_eq!(config.subscription.base_topic, "busline");
        assert_eq!(config.subscription.qos, QoS::AtMostOnce);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.callbacks.plugin_prefixes, vec!["busline_"]);
    }

    #[test]
    fn base_topic_follows_client_id() {
        let raw = parse("[mqtt_session]\nclient_id = \"loung\"\n");
        let config = ConfigCompleter::default().complete(&raw).unwrap();
        assert_eq!(config.subscription.base_topic, "loung");
    }

    #[test]
    fn explicit_base_topic_wins() {
        let raw = parse("[mqtt_session]\nclient_id = \"pc\"\n[subscription]\nbase_topic = \"home/pc\"\nqos = 1\n");
        let config = ConfigCompleter::default().complete(&raw).unwrap();
        assert_eq!(config.subscription.base_topic, "home/pc");
        assert_eq!(config.subscription.qos, QoS::AtLeastOnce);
    }

    #[test]
    fn unknown_keys_and_sections_are_ignored() {
        let raw = parse("[mqtt_broker]\nip = \"10.0.0.1\"\ncolour = \"blue\"\n[future]\nx = 1\n");
        let config = ConfigCompleter::default().complete(&raw).unwrap();
        assert_eq!(config.broker.ip, "10.0.0.1");
    }

    #[test]
    fn wrong_type_names_key_and_expected_type() {
        let raw = parse("[mqtt_broker]\nport = \"1883\"\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ConfigError::InvalidType { key, expected, found } => {
                assert_eq!(key, "mqtt_broker.port");
                assert_eq!(expected, "an integer");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_port_is_invalid_value() {
        let raw = parse("[mqtt_broker]\nport = 70000\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidValue { key, accepted, .. }
                if key == "mqtt_broker.port" && accepted == "0..=65535"
        )));
    }

    #[test]
    fn bad_protocol_lists_accepted_versions() {
        let raw = parse("[mqtt_session]\nprotocol = \"4\"\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        match &errors[0] {
            ConfigError::InvalidValue { key, accepted, .. } => {
                assert_eq!(key, "mqtt_session.protocol");
                assert_eq!(accepted, "3.1.1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_logging_level_suggests_close_match() {
        let raw = parse("[logging]\nlevel = \"WARN\"\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        match &errors[0] {
            ConfigError::InvalidValue { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("WARNING"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn qos_outside_levels_is_rejected() {
        let raw = parse("[subscription]\nqos = 3\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert_eq!(errors[0].key(), Some("subscription.qos"));
    }

    #[test]
    fn section_of_wrong_shape_is_reported_once() {
        let raw = parse("mqtt_broker = 5\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key(), Some("mqtt_broker"));
    }

    #[test]
    fn all_errors_are_collected() {
        let raw = parse(
            "[mqtt_session]\ntransport = \"udp\"\nclean = \"yes\"\n[logging]\nlevel = 3\n",
        );
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn wildcard_base_topic_fails_validation() {
        let raw = parse("[subscription]\nbase_topic = \"home/#\"\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::Validation { message } if message.contains("wildcards")
        )));
    }

    #[test]
    fn plugin_prefixes_must_be_strings() {
        let raw = parse("[callbacks]\nplugin_prefixes = [\"busline_\", 4]\n");
        let errors = ConfigCompleter::default().complete(&raw).unwrap_err();
        assert_eq!(errors[0].key(), Some("callbacks.plugin_prefixes[1]"));
    }

    #[test]
    fn custom_defaults_table_is_used() {
        let defaults = ConfigDefaults {
            broker_port: 8883,
            transport: Transport::Websockets,
            ..ConfigDefaults::default()
        };
        let config = ConfigCompleter::new(defaults).complete(&Table::new()).unwrap();
        assert_eq!(config.broker.port, 8883);
        assert_eq!(config.session.transport, Transport::Websockets);
    }

    #[test]
    fn password_prompt_needed_only_when_required_and_missing() {
        let raw = parse("[mqtt_broker]\npassword_required = true\n");
        let config = ConfigCompleter::default().complete(&raw).unwrap();
        assert!(config.needs_password());

        let raw = parse("[mqtt_broker]\npassword_required = true\npassword = \"pw\"\n");
        let config = ConfigCompleter::default().complete(&raw).unwrap();
        assert!(!config.needs_password());
        assert_eq!(config.broker.password.as_ref().unwrap().expose_secret(), "pw");
    }

    #[test]
    fn raw_mapping_is_left_untouched() {
        let raw = parse("[mqtt_broker]\nip = \"10.1.1.1\"\n");
        let before = raw.clone();
        let _ = ConfigCompleter::default().complete(&raw);
        assert_eq!(raw, before);
    }
}
