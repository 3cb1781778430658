// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completed runtime configuration and the defaults table it is built from.
//!
//! Every field of [`RuntimeConfig`] holds a concrete value; the enumerated
//! options are typed so an out-of-set value cannot be represented.

use std::path::{Path, PathBuf};

use busline_core::QoS;
use secrecy::{ExposeSecret, SecretString};
use strum::{Display, EnumString, VariantNames};

/// Network transport used to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    Tcp,
    Websockets,
}

/// MQTT protocol version token.
///
/// Only the versions the bundled bus client can speak are listed, so a
/// config asking for anything else fails completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames)]
pub enum ProtocolVersion {
    #[strum(serialize = "3.1.1")]
    V311,
}

/// Logging verbosity, spelled the way operators write it in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// How the bus client's receive loop is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum LoopMode {
    /// `start()` runs the receive loop until the facade is stopped.
    Blocking,
    /// `start()` spawns the receive loop and returns once subscribed.
    NonBlocking,
}

/// Broker connection settings.
#[derive(Debug)]
pub struct BrokerConfig {
    pub ip: String,
    pub port: u16,
    /// Maximum quiet period, in seconds, before a ping is sent.
    pub keepalive: u16,
    pub user_name: Option<String>,
    pub password: Option<SecretString>,
    /// Ask for the password on the terminal when none is configured.
    pub password_required: bool,
}

/// Client session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub client_id: String,
    pub clean: bool,
    pub transport: Transport,
    pub protocol: ProtocolVersion,
    pub loop_mode: LoopMode,
}

/// Which topics the client listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Command topics are `<base_topic>/<message_name>`.
    pub base_topic: String,
    pub qos: QoS,
}

impl SubscriptionConfig {
    /// The subscription filter covering every command topic.
    pub fn filter(&self) -> String {
        format!("{}/+", self.base_topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Pass the bus client library's own logs through.
    pub log_bus_client: bool,
}

/// Where handlers are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbacksConfig {
    pub local_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub plugin_prefixes: Vec<String>,
    /// Load units named `template` or `example` too.
    pub include_examples: bool,
}

/// Fully resolved configuration, built once per process.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub broker: BrokerConfig,
    pub session: SessionConfig,
    pub subscription: SubscriptionConfig,
    pub logging: LoggingConfig,
    pub callbacks: CallbacksConfig,
}

impl RuntimeConfig {
    /// True when the operator asked to be prompted and no password is set.
    pub fn needs_password(&self) -> bool {
        self.broker.password_required
            && self
                .broker
                .password
                .as_ref()
                .is_none_or(|p| p.expose_secret().is_empty())
    }

    /// Resolves relative callback directories against `base`, normally the
    /// directory holding the config file.
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        if self.callbacks.local_dir.is_relative() {
            self.callbacks.local_dir = base.join(&self.callbacks.local_dir);
        }
        if self.callbacks.plugin_dir.is_relative() {
            self.callbacks.plugin_dir = base.join(&self.callbacks.plugin_dir);
        }
    }
}

/// The immutable defaults table the completer falls back to.
///
/// Passed to [`ConfigCompleter::new`](crate::ConfigCompleter::new) rather than
/// read from globals, so independent completers never interfere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    pub broker_ip: String,
    pub broker_port: u16,
    pub keepalive: u16,
    pub password_required: bool,
    pub client_id: String,
    pub clean_session: bool,
    pub transport: Transport,
    pub protocol: ProtocolVersion,
    pub loop_mode: LoopMode,
    /// `None` means "same as the resolved client id".
    pub base_topic: Option<String>,
    pub subscription_qos: QoS,
    pub log_level: LogLevel,
    pub log_bus_client: bool,
    pub local_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub plugin_prefixes: Vec<String>,
    pub include_examples: bool,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            broker_ip: "127.0.0.1".to_string(),
            broker_port: 1883,
            keepalive: 60,
            password_required: false,
            client_id: "busline".to_string(),
            clean_session: true,
            transport: Transport::Tcp,
            protocol: ProtocolVersion::V311,
            loop_mode: LoopMode::Blocking,
            base_topic: None,
            subscription_qos: QoS::AtMostOnce,
            log_level: LogLevel::Info,
            log_bus_client: false,
            local_dir: PathBuf::from("local_callbacks"),
            plugin_dir: PathBuf::from("plugins"),
            plugin_prefixes: vec!["busline_".to_string()],
            include_examples: false,
        }
    }
}
