// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Busline message router.
//!
//! A partial TOML mapping is loaded (file plus `BUSLINE_` environment
//! overrides), then completed against an immutable defaults table into a
//! fully populated [`RuntimeConfig`]. Problems are reported as miette
//! diagnostics with typo suggestions for enumerated values.
//!
//! # Usage
//!
//! ```no_run
//! use busline_config::load_and_complete;
//!
//! let loaded = load_and_complete(None).expect("config errors");
//! println!("broker: {}:{}", loaded.config.broker.ip, loaded.config.broker.port);
//! ```

pub mod completer;
pub mod diagnostic;
pub mod loader;
pub mod model;

use std::path::{Path, PathBuf};

pub use completer::ConfigCompleter;
pub use diagnostic::{render_errors, ConfigError};
pub use loader::{
    default_config_path, load_raw_config_from_path, load_raw_config_from_str,
    resolve_config_path,
};
pub use model::{
    BrokerConfig, CallbacksConfig, ConfigDefaults, LogLevel, LoggingConfig, LoopMode,
    ProtocolVersion, RuntimeConfig, SessionConfig, SubscriptionConfig, Transport,
};

/// A completed configuration and the file it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: RuntimeConfig,
    /// `None` when no file was found and only defaults and env were used.
    pub source: Option<PathBuf>,
}

/// Locates, loads and completes the configuration.
///
/// Relative callback directories are resolved against the config file's
/// directory.
pub fn load_and_complete(explicit: Option<&Path>) -> Result<LoadedConfig, Vec<ConfigError>> {
    let source = loader::resolve_config_path(explicit);
    let raw = match &source {
        Some(path) => loader::load_raw_config_from_path(path),
        None => loader::load_raw_config_from_env(),
    }
    .map_err(|e| vec![e])?;

    let mut config = ConfigCompleter::default().complete(&raw)?;
    if let Some(dir) = source.as_deref().and_then(Path::parent) {
        config.resolve_relative_paths(dir);
    }
    Ok(LoadedConfig { config, source })
}

/// Completes a TOML document with the default table. No environment overrides.
pub fn complete_str(toml_content: &str) -> Result<RuntimeConfig, Vec<ConfigError>> {
    let raw = loader::load_raw_config_from_str(toml_content).map_err(|e| vec![e])?;
    ConfigCompleter::default().complete(&raw)
}
