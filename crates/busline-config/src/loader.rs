// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw configuration loading using Figment.
//!
//! The loader only produces the raw `toml::Table`; typing, defaults and
//! validation happen in the completer. Lookup order for the file:
//! `--config PATH` > `./busline.toml` > `~/.config/busline/busline.toml`,
//! with `BUSLINE_` environment variables layered on top.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use toml::Table;

use crate::diagnostic::ConfigError;

/// Config file name looked up in the working directory and the XDG dir.
pub const CONFIG_FILE_NAME: &str = "busline.toml";

/// Sections recognized when mapping environment variables to keys.
const SECTIONS: &[&str] = &[
    "mqtt_broker",
    "mqtt_session",
    "subscription",
    "logging",
    "callbacks",
];

/// Picks the config file to read, if any.
///
/// An explicit path is returned as is, even when missing, so the caller
/// reports it instead of silently falling back to defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|p| p.is_file())
}

/// The per-user config location, `~/.config/busline/busline.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("busline").join(CONFIG_FILE_NAME))
}

/// Loads the raw mapping from `path` with environment overrides.
pub fn load_raw_config_from_path(path: &Path) -> Result<Table, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Load {
            path: path.display().to_string(),
            detail: "file not found".to_string(),
        });
    }
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract::<Table>()
        .map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
}

/// Loads the raw mapping from environment variables only.
pub fn load_raw_config_from_env() -> Result<Table, ConfigError> {
    Figment::new()
        .merge(env_provider())
        .extract::<Table>()
        .map_err(|e| ConfigError::Load {
            path: "<environment>".to_string(),
            detail: e.to_string(),
        })
}

/// Parses a TOML document into the raw mapping. No environment overrides.
pub fn load_raw_config_from_str(toml_content: &str) -> Result<Table, ConfigError> {
    Figment::new()
        .merge(Toml::string(toml_content))
        .extract::<Table>()
        .map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            detail: e.to_string(),
        })
}

/// Environment provider mapping `BUSLINE_<SECTION>_<KEY>` to `section.key`.
///
/// Section names contain underscores themselves, so the split is done by
/// matching the known section prefixes rather than on `_`. Values are
/// parsed by figment, so numeric ones arrive as integers or floats.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("BUSLINE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped variable name, in any case, to its config key.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(|rest| format!("{section}.{rest}"))
        })
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_known_sections() {
        assert_eq!(map_env_key("mqtt_broker_ip"), "mqtt_broker.ip");
        assert_eq!(map_env_key("mqtt_session_client_id"), "mqtt_session.client_id");
        assert_eq!(map_env_key("logging_log_bus_client"), "logging.log_bus_client");
        assert_eq!(map_env_key("callbacks_plugin_dir"), "callbacks.plugin_dir");
    }

    #[test]
    fn env_keys_are_matched_in_any_case() {
        assert_eq!(map_env_key("MQTT_BROKER_PORT"), "mqtt_broker.port");
        assert_eq!(map_env_key("Subscription_Base_Topic"), "subscription.base_topic");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
        assert_eq!(map_env_key("logging"), "logging");
    }

    #[test]
    fn explicit_path_is_returned_even_when_missing() {
        let p = Path::new("/definitely/not/here.toml");
        assert_eq!(resolve_config_path(Some(p)), Some(p.to_path_buf()));
    }

    #[test]
    fn missing_explicit_file_is_a_load_error() {
        let err = load_raw_config_from_path(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn malformed_toml_is_a_load_error() {
        let err = load_raw_config_from_str("[mqtt_broker\nip = ").unwrap_err();
        assert!(matches!(err, ConfigError::Load { ref path, .. } if path == "<inline>"));
    }

    #[test]
    fn file_and_env_are_layered() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "busline.toml",
                "[mqtt_broker]\nip = \"10.0.0.5\"\nport = 1883\n",
            )?;
            jail.set_env("BUSLINE_MQTT_BROKER_PORT", "8883");
            let raw = load_raw_config_from_path(Path::new("busline.toml"))
                .map_err(|e| e.to_string())?;
            let broker = raw["mqtt_broker"].as_table().ok_or("not a table")?;
            assert_eq!(broker["ip"].as_str(), Some("10.0.0.5"));
            assert_eq!(broker["port"].as_integer(), Some(8883));
            Ok(())
        });
    }

    #[test]
    fn env_only_overrides_build_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BUSLINE_MQTT_SESSION_CLIENT_ID", "loung");
            jail.set_env("BUSLINE_LOGGING_LEVEL", "DEBUG");
            let raw = load_raw_config_from_env().map_err(|e| e.to_string())?;
            let session = raw["mqtt_session"].as_table().ok_or("not a table")?;
            assert_eq!(session["client_id"].as_str(), Some("loung"));
            let logging = raw["logging"].as_table().ok_or("not a table")?;
            assert_eq!(logging["level"].as_str(), Some("DEBUG"));
            assert!(!raw.contains_key("mqtt_session_client_id"));
            Ok(())
        });
    }
}
