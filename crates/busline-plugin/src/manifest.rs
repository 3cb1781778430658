// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of handler units and `plugin.toml` manifests.
//!
//! A handler unit is a TOML document with one `[[handler]]` table per handler
//! instance:
//!
//! ```toml
//! [[handler]]
//! kind = "reverse_string"
//! message_name = "reverse_string"
//!
//! [handler.settings]
//! reply_topic = "loung/reversed"
//! ```

use busline_core::BuslineError;
use serde::Deserialize;

/// One handler instance requested by a unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandlerSpec {
    /// Catalog key of the factory that builds this handler.
    pub kind: String,
    /// Message name the handler is registered under.
    pub message_name: String,
    /// Disabled handlers are skipped at load time.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Factory-specific settings.
    #[serde(default)]
    pub settings: toml::Table,
}

fn default_enabled() -> bool {
    true
}

/// The parsed contents of a handler unit file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HandlerUnit {
    #[serde(default, rename = "handler")]
    pub handlers: Vec<HandlerSpec>,
}

/// Parse a handler unit from TOML content.
///
/// `unit` names the source in error messages.
pub fn parse_handler_unit(unit: &str, toml_content: &str) -> Result<HandlerUnit, BuslineError> {
    let parsed: HandlerUnit = toml::from_str(toml_content).map_err(|e| BuslineError::Load {
        unit: unit.to_string(),
        reason: format!("invalid handler unit: {e}"),
    })?;

    for (i, spec) in parsed.handlers.iter().enumerate() {
        if spec.kind.trim().is_empty() {
            return Err(BuslineError::Load {
                unit: unit.to_string(),
                reason: format!("handler[{i}]: kind must not be empty"),
            });
        }
        if spec.message_name.trim().is_empty() {
            return Err(BuslineError::Load {
                unit: unit.to_string(),
                reason: format!("handler[{i}]: message_name must not be empty"),
            });
        }
    }

    Ok(parsed)
}

/// Parsed plugin manifest describing a plugin package.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    pub name: String,
    pub version: semver::Version,
    pub description: String,
    /// Handler units inside the package, without the `.toml` extension.
    /// Empty means "the package name with its prefix stripped".
    pub entry_points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PluginManifestFile {
    plugin: PluginSection,
}

#[derive(Debug, Deserialize)]
struct PluginSection {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    entry_points: Vec<String>,
}

/// Parse a plugin manifest from TOML content.
pub fn parse_plugin_manifest(toml_content: &str) -> Result<PluginManifest, BuslineError> {
    let invalid = |reason: String| BuslineError::Load {
        unit: "plugin.toml".to_string(),
        reason,
    };

    let file: PluginManifestFile = toml::from_str(toml_content)
        .map_err(|e| invalid(format!("invalid plugin manifest: {e}")))?;
    let section = file.plugin;

    if section.name.trim().is_empty() {
        return Err(invalid("plugin manifest: name must not be empty".to_string()));
    }

    let version = semver::Version::parse(&section.version).map_err(|e| {
        invalid(format!(
            "plugin manifest: invalid version '{}': {e}",
            section.version
        ))
    })?;

    if let Some(bad) = section
        .entry_points
        .iter()
        .find(|e| e.trim().is_empty() || e.contains(['/', '\\']) || e.starts_with('.'))
    {
        return Err(invalid(format!(
            "plugin manifest: invalid entry point '{bad}'"
        )));
    }

    Ok(PluginManifest {
        name: section.name,
        version,
        description: section.description,
        entry_points: section.entry_points,
    })
}
