// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration errors rendered as miette diagnostics.
//!
//! Invalid enumerated values get a "did you mean?" suggestion based on
//! Jaro-Winkler similarity against the accepted tokens.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem found while loading or completing a config.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key holds a value of the wrong type.
    #[error("invalid type for key `{key}`: found {found}")]
    #[diagnostic(code(busline::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted key path, e.g. `mqtt_broker.port`.
        key: String,
        /// What type was expected.
        expected: String,
        /// What type was found.
        found: String,
    },

    /// A key holds a value outside its legal set or range.
    #[error("invalid value `{value}` for key `{key}`")]
    #[diagnostic(
        code(busline::config::invalid_value),
        help("{}", format_invalid_value_help(suggestion.as_deref(), accepted))
    )]
    InvalidValue {
        key: String,
        value: String,
        /// Human-readable list or range of accepted values.
        accepted: String,
        /// Closest accepted token, if any is similar enough.
        suggestion: Option<String>,
    },

    /// A semantic check on the completed values failed.
    #[error("validation error: {message}")]
    #[diagnostic(code(busline::config::validation))]
    Validation { message: String },

    /// The config source could not be read or parsed.
    #[error("cannot load configuration from {path}: {detail}")]
    #[diagnostic(
        code(busline::config::load),
        help("check that the file exists and is valid TOML")
    )]
    Load { path: String, detail: String },
}

impl ConfigError {
    /// The dotted key this error is about, when it concerns a single key.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidType { key, .. } | ConfigError::InvalidValue { key, .. } => {
                Some(key)
            }
            _ => None,
        }
    }
}

impl From<ConfigError> for busline_core::BuslineError {
    fn from(err: ConfigError) -> Self {
        busline_core::BuslineError::Configuration(err.to_string())
    }
}

fn format_invalid_value_help(suggestion: Option<&str>, accepted: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Accepted values: {accepted}"),
        None => format!("accepted values: {accepted}"),
    }
}

/// Suggest the accepted token closest to `unknown`.
///
/// Returns `None` when nothing scores above the similarity threshold.
pub fn suggest_value(unknown: &str, accepted: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &candidate in accepted {
        let score = strsim::jaro_winkler(&unknown.to_lowercase(), &candidate.to_lowercase());
        if score > best_score {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
