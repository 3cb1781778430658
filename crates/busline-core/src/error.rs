// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Busline message router.

use thiserror::Error;

/// The primary error type used across the routing pipeline, the handler
/// loader, and the bus client facade.
///
/// Only `Configuration` and `State` are fatal to the caller. The others are
/// local to one message, one handler, or one loadable unit and never abort
/// the pipeline.
#[derive(Debug, Error)]
pub enum BuslineError {
    /// A configuration value is missing, has the wrong type, or is outside
    /// its legal set.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An inbound message could not be turned into a command message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A handler failed while executing a command message.
    #[error("handler `{handler}` failed on `{message_name}`: {source}")]
    HandlerExecution {
        handler: String,
        message_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The bus client refused or failed an outbound publish.
    #[error("publish to `{topic}` failed: {message}")]
    Publish { topic: String, message: String },

    /// A facade method was called out of order.
    #[error("cannot {operation} while {state}")]
    State {
        operation: &'static str,
        state: String,
    },

    /// A local handler unit or plugin package failed to load.
    #[error("failed to load `{unit}`: {reason}")]
    Load { unit: String, reason: String },

    /// The underlying bus client failed (connect, subscribe, receive).
    #[error("bus client error: {message}")]
    Bus {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Filesystem errors outside of handler loading.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuslineError {
    /// Wraps a handler-side failure described by a plain message.
    pub fn handler(handler: &str, message_name: &str, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        BuslineError::HandlerExecution {
            handler: handler.to_string(),
            message_name: message_name.to_string(),
            source: reason.into(),
        }
    }

    /// Returns true for the error kinds that must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BuslineError::Configuration(_) | BuslineError::State { .. }
        )
    }
}
