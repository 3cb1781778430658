// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The handler capability executed for matching command messages.

use crate::error::BuslineError;
use crate::message::CommandMessage;

/// Application logic executed when a command message with a matching name
/// arrives.
///
/// `execute` runs synchronously on the thread that delivered the message, and
/// sibling handlers for the same message wait for it. Long-running work must be
/// handed off internally so that `execute` returns promptly.
///
/// # Example
///
/// ```
/// use busline_core::{BuslineError, CommandMessage, Handler};
///
/// struct Ping;
///
/// impl Handler for Ping {
///     fn message_name(&self) -> &str {
///         "ping"
///     }
///
///     fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError> {
///         let reply = CommandMessage::new("pong", "pong", "replies/ping", message.qos(), false)?;
///         Ok(Some(reply))
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// The message name this handler is registered under.
    fn message_name(&self) -> &str;

    /// Executes the handler, optionally producing a message to publish.
    fn execute(&self, message: &CommandMessage) -> Result<Option<CommandMessage>, BuslineError>;

    /// Identity used in logs and error reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
