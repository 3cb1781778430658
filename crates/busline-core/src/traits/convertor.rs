// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of raw bus messages into command messages.

use crate::error::BuslineError;
use crate::message::{CommandMessage, InboundMessage};

/// Turns a raw bus message into a [`CommandMessage`], or rejects it.
///
/// One implementation ships with the router; the trait exists so that an
/// alternate wire encoding can be plugged into the same pipeline.
pub trait MessageConvertor: Send + Sync {
    /// Converts `raw`, failing with [`BuslineError::InvalidMessage`] when the
    /// topic cannot be mapped to a message name or the payload is unusable.
    fn convert(&self, raw: &InboundMessage) -> Result<CommandMessage, BuslineError>;
}
