// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Busline message router.
//!
//! This crate provides the command message model, the capability traits that
//! connect handlers, convertors, and publishers, and the error taxonomy shared
//! by every other crate in the workspace.

pub mod error;
pub mod message;
pub mod traits;

// Re-export key items at crate root for ergonomic imports.
pub use error::BuslineError;
pub use message::{CommandMessage, InboundMessage, Payload, QoS};
pub use traits::{Handler, MessageConvertor, Publisher};
