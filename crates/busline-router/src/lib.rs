// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing pipeline for the Busline message router.
//!
//! Inbound bus messages flow through three stages:
//! [`WireConvertor`] turns them into command messages, [`CallbackRegistry`]
//! fans them out to the handlers registered under their name, and
//! [`MessageForwarder`] publishes whatever the handlers return.
//! [`Pipeline`] wires the three together.

pub mod caller;
pub mod convertor;
pub mod forwarder;
pub mod pipeline;

pub use caller::{CallbackRegistry, Dispatch};
pub use convertor::{decode_payload, TopicMapper, WireConvertor};
pub use forwarder::{encode_payload, MessageForwarder};
pub use pipeline::{Pipeline, PipelineOutcome};
