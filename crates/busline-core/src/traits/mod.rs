// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits that connect the routing pipeline stages.
//!
//! Every trait here is object safe so the pipeline can hold its collaborators
//! as `Arc<dyn ...>` and swap implementations in tests.

pub mod convertor;
pub mod handler;
pub mod publisher;

pub use convertor::MessageConvertor;
pub use handler::Handler;
pub use publisher::Publisher;
