// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Busline integration tests.
//!
//! Provides an in-memory bus client and instrumented handlers for fast,
//! deterministic tests without a broker.
//!
//! # Components
//!
//! - [`MockBusClient`] / [`MockBusHandle`] - in-memory bus with message injection and publish capture
//! - [`RecordingHandler`] - records what it receives, optionally replies
//! - [`FailingHandler`] - always fails
//! - [`TestHarness`] - a facade wired to a mock bus

pub mod handlers;
pub mod harness;
pub mod mock_bus;

pub use handlers::{FailingHandler, RecordingHandler};
pub use harness::TestHarness;
pub use mock_bus::{MockBusClient, MockBusHandle, PublishedMessage};
