// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bus client collaborator interface.

use std::sync::Arc;

use async_trait::async_trait;
use busline_core::{BuslineError, InboundMessage, Publisher, QoS};

/// A publish/subscribe connection the facade drives.
///
/// The facade owns the client exclusively and calls it from one task, so
/// methods take `&mut self`. Outbound publishing goes through the separate
/// [`Publisher`] returned by [`publisher`](BusClient::publisher), which must be
/// callable while `next_message` is pending.
#[async_trait]
pub trait BusClient: Send {
    /// Opens the connection, returning once the broker accepted it.
    async fn connect(&mut self) -> Result<(), BuslineError>;

    /// Subscribes to `filter`. Subscriptions survive reconnects.
    async fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<(), BuslineError>;

    async fn unsubscribe(&mut self, filter: &str) -> Result<(), BuslineError>;

    /// Waits for the next inbound message. `Ok(None)` means the connection
    /// was closed and no more messages will arrive.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BuslineError>;

    /// The synchronous publish capability of this connection.
    fn publisher(&self) -> Arc<dyn Publisher>;

    /// Closes the connection. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<(), BuslineError>;
}
