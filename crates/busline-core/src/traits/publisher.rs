// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outbound publish capability of a bus client.

use std::sync::Arc;

use crate::error::BuslineError;
use crate::message::QoS;

/// Synchronous publish capability offered by a bus client.
///
/// Implementations must not block on network I/O: the pipeline calls
/// `publish` from the same context that receives inbound messages.
pub trait Publisher: Send + Sync {
    /// Hands one message to the bus client for publishing.
    ///
    /// Fails with [`BuslineError::Publish`] if the client refuses it.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BuslineError>;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BuslineError> {
        (**self).publish(topic, payload, qos, retain)
    }
}
