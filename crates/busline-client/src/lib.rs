// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus client facade for the Busline message router.
//!
//! [`BusClientFacade`] owns the connection lifecycle and feeds every inbound
//! message through the routing [`Pipeline`](busline_router::Pipeline). The
//! bus itself is reached through the [`BusClient`] trait; [`RumqttBusClient`]
//! is the MQTT implementation.

pub mod bus;
pub mod facade;
pub mod rumqtt;
pub mod shutdown;

pub use bus::BusClient;
pub use facade::{BusClientFacade, FacadeState};
pub use rumqtt::RumqttBusClient;
pub use shutdown::install_signal_handler;
