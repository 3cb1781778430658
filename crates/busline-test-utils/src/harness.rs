// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A facade wired to a mock bus.

use std::sync::Arc;

use busline_client::BusClientFacade;
use busline_config::complete_str;
use busline_core::{BuslineError, Handler};
use busline_router::CallbackRegistry;

use crate::mock_bus::{MockBusClient, MockBusHandle};

/// An initialised facade over a [`MockBusClient`].
pub struct TestHarness {
    pub facade: BusClientFacade,
    pub bus: MockBusHandle,
    pub registry: Arc<CallbackRegistry>,
}

impl TestHarness {
    /// Completes `config_toml`, registers `handlers`, and initialises a facade.
    pub fn new(
        config_toml: &str,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> Result<Self, BuslineError> {
        let config = complete_str(config_toml).map_err(|errors| {
            let detail: Vec<String> = errors.iter().map(ToString::to_string).collect();
            BuslineError::Configuration(detail.join("; "))
        })?;

        let registry = Arc::new(CallbackRegistry::new());
        registry.add_all(handlers);

        let (client, bus) = MockBusClient::new();
        let mut facade = BusClientFacade::new(Box::new(client), Arc::clone(&registry));
        facade.initialise(config)?;

        Ok(Self {
            facade,
            bus,
            registry,
        })
    }
}
