// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `busline start` command implementation.
//!
//! Loads handlers from the configured directories, registers them, and runs
//! the bus client facade until a shutdown signal arrives or the connection
//! ends.

use std::sync::Arc;

use busline_client::{install_signal_handler, BusClientFacade, RumqttBusClient};
use busline_config::{CallbacksConfig, LoadedConfig, LoggingConfig, LoopMode, RuntimeConfig};
use busline_core::BuslineError;
use busline_plugin::{builtin_catalog, HandlerLoader, LoadReport};
use busline_router::CallbackRegistry;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

/// Runs the router until shut down.
pub async fn run_start(loaded: LoadedConfig) -> Result<(), BuslineError> {
    let LoadedConfig { mut config, source } = loaded;
    match &source {
        Some(path) => info!(config = %path.display(), "starting busline"),
        None => info!("starting busline with default configuration"),
    }

    if config.needs_password() {
        prompt_password(&mut config)?;
    }

    let registry = Arc::new(CallbackRegistry::new());
    let report = load_handlers(&config.callbacks);
    let registered = registry.add_all(report.handlers);
    info!(
        handlers = registered,
        units = report.units.len(),
        plugins = report.plugins.len(),
        "callbacks registered"
    );
    if registry.is_empty() {
        warn!("no callbacks registered, every inbound command will be dropped");
    }

    let loop_mode = config.session.loop_mode;
    let client = RumqttBusClient::from_config(&config);
    let mut facade = BusClientFacade::new(Box::new(client), Arc::clone(&registry));
    facade.initialise(config)?;

    let token = facade.shutdown_token();
    install_signal_handler(token.clone());

    start_facade(&mut facade).await?;

    if loop_mode == LoopMode::NonBlocking {
        token.cancelled().await;
    }
    facade.stop().await?;

    info!("busline stopped");
    Ok(())
}

/// Starts the facade, stopping it again if start fails.
///
/// The start error is returned; a failure while stopping is only logged.
pub(crate) async fn start_facade(facade: &mut BusClientFacade) -> Result<(), BuslineError> {
    if let Err(e) = facade.start().await {
        error!(error = %e, "bus client failed");
        if let Err(stop) = facade.stop().await {
            debug!(error = %stop, "stop after failed start");
        }
        return Err(e);
    }
    Ok(())
}

/// Loads every handler the callbacks section points at, logging the units
/// that had to be skipped.
pub(crate) fn load_handlers(callbacks: &CallbacksConfig) -> LoadReport {
    let loader = HandlerLoader::new(builtin_catalog()).include_examples(callbacks.include_examples);
    let report = loader.load_all(
        &callbacks.local_dir,
        &callbacks.plugin_dir,
        &callbacks.plugin_prefixes,
    );
    for err in &report.errors {
        warn!(unit = %err.unit.display(), reason = %err.reason, "skipped handler unit");
    }
    report
}

fn prompt_password(config: &mut RuntimeConfig) -> Result<(), BuslineError> {
    let user = config.broker.user_name.as_deref().unwrap_or("broker");
    let entered = rpassword::prompt_password(format!("password for {user}: "))?;
    if entered.is_empty() {
        return Err(BuslineError::Configuration(
            "mqtt_broker.password is required but none was entered".to_string(),
        ));
    }
    config.broker.password = Some(SecretString::from(entered));
    Ok(())
}

/// Builds the default filter directives for `logging`.
///
/// `busline` covers every crate of the workspace; the MQTT client library is
/// kept at `warn` unless its logs were asked for.
pub(crate) fn filter_directives(logging: &LoggingConfig) -> String {
    let level = logging.level.filter_directive();
    let bus_level = if logging.log_bus_client { "debug" } else { "warn" };
    format!("busline={level},rumqttc={bus_level},warn")
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
