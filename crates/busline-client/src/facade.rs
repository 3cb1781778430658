// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle and pipeline wiring.
//!
//! State machine: `Unconfigured → Initialised → Connected → Disconnected`.
//! The receive loop runs in its own task and owns the bus client; it tears the
//! connection down itself once cancelled, after the in-flight message has
//! finished, so the connection is never closed under a running handler.

use std::sync::Arc;

use busline_config::{LoopMode, RuntimeConfig};
use busline_core::{BuslineError, QoS};
use busline_router::{CallbackRegistry, Pipeline, TopicMapper, WireConvertor};
use strum::Display;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::BusClient;

/// Lifecycle state of a [`BusClientFacade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FacadeState {
    Unconfigured,
    Initialised,
    Connected,
    Disconnected,
}

/// How the receive loop ended.
#[derive(Debug)]
enum LoopExit {
    Cancelled,
    Closed,
    Failed(BuslineError),
}

/// Owns the bus connection and routes its messages through the pipeline.
pub struct BusClientFacade {
    state: FacadeState,
    client: Option<Box<dyn BusClient>>,
    registry: Arc<CallbackRegistry>,
    config: Option<RuntimeConfig>,
    pipeline: Option<Arc<Pipeline>>,
    token: CancellationToken,
    task: Option<JoinHandle<LoopExit>>,
}

impl BusClientFacade {
    pub fn new(client: Box<dyn BusClient>, registry: Arc<CallbackRegistry>) -> Self {
        Self {
            state: FacadeState::Unconfigured,
            client: Some(client),
            registry,
            config: None,
            pipeline: None,
            token: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> FacadeState {
        self.state
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn config(&self) -> Option<&RuntimeConfig> {
        self.config.as_ref()
    }

    /// Token that stops the receive loop when cancelled.
    ///
    /// In blocking mode this is the only way to end [`start`](Self::start).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Takes ownership of `config` and wires the routing pipeline.
    pub fn initialise(&mut self, config: RuntimeConfig) -> Result<(), BuslineError> {
        self.require(FacadeState::Unconfigured, "initialise")?;

        let mapper = TopicMapper::with_base(config.subscription.base_topic.as_str());
        let convertor = Arc::new(WireConvertor::new(mapper));
        self.pipeline = Some(Arc::new(Pipeline::new(convertor, Arc::clone(&self.registry))));
        self.config = Some(config);
        self.state = FacadeState::Initialised;
        debug!(callbacks = self.registry.len(), "facade initialised");
        Ok(())
    }

    /// Connects, subscribes, and runs the receive loop.
    ///
    /// In blocking mode this returns once the loop ends; in non-blocking mode
    /// the loop is spawned and this returns as soon as the subscription is in
    /// place. On failure the connection is closed and the facade is left
    /// `Disconnected`.
    pub async fn start(&mut self) -> Result<(), BuslineError> {
        self.require(FacadeState::Initialised, "start")?;

        let (config, pipeline, mut client) =
            match (self.config.as_ref(), self.pipeline.clone(), self.client.take()) {
                (Some(config), Some(pipeline), Some(client)) => (config, pipeline, client),
                _ => {
                    self.state = FacadeState::Disconnected;
                    return Err(BuslineError::State {
                        operation: "start",
                        state: "missing bus client".to_string(),
                    });
                }
            };
        let filter = config.subscription.filter();
        let qos = config.subscription.qos;
        let loop_mode = config.session.loop_mode;

        if let Err(e) = open(client.as_mut(), &filter, qos).await {
            if let Err(close) = client.disconnect().await {
                debug!(error = %close, "disconnect after failed start");
            }
            self.state = FacadeState::Disconnected;
            return Err(e);
        }
        self.state = FacadeState::Connected;
        info!(filter = %filter, qos = qos.level(), mode = %loop_mode, "bus client connected");

        let task = tokio::spawn(receive_loop(client, pipeline, self.token.clone(), filter));
        match loop_mode {
            LoopMode::NonBlocking => {
                self.task = Some(task);
                Ok(())
            }
            LoopMode::Blocking => {
                self.task = Some(task);
                self.join().await
            }
        }
    }

    /// Stops the receive loop and closes the connection.
    ///
    /// Valid in every state and idempotent. Returns the loop's error if it
    /// ended because of a bus failure.
    pub async fn stop(&mut self) -> Result<(), BuslineError> {
        self.token.cancel();
        // A client still held here was never connected; the loop task owns
        // it otherwise.
        self.client = None;
        let result = self.join().await;
        if self.state != FacadeState::Disconnected {
            info!(from = %self.state, "bus client facade stopped");
        }
        self.state = FacadeState::Disconnected;
        result
    }

    async fn join(&mut self) -> Result<(), BuslineError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let exit = task.await.map_err(|e| BuslineError::Bus {
            message: "receive loop task failed".to_string(),
            source: Some(Box::new(e)),
        });
        self.state = FacadeState::Disconnected;
        match exit? {
            LoopExit::Cancelled | LoopExit::Closed => Ok(()),
            LoopExit::Failed(e) => Err(e),
        }
    }

    fn require(&self, expected: FacadeState, operation: &'static str) -> Result<(), BuslineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BuslineError::State {
                operation,
                state: self.state.to_string(),
            })
        }
    }
}

impl Drop for BusClientFacade {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for BusClientFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusClientFacade")
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("running", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

async fn open(client: &mut dyn BusClient, filter: &str, qos: QoS) -> Result<(), BuslineError> {
    client.connect().await?;
    client.subscribe(filter, qos).await
}

async fn receive_loop(
    mut client: Box<dyn BusClient>,
    pipeline: Arc<Pipeline>,
    token: CancellationToken,
    filter: String,
) -> LoopExit {
    let publisher = client.publisher();
    let exit = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break LoopExit::Cancelled,
            next = client.next_message() => match next {
                Ok(Some(raw)) => {
                    let outcome = pipeline.handle(&raw, publisher.as_ref());
                    debug!(
                        topic = %raw.topic,
                        routed = outcome.routed,
                        forwarded = outcome.forwarded,
                        failures = outcome.failures.len(),
                        "message handled"
                    );
                }
                Ok(None) => {
                    info!("bus connection closed");
                    break LoopExit::Closed;
                }
                Err(e) => {
                    error!(error = %e, "bus client failed");
                    break LoopExit::Failed(e);
                }
            },
        }
    };

    if let Err(e) = client.unsubscribe(&filter).await {
        warn!(filter = %filter, error = %e, "unsubscribe failed during shutdown");
    }
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "disconnect failed during shutdown");
    }
    exit
}
