// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MQTT bus client backed by `rumqttc`.
//!
//! Only MQTT 3.1.1 is spoken. The event loop reconnects on its own after a
//! dropped connection; subscriptions are replayed on every ConnAck.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use busline_config::{RuntimeConfig, Transport};
use busline_core::{BuslineError, InboundMessage, Publisher, QoS};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::bus::BusClient;

/// Capacity of the request channel between client handles and the event loop.
const REQUEST_CAPACITY: usize = 64;

/// Pause before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on flushing the DISCONNECT packet.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn bus_error(context: &str, detail: impl std::fmt::Display) -> BuslineError {
    BuslineError::Bus {
        message: format!("{context}: {detail}"),
        source: None,
    }
}

/// Builds the `rumqttc` options for `config`.
pub fn mqtt_options(config: &RuntimeConfig) -> MqttOptions {
    let broker = &config.broker;
    let session = &config.session;

    let mut options = match session.transport {
        Transport::Tcp => MqttOptions::new(&session.client_id, &broker.ip, broker.port),
        Transport::Websockets => {
            let url = format!("ws://{}:{}/mqtt", broker.ip, broker.port);
            let mut options = MqttOptions::new(&session.client_id, url, broker.port);
            options.set_transport(rumqttc::Transport::Ws);
            options
        }
    };
    options
        .set_keep_alive(Duration::from_secs(u64::from(broker.keepalive)))
        .set_clean_session(session.clean);

    if let Some(user) = &broker.user_name {
        let password = broker
            .password
            .as_ref()
            .map(|p| p.expose_secret().to_string())
            .unwrap_or_default();
        options.set_credentials(user, password);
    }
    options
}

/// [`BusClient`] over an MQTT 3.1.1 broker.
pub struct RumqttBusClient {
    client: AsyncClient,
    eventloop: EventLoop,
    subscriptions: Vec<(String, QoS)>,
    closing: bool,
    log_events: bool,
}

impl RumqttBusClient {
    /// Creates an unconnected client for `config`.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        Self {
            client,
            eventloop,
            subscriptions: Vec::new(),
            closing: false,
            log_events: config.logging.log_bus_client,
        }
    }

    fn trace_event(&self, event: &Event) {
        if self.log_events {
            debug!(?event, "mqtt event");
        }
    }

    fn resubscribe(&self) {
        for (filter, qos) in &self.subscriptions {
            match self.client.try_subscribe(filter.as_str(), to_mqtt_qos(*qos)) {
                Ok(()) => debug!(filter = %filter, "resubscribed"),
                Err(e) => warn!(filter = %filter, error = %e, "resubscribe failed"),
            }
        }
    }
}

#[async_trait]
impl BusClient for RumqttBusClient {
    async fn connect(&mut self) -> Result<(), BuslineError> {
        loop {
            let event = self
                .eventloop
                .poll()
                .await
                .map_err(|e| bus_error("connection failed", e))?;
            self.trace_event(&event);
            if let Event::Incoming(Packet::ConnAck(ack)) = event {
                info!(session_present = ack.session_present, "connected to broker");
                return Ok(());
            }
        }
    }

    async fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<(), BuslineError> {
        self.client
            .subscribe(filter, to_mqtt_qos(qos))
            .await
            .map_err(|e| bus_error("subscribe failed", e))?;
        if !self.subscriptions.iter().any(|(f, _)| f == filter) {
            self.subscriptions.push((filter.to_string(), qos));
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, filter: &str) -> Result<(), BuslineError> {
        self.subscriptions.retain(|(f, _)| f != filter);
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| bus_error("unsubscribe failed", e))
    }

    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BuslineError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if self.log_events {
                        debug!(topic = %publish.topic, bytes = publish.payload.len(), "mqtt publish received");
                    }
                    return Ok(Some(InboundMessage::new(
                        publish.topic,
                        publish.payload.to_vec(),
                        publish.qos as u8,
                        publish.retain,
                    )));
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("reconnected to broker");
                    self.resubscribe();
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) if self.closing => return Ok(None),
                Ok(event) => self.trace_event(&event),
                Err(_) if self.closing => return Ok(None),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(bus_error("broker refused connection", format!("{code:?}")));
                }
                Err(e) => {
                    warn!(error = %e, "connection lost, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    fn publisher(&self) -> Arc<dyn Publisher> {
        Arc::new(RumqttPublisher {
            client: self.client.clone(),
        })
    }

    async fn disconnect(&mut self) -> Result<(), BuslineError> {
        if self.closing {
            return Ok(());
        }
        self.closing = true;
        self.client
            .disconnect()
            .await
            .map_err(|e| bus_error("disconnect failed", e))?;

        // Drive the loop until the DISCONNECT packet is on the wire.
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            debug!("timed out flushing disconnect");
        }
        info!("disconnected from broker");
        Ok(())
    }
}

/// Publishes through the client's request queue without awaiting the network.
struct RumqttPublisher {
    client: AsyncClient,
}

impl Publisher for RumqttPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BuslineError> {
        self.client
            .try_publish(topic, to_mqtt_qos(qos), retain, payload)
            .map_err(|e| BuslineError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }
}
