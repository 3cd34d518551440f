//! MQTT delivery of telemetry payloads.
//!
//! `rumqttc` splits a connection into a cheap [`AsyncClient`] handle and an
//! [`EventLoop`] that does the actual network I/O. The event loop runs on its
//! own task for the lifetime of the process: it connects, keeps the session
//! alive, flushes queued publishes, and reconnects after errors. The tick
//! loop only ever enqueues one publish per tick through the client, and
//! never waits for queue space.

use std::time::Duration;

use datalogger_core::config::BrokerConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PublisherError;
use crate::runner::TelemetrySink;

/// Capacity of the client-to-event-loop request queue.
const REQUEST_QUEUE_CAPACITY: usize = 10;

/// Back-off after an event loop error before polling again.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// How long shutdown waits for the disconnect to be flushed.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Publish-only MQTT client bound to a single topic.
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
    event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    /// Create the client and start the background event loop.
    ///
    /// The TCP connection is opened lazily by the event loop; publishes made
    /// before it completes are queued.
    pub fn connect(config: &BrokerConfig) -> Self {
        info!(
            host = config.host,
            port = config.port,
            client_id = config.client_id,
            "connecting to MQTT broker"
        );
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let event_loop = tokio::spawn(drive_event_loop(event_loop));

        Self {
            client,
            topic: config.topic.clone(),
            event_loop,
        }
    }

    /// Topic this client publishes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send a DISCONNECT and wait briefly for the event loop to flush it.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Mqtt`] if the disconnect request cannot be
    /// queued.
    pub async fn disconnect(self) -> Result<(), PublisherError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| PublisherError::Mqtt(format!("failed to request disconnect: {e}")))?;
        if tokio::time::timeout(DISCONNECT_GRACE, self.event_loop)
            .await
            .is_err()
        {
            warn!("MQTT event loop did not finish within the disconnect grace period");
        }
        Ok(())
    }
}

impl TelemetrySink for MqttPublisher {
    /// Enqueue without waiting. A full request queue (broker unreachable
    /// for more than [`REQUEST_QUEUE_CAPACITY`] ticks) is reported as an
    /// error so the tick loop keeps running.
    async fn publish(&self, json: String) -> Result<(), PublisherError> {
        debug!(topic = self.topic, bytes = json.len(), "publishing telemetry");
        self.client
            .try_publish(self.topic.as_str(), QoS::AtLeastOnce, false, json)
            .map_err(|e| PublisherError::Mqtt(format!("failed to publish to {}: {e}", self.topic)))
    }
}

impl std::fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// Poll the event loop until a DISCONNECT has been sent.
///
/// Errors are logged and followed by a short back-off; the next poll
/// reconnects.
async fn drive_event_loop(mut event_loop: EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(code = ?ack.code, "MQTT connection established");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("MQTT disconnect sent");
                break;
            }
            Ok(event) => {
                debug!(event = ?event, "MQTT event");
            }
            Err(e) => {
                error!(error = %e, "MQTT event loop error");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}
