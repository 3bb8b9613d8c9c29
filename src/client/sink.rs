//! Outbound message seam between the telemetry client and the MQTT library.
//!
//! The trait keeps the client's publish path independent of a concrete
//! client crate, which also lets tests record traffic without a broker.

use async_trait::async_trait;
use rumqttc::AsyncClient;

use crate::client::telemetry_client::QosLevel;
use crate::utils::error::TelemetryError;

/// Minimal publish/subscribe interface the client talks to the broker through.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish a binary payload to `topic` with the given QoS and retain flag.
    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TelemetryError>;

    /// Subscribe to `topic` at the given QoS.
    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), TelemetryError>;
}

/// The production sink, wrapping the rumqttc request channel.
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSink for MqttSink {
    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TelemetryError> {
        self.client
            .publish(topic, qos.into(), retain, payload)
            .await
            .map_err(|e| TelemetryError::Connection(e.to_string()))
    }

    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), TelemetryError> {
        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|e| TelemetryError::Connection(e.to_string()))
    }
}
