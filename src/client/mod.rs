//! The `client` module implements the telemetry client: one logical broker
//! connection, one subscribe topic, one publish topic, and a single
//! registered handler for inbound messages.
//!
//! The wire protocol, TLS and reconnection backoff belong to the underlying
//! MQTT library; this module mediates configuration, topic resolution, QoS
//! defaults, the on-connect announce/subscribe sequence and dispatch.

pub mod link;
pub mod sink;
pub mod telemetry_client;
pub mod topics;

pub use link::LinkDriver;
pub use sink::{MessageSink, MqttSink};
pub use telemetry_client::{
    channel_handler, InboundMessage, LinkState, MessageHandler, QosLevel, TelemetryClient,
    TransportKind,
};
pub use topics::TopicTable;

#[cfg(test)]
mod tests;
