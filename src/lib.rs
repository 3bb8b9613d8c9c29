//! # rovdash
//!
//! `rovdash` is the telemetry backbone for a remotely operated vehicle
//! dashboard. It keeps one MQTT connection to a broker, mirrors the most
//! recent telemetry snapshot in memory, and exposes that snapshot (plus a
//! command channel back to the vehicle) over a small HTTP surface.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `client`: the telemetry client wrapping the MQTT connection, topic
//!   bindings, QoS defaults and inbound message dispatch.
//! - `store`: the latest-value store holding the single live telemetry snapshot.
//! - `server`: the HTTP boundary translating requests into store reads and
//!   client publishes.
//! - `generator`: the synthetic data pusher used for demos and testing.
//! - `config`: handles loading and merging application configuration.
//! - `utils`: shared utilities, such as error types and logging setup.

pub mod client;
pub mod config;
pub mod generator;
pub mod server;
pub mod store;
pub mod utils;
