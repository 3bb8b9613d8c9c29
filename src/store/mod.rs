//! The `store` module holds the latest-value telemetry state.
//!
//! Exactly one snapshot is live at a time: every successfully decoded
//! inbound message replaces it as a whole, and the serving layer reads
//! named fields from it on demand. Nothing here is persisted; the snapshot
//! lives only in process memory.

pub mod latest;
pub mod snapshot;

pub use latest::LatestValueStore;
pub use snapshot::TelemetrySnapshot;
