//! The `error` module defines the error taxonomy used within the `rovdash`
//! application.
//!
//! Every fallible operation in the crate surfaces one of these variants, so
//! callers can distinguish programmer errors (`NotBound`, `UnknownField`)
//! from recoverable runtime conditions (`Decode`, `PublishTimeout`) and
//! link-level failures (`Connection`).

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The broker cannot be reached, or the link failed underneath us.
    /// Surfaced to the caller; this layer never retries on its own.
    #[error("cannot reach broker: {0}")]
    Connection(String),

    /// Publish or subscribe was attempted with no resolvable topic.
    #[error("no topic bound for channel '{0}'")]
    NotBound(String),

    /// An inbound payload did not decode as a telemetry snapshot.
    #[error("malformed telemetry payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The broker did not acknowledge a publish within the configured wait.
    /// Delivery status of the message is unknown.
    #[error("publish not acknowledged within {0:?}")]
    PublishTimeout(Duration),

    /// A read asked for a field the current snapshot does not carry.
    #[error("unknown sensor field '{0}'")]
    UnknownField(String),
}
