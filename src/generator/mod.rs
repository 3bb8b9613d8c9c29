//! The `generator` module produces synthetic telemetry for demos and
//! testing without a live vehicle feed.
//!
//! It is not part of the production surface: the `push` subcommand runs
//! [`run`] against the same broker and topics the dashboard subscribes to.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::TelemetryClient;
use crate::store::TelemetrySnapshot;
use crate::utils::error::TelemetryError;

/// Publish one randomized snapshot on the client's publish channel.
pub async fn push_once(client: &TelemetryClient) -> Result<(), TelemetryError> {
    let snapshot = TelemetrySnapshot::random();
    let payload = serde_json::to_vec(&snapshot)?;
    client.publish(payload, None, None, false).await?;
    debug!(speed = snapshot.bot_speed, heading = snapshot.compass_heading, "pushed snapshot");
    Ok(())
}

/// Generate, publish, sleep, repeat until the task is stopped. A failed
/// push is logged and the loop keeps going; the link driver re-dials
/// underneath it.
pub async fn run(client: Arc<TelemetryClient>, interval: Duration) {
    loop {
        if let Err(e) = push_once(&client).await {
            warn!("push failed: {e}");
        }
        tokio::time::sleep(interval).await;
    }
}
