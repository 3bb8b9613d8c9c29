//! The link driver owns the MQTT event loop and feeds every event it
//! yields back into the telemetry client.
//!
//! Callers pick the processing mode: [`LinkDriver::run`] is a dedicated
//! background loop, [`LinkDriver::poll_once`] steps the link cooperatively
//! one event at a time. Handler dispatch happens on whichever task drives
//! the loop, so handlers must not block for long.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::EventLoop;
use tracing::warn;

use crate::client::telemetry_client::{LinkState, TelemetryClient};
use crate::utils::error::TelemetryError;

/// Pause between dials after the link drops. The MQTT library re-dials on
/// the next poll; without a pause an unreachable broker turns the loop hot.
const REDIAL_DELAY: Duration = Duration::from_secs(1);

pub struct LinkDriver {
    client: Arc<TelemetryClient>,
    event_loop: EventLoop,
}

impl LinkDriver {
    pub(crate) fn new(client: Arc<TelemetryClient>, event_loop: EventLoop) -> Self {
        Self { client, event_loop }
    }

    /// Drive the link until the broker acknowledges the session, at which
    /// point the announce+subscribe sequence has run. Any transport error
    /// before that is the one-shot connection failure surfaced to the
    /// caller of `connect`.
    pub(crate) async fn wait_until_connected(&mut self) -> Result<(), TelemetryError> {
        loop {
            match self.event_loop.poll().await {
                Ok(event) => {
                    self.client.handle_event(&event).await;
                    if *self.client.state().borrow() == LinkState::Connected {
                        return Ok(());
                    }
                }
                Err(e) => {
                    self.client.set_state(LinkState::Disconnected);
                    return Err(TelemetryError::Connection(e.to_string()));
                }
            }
        }
    }

    /// Process a single pending link event. Cooperative alternative to
    /// [`LinkDriver::run`] for callers that own their own loop.
    pub async fn poll_once(&mut self) -> Result<(), TelemetryError> {
        match self.event_loop.poll().await {
            Ok(event) => {
                self.client.handle_event(&event).await;
                Ok(())
            }
            Err(e) => {
                self.client.set_state(LinkState::Disconnected);
                Err(TelemetryError::Connection(e.to_string()))
            }
        }
    }

    /// Run the link as a background loop until the task is dropped.
    ///
    /// A transport error marks the link disconnected and keeps polling; the
    /// MQTT library dials again on the next poll and the resulting CONNACK
    /// re-runs the announce+subscribe sequence.
    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(event) => self.client.handle_event(&event).await,
                Err(e) => {
                    warn!("link error: {e}, redialing");
                    self.client.set_state(LinkState::Disconnected);
                    tokio::time::sleep(REDIAL_DELAY).await;
                    self.client.set_state(LinkState::Connecting);
                }
            }
        }
    }
}
