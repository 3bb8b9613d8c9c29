use std::sync::{Arc, Mutex};

use crate::store::snapshot::TelemetrySnapshot;
use crate::utils::error::TelemetryError;

/// Shared single-slot store for the most recent telemetry snapshot.
///
/// The connection loop writes through [`LatestValueStore::update`] and the
/// serving layer reads through [`LatestValueStore::read`], potentially from
/// different tasks. A mutex guards the slot; an update decodes fully before
/// the lock is taken, so readers never observe a partially applied record.
///
/// Cloning is cheap and every clone shares the same slot.
#[derive(Clone, Debug)]
pub struct LatestValueStore {
    snapshot: Arc<Mutex<TelemetrySnapshot>>,
}

impl LatestValueStore {
    pub fn new(initial: TelemetrySnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(initial)),
        }
    }

    /// Create a store seeded with randomized placeholder values, the state
    /// the dashboard shows before the first real message arrives.
    pub fn seeded() -> Self {
        Self::new(TelemetrySnapshot::random())
    }

    /// Decode `raw` as a snapshot and replace the current one atomically.
    ///
    /// On a decode failure the existing snapshot is left untouched and the
    /// error is returned to the caller; processing of later messages is
    /// unaffected.
    pub fn update(&self, raw: &[u8]) -> Result<(), TelemetryError> {
        let decoded: TelemetrySnapshot = serde_json::from_slice(raw)?;
        *self.snapshot.lock().unwrap() = decoded;
        Ok(())
    }

    /// Return the current value of one named field.
    pub fn read(&self, field: &str) -> Result<u16, TelemetryError> {
        self.snapshot
            .lock()
            .unwrap()
            .get(field)
            .ok_or_else(|| TelemetryError::UnknownField(field.to_string()))
    }

    /// Copy out the whole current snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.snapshot.lock().unwrap()
    }
}
