use std::collections::HashMap;

use crate::utils::error::TelemetryError;

/// Logical channel carrying outbound telemetry and announcements.
pub const PUBLISH: &str = "publish";
/// Logical channel the client listens on.
pub const SUBSCRIBE: &str = "subscribe";
/// Logical channel for operator commands, derived from the publish topic.
pub const COMMAND: &str = "command";

/// Mapping from logical channel name to broker topic string.
///
/// Only one publish/subscribe pair is bound today, but callers address
/// channels by name so growing the set does not change any signature.
#[derive(Clone, Debug, Default)]
pub struct TopicTable {
    bindings: HashMap<String, String>,
}

impl TopicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `channel` to `topic`, replacing any previous binding.
    pub fn bind(&mut self, channel: &str, topic: &str) {
        self.bindings.insert(channel.to_string(), topic.to_string());
    }

    /// Resolve a channel to its topic, or fail with `NotBound`.
    pub fn resolve(&self, channel: &str) -> Result<&str, TelemetryError> {
        self.bindings
            .get(channel)
            .map(String::as_str)
            .ok_or_else(|| TelemetryError::NotBound(channel.to_string()))
    }

    pub fn is_bound(&self, channel: &str) -> bool {
        self.bindings.contains_key(channel)
    }
}
