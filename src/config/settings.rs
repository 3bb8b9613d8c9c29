use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the HTTP server, the broker link and the
/// synthetic data generator.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub mqtt: MqttSettings,
    pub generator: GeneratorSettings,
}

/// Configuration settings for the HTTP server.
///
/// Defines the host and port the dashboard backend will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker link.
///
/// Immutable once the connection is established; changing any of these
/// requires a reconnect.
#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    /// Client identifier; generated when unset.
    pub client_id: Option<String>,
    /// `"tcp"` for a raw stream, `"websocket"` for an upgradeable framed
    /// transport (the host must then be a `ws://` URL).
    pub transport: String,
    pub keepalive_secs: u64,
    pub clean_session: bool,
    pub publish_topic: String,
    pub subscribe_topic: String,
    /// Default QoS for outbound messages, 0..=2.
    pub publish_qos: u8,
    /// Default QoS for the subscription, 0..=2.
    pub subscribe_qos: u8,
    /// Announcement published on every (re)connection; defaults to
    /// `"<client-id>,connected"` when unset.
    pub on_connect_message: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Block publishes until the broker acknowledges delivery.
    pub wait_for_ack: bool,
    pub ack_timeout_ms: u64,
}

/// Configuration settings for the synthetic data generator.
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorSettings {
    pub interval_ms: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub mqtt: Option<PartialMqttSettings>,
    pub generator: Option<PartialGeneratorSettings>,
}

/// Partial server settings.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial broker-link settings.
#[derive(Debug, Deserialize)]
pub struct PartialMqttSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub transport: Option<String>,
    pub keepalive_secs: Option<u64>,
    pub clean_session: Option<bool>,
    pub publish_topic: Option<String>,
    pub subscribe_topic: Option<String>,
    pub publish_qos: Option<u8>,
    pub subscribe_qos: Option<u8>,
    pub on_connect_message: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub wait_for_ack: Option<bool>,
    pub ack_timeout_ms: Option<u64>,
}

/// Partial generator settings.
#[derive(Debug, Deserialize)]
pub struct PartialGeneratorSettings {
    pub interval_ms: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            mqtt: MqttSettings {
                host: "broker.hivemq.com".to_string(),
                port: 1883,
                client_id: None,
                transport: "tcp".to_string(),
                keepalive_secs: 120,
                clean_session: true,
                publish_topic: "rovdash/vehicle".to_string(),
                subscribe_topic: "rovdash/vehicle".to_string(),
                publish_qos: 2,
                subscribe_qos: 0,
                on_connect_message: None,
                username: None,
                password: None,
                wait_for_ack: false,
                ack_timeout_ms: 5000,
            },
            generator: GeneratorSettings { interval_ms: 1000 },
        }
    }
}
