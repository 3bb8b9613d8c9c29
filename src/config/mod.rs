mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{GeneratorSettings, MqttSettings, ServerSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, broker-link and
/// generator configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let server = partial.server.as_ref();
    let mqtt = partial.mqtt.as_ref();
    let generator = partial.generator.as_ref();

    Ok(Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        mqtt: MqttSettings {
            host: mqtt
                .and_then(|m| m.host.clone())
                .unwrap_or(default.mqtt.host),
            port: mqtt.and_then(|m| m.port).unwrap_or(default.mqtt.port),
            client_id: mqtt
                .and_then(|m| m.client_id.clone())
                .or(default.mqtt.client_id),
            transport: mqtt
                .and_then(|m| m.transport.clone())
                .unwrap_or(default.mqtt.transport),
            keepalive_secs: mqtt
                .and_then(|m| m.keepalive_secs)
                .unwrap_or(default.mqtt.keepalive_secs),
            clean_session: mqtt
                .and_then(|m| m.clean_session)
                .unwrap_or(default.mqtt.clean_session),
            publish_topic: mqtt
                .and_then(|m| m.publish_topic.clone())
                .unwrap_or(default.mqtt.publish_topic),
            subscribe_topic: mqtt
                .and_then(|m| m.subscribe_topic.clone())
                .unwrap_or(default.mqtt.subscribe_topic),
            publish_qos: mqtt
                .and_then(|m| m.publish_qos)
                .unwrap_or(default.mqtt.publish_qos),
            subscribe_qos: mqtt
                .and_then(|m| m.subscribe_qos)
                .unwrap_or(default.mqtt.subscribe_qos),
            on_connect_message: mqtt
                .and_then(|m| m.on_connect_message.clone())
                .or(default.mqtt.on_connect_message),
            username: mqtt
                .and_then(|m| m.username.clone())
                .or(default.mqtt.username),
            password: mqtt
                .and_then(|m| m.password.clone())
                .or(default.mqtt.password),
            wait_for_ack: mqtt
                .and_then(|m| m.wait_for_ack)
                .unwrap_or(default.mqtt.wait_for_ack),
            ack_timeout_ms: mqtt
                .and_then(|m| m.ack_timeout_ms)
                .unwrap_or(default.mqtt.ack_timeout_ms),
        },
        generator: GeneratorSettings {
            interval_ms: generator
                .and_then(|g| g.interval_ms)
                .unwrap_or(default.generator.interval_ms),
        },
    })
}

#[cfg(test)]
mod tests;
