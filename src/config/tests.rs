use std::env;
use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::load_config;
use super::settings::Settings;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.mqtt.host, "broker.hivemq.com");
    assert_eq!(settings.mqtt.port, 1883);
    assert_eq!(settings.mqtt.keepalive_secs, 120);
    assert_eq!(settings.mqtt.publish_topic, "rovdash/vehicle");
    assert_eq!(settings.mqtt.subscribe_topic, "rovdash/vehicle");
    assert_eq!(settings.mqtt.publish_qos, 2);
    assert_eq!(settings.mqtt.subscribe_qos, 0);
    assert!(!settings.mqtt.wait_for_ack);
    assert_eq!(settings.mqtt.ack_timeout_ms, 5000);
    assert_eq!(settings.generator.interval_ms, 1000);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // Run from a temporary directory so load_config picks up the
    // config/default.toml written there and nothing else.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [mqtt]
        host = "broker.local"
        port = 8883
        subscribe_topic = "fleet/rov-7"
        publish_qos = 1
        wait_for_ack = true

        [generator]
        interval_ms = 250
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config().expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.mqtt.host, "broker.local");
    assert_eq!(cfg.mqtt.port, 8883);
    assert_eq!(cfg.mqtt.subscribe_topic, "fleet/rov-7");
    assert_eq!(cfg.mqtt.publish_qos, 1);
    assert!(cfg.mqtt.wait_for_ack);
    assert_eq!(cfg.generator.interval_ms, 250);

    // Unspecified values still come from the defaults
    assert_eq!(cfg.mqtt.publish_topic, "rovdash/vehicle");
    assert_eq!(cfg.mqtt.subscribe_qos, 0);

    // restore cwd
    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
#[serial]
fn load_config_from_environment_overrides_defaults() {
    // A fresh cwd keeps any real config/default.toml out of the test.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    temp_env::with_vars(
        [
            ("SERVER_PORT", Some("8088")),
            ("MQTT_HOST", Some("env.broker.local")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 8088);
            assert_eq!(cfg.mqtt.host, "env.broker.local");
            assert_eq!(cfg.server.host, "127.0.0.1");
        },
    );

    env::set_current_dir(orig).expect("restore cwd");
}
