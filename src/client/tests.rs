use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::mqttbytes::v4::{ConnAck, ConnectReturnCode, PubAck, PubComp, Publish};
use rumqttc::{Event, Packet};

use super::sink::MessageSink;
use super::telemetry_client::{LinkState, QosLevel, TelemetryClient};
use super::topics::{self, TopicTable};
use crate::store::{LatestValueStore, TelemetrySnapshot};
use crate::utils::error::TelemetryError;

#[derive(Debug, Clone, PartialEq)]
enum SinkCall {
    Publish {
        topic: String,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    },
    Subscribe {
        topic: String,
        qos: QosLevel,
    },
}

/// Sink that records traffic instead of talking to a broker.
#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TelemetryError> {
        self.calls.lock().unwrap().push(SinkCall::Publish {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), TelemetryError> {
        self.calls.lock().unwrap().push(SinkCall::Subscribe {
            topic: topic.to_string(),
            qos,
        });
        Ok(())
    }
}

fn connected_client() -> (Arc<TelemetryClient>, Arc<RecordingSink>) {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    let client = Arc::new(client);
    let sink = Arc::new(RecordingSink::default());
    client.attach_sink(sink.clone());
    (client, sink)
}

fn connack() -> Event {
    Event::Incoming(Packet::ConnAck(ConnAck {
        session_present: false,
        code: ConnectReturnCode::Success,
    }))
}

fn disconnect() -> Event {
    Event::Incoming(Packet::Disconnect)
}

fn inbound(payload: &[u8]) -> Event {
    Event::Incoming(Packet::Publish(Publish::new(
        "rov/vehicle",
        rumqttc::QoS::AtMostOnce,
        payload,
    )))
}

fn sample_payload(bot_speed: u16) -> Vec<u8> {
    serde_json::to_vec(&TelemetrySnapshot {
        compass_heading: 90,
        gps_heading: 45,
        bot_speed,
        gps_speed: 11,
        rudder_angle: 3,
        satellite: 9,
        valid: 1,
    })
    .unwrap()
}

#[test]
fn topic_table_resolves_bound_channels() {
    let mut table = TopicTable::new();
    table.bind(topics::PUBLISH, "rov/vehicle");

    assert_eq!(table.resolve(topics::PUBLISH).unwrap(), "rov/vehicle");
    assert!(table.is_bound(topics::PUBLISH));
    assert!(!table.is_bound(topics::SUBSCRIBE));
}

#[test]
fn topic_table_rebind_replaces_previous_binding() {
    let mut table = TopicTable::new();
    table.bind(topics::SUBSCRIBE, "rov/a");
    table.bind(topics::SUBSCRIBE, "rov/b");
    assert_eq!(table.resolve(topics::SUBSCRIBE).unwrap(), "rov/b");
}

#[test]
fn unbound_channel_fails_with_not_bound() {
    let table = TopicTable::new();
    let err = table.resolve(topics::COMMAND).unwrap_err();
    assert!(matches!(err, TelemetryError::NotBound(c) if c == topics::COMMAND));
}

#[test]
fn qos_levels_map_to_wire_values() {
    assert_eq!(QosLevel::from_u8(0), Some(QosLevel::AtMostOnce));
    assert_eq!(QosLevel::from_u8(1), Some(QosLevel::AtLeastOnce));
    assert_eq!(QosLevel::from_u8(2), Some(QosLevel::ExactlyOnce));
    assert_eq!(QosLevel::from_u8(3), None);
}

#[test]
fn binding_both_topics_marks_the_client_configured() {
    let mut client = TelemetryClient::new("4242");
    assert_eq!(*client.state().borrow(), LinkState::Unconfigured);

    client.set_publish_topic("rov/vehicle");
    assert_eq!(*client.state().borrow(), LinkState::Unconfigured);

    client.set_subscribe_topic("rov/vehicle");
    assert_eq!(*client.state().borrow(), LinkState::Configured);
}

#[tokio::test]
async fn publish_without_binding_makes_no_network_call() {
    let client = Arc::new(TelemetryClient::new("4242"));
    let sink = Arc::new(RecordingSink::default());
    client.attach_sink(sink.clone());

    let err = client.publish(b"ping".to_vec(), None, None, false).await;
    assert!(matches!(err, Err(TelemetryError::NotBound(_))));
    assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn publish_uses_bound_topic_and_default_qos() {
    let (client, sink) = connected_client();

    client.publish(b"ping".to_vec(), None, None, false).await.unwrap();

    assert_eq!(
        sink.calls(),
        vec![SinkCall::Publish {
            topic: "rov/vehicle".to_string(),
            qos: QosLevel::ExactlyOnce,
            retain: false,
            payload: b"ping".to_vec(),
        }]
    );
}

#[tokio::test]
async fn publish_honors_per_call_overrides() {
    let (client, sink) = connected_client();

    client
        .publish(
            b"pong".to_vec(),
            Some("rov/other"),
            Some(QosLevel::AtLeastOnce),
            true,
        )
        .await
        .unwrap();

    assert_eq!(
        sink.calls(),
        vec![SinkCall::Publish {
            topic: "rov/other".to_string(),
            qos: QosLevel::AtLeastOnce,
            retain: true,
            payload: b"pong".to_vec(),
        }]
    );
}

#[tokio::test]
async fn connack_triggers_announce_then_subscribe() {
    let (client, sink) = connected_client();

    client.handle_event(&connack()).await;

    assert_eq!(*client.state().borrow(), LinkState::Connected);
    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Publish {
                topic: "rov/vehicle".to_string(),
                qos: QosLevel::AtMostOnce,
                retain: false,
                payload: b"4242,connected".to_vec(),
            },
            SinkCall::Subscribe {
                topic: "rov/vehicle".to_string(),
                qos: QosLevel::AtMostOnce,
            },
        ]
    );
}

#[tokio::test]
async fn configured_announcement_replaces_the_fallback() {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    client.set_on_connect_message("surfaced and ready");
    let client = Arc::new(client);
    let sink = Arc::new(RecordingSink::default());
    client.attach_sink(sink.clone());

    client.handle_event(&connack()).await;

    match &sink.calls()[0] {
        SinkCall::Publish { payload, .. } => {
            assert_eq!(payload, b"surfaced and ready");
        }
        other => panic!("expected announcement publish, got {other:?}"),
    }
}

#[tokio::test]
async fn reconnect_repeats_the_announce_subscribe_sequence() {
    let (client, sink) = connected_client();

    client.handle_event(&connack()).await;
    client.handle_event(&disconnect()).await;
    assert_eq!(*client.state().borrow(), LinkState::Disconnected);
    client.handle_event(&connack()).await;

    let calls = sink.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], calls[2]);
    assert_eq!(calls[1], calls[3]);
    assert!(matches!(calls[2], SinkCall::Publish { .. }));
    assert!(matches!(calls[3], SinkCall::Subscribe { .. }));
}

#[tokio::test]
async fn failing_handler_does_not_stop_dispatch() {
    let (client, _sink) = connected_client();
    let store = LatestValueStore::seeded();

    {
        let store = store.clone();
        client.register_handler(Box::new(move |msg| {
            store.update(&msg.payload)?;
            Err(TelemetryError::Connection("handler always fails".to_string()))
        }));
    }

    client.handle_event(&inbound(&sample_payload(10))).await;
    client.handle_event(&inbound(&sample_payload(23))).await;

    assert_eq!(store.read("bot_speed").unwrap(), 23);
}

#[tokio::test]
async fn malformed_inbound_payload_leaves_the_store_intact() {
    let (client, _sink) = connected_client();
    let store = LatestValueStore::seeded();
    {
        let store = store.clone();
        client.register_handler(Box::new(move |msg| store.update(&msg.payload)));
    }

    client.handle_event(&inbound(&sample_payload(17))).await;
    client.handle_event(&inbound(b"garbage")).await;

    assert_eq!(store.read("bot_speed").unwrap(), 17);
}

#[tokio::test]
async fn registering_a_handler_replaces_the_previous_one() {
    let (client, _sink) = connected_client();
    let first_hits = Arc::new(Mutex::new(0u32));
    let second_hits = Arc::new(Mutex::new(0u32));

    {
        let hits = first_hits.clone();
        client.register_handler(Box::new(move |_| {
            *hits.lock().unwrap() += 1;
            Ok(())
        }));
    }
    {
        let hits = second_hits.clone();
        client.register_handler(Box::new(move |_| {
            *hits.lock().unwrap() += 1;
            Ok(())
        }));
    }

    client.handle_event(&inbound(&sample_payload(5))).await;

    assert_eq!(*first_hits.lock().unwrap(), 0);
    assert_eq!(*second_hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn ack_wait_completes_on_puback() {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    client.set_wait_for_ack(true, Duration::from_secs(1));
    let client = Arc::new(client);
    let sink = Arc::new(RecordingSink::default());
    client.attach_sink(sink.clone());

    let publisher = {
        let client = client.clone();
        async move {
            client
                .publish(b"cmd".to_vec(), None, Some(QosLevel::AtLeastOnce), false)
                .await
        }
    };
    let acker = {
        let client = client.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            client
                .handle_event(&Event::Incoming(Packet::PubAck(PubAck { pkid: 1 })))
                .await;
        }
    };

    let (result, ()) = tokio::join!(publisher, acker);
    result.unwrap();
}

#[tokio::test]
async fn exactly_once_wait_ignores_puback_and_completes_on_pubcomp() {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    client.set_wait_for_ack(true, Duration::from_secs(1));
    let client = Arc::new(client);
    client.attach_sink(Arc::new(RecordingSink::default()));

    let publisher = {
        let client = client.clone();
        async move {
            client
                .publish(b"cmd".to_vec(), None, Some(QosLevel::ExactlyOnce), false)
                .await
        }
    };
    let acker = {
        let client = client.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            client
                .handle_event(&Event::Incoming(Packet::PubAck(PubAck { pkid: 1 })))
                .await;
            client
                .handle_event(&Event::Incoming(Packet::PubComp(PubComp { pkid: 1 })))
                .await;
        }
    };

    let (result, ()) = tokio::join!(publisher, acker);
    result.unwrap();
}

#[tokio::test]
async fn ack_wait_times_out_without_an_ack() {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    client.set_wait_for_ack(true, Duration::from_millis(50));
    let client = Arc::new(client);
    client.attach_sink(Arc::new(RecordingSink::default()));

    let err = client
        .publish(b"cmd".to_vec(), None, Some(QosLevel::AtLeastOnce), false)
        .await
        .unwrap_err();
    assert!(matches!(err, TelemetryError::PublishTimeout(_)));
}

#[tokio::test]
async fn ack_wait_is_a_noop_for_at_most_once() {
    let mut client = TelemetryClient::new("4242");
    client.set_publish_topic("rov/vehicle");
    client.set_subscribe_topic("rov/vehicle");
    client.set_wait_for_ack(true, Duration::from_secs(30));
    let client = Arc::new(client);
    let sink = Arc::new(RecordingSink::default());
    client.attach_sink(sink.clone());

    // Returns immediately despite the long timeout and the missing ack.
    client
        .publish(b"cmd".to_vec(), None, Some(QosLevel::AtMostOnce), false)
        .await
        .unwrap();
    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test]
async fn channel_handler_feeds_a_consumer_with_inbound_messages() {
    let (client, _sink) = connected_client();
    let store = LatestValueStore::seeded();

    let (handler, mut queue) = super::telemetry_client::channel_handler(8);
    client.register_handler(handler);

    client.handle_event(&inbound(&sample_payload(19))).await;

    let msg = queue.recv().await.unwrap();
    store.update(&msg.payload).unwrap();
    assert_eq!(store.read("bot_speed").unwrap(), 19);
}

#[tokio::test]
async fn channel_handler_drops_messages_once_the_queue_is_full() {
    let (client, _sink) = connected_client();

    let (handler, mut queue) = super::telemetry_client::channel_handler(1);
    client.register_handler(handler);

    // Second dispatch overflows the queue; it is logged and dropped, and
    // the loop keeps going.
    client.handle_event(&inbound(&sample_payload(1))).await;
    client.handle_event(&inbound(&sample_payload(2))).await;
    client.handle_event(&inbound(&sample_payload(3))).await;

    let first = queue.recv().await.unwrap();
    let store = LatestValueStore::seeded();
    store.update(&first.payload).unwrap();
    assert_eq!(store.read("bot_speed").unwrap(), 1);
    assert!(queue.try_recv().is_err());
}

#[tokio::test]
async fn command_channel_is_derived_from_publish_topic_and_id() {
    let (client, sink) = connected_client();

    client.publish_command("full_ahead").await.unwrap();

    assert_eq!(
        sink.calls(),
        vec![SinkCall::Publish {
            topic: "rov/vehicle/4242".to_string(),
            qos: QosLevel::ExactlyOnce,
            retain: false,
            payload: b"full_ahead".to_vec(),
        }]
    );
}
