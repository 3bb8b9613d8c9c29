use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::mqttbytes::v4::ConnectReturnCode;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Transport};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::client::link::LinkDriver;
use crate::client::sink::{MessageSink, MqttSink};
use crate::client::topics::{self, TopicTable};
use crate::config::MqttSettings;
use crate::utils::error::TelemetryError;

/// Delivery guarantee for a single message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    /// Map the wire-level 0/1/2 encoding used in configuration files.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

impl From<QosLevel> for rumqttc::QoS {
    fn from(qos: QosLevel) -> Self {
        match qos {
            QosLevel::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QosLevel::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl From<rumqttc::QoS> for QosLevel {
    fn from(qos: rumqttc::QoS) -> Self {
        match qos {
            rumqttc::QoS::AtMostOnce => Self::AtMostOnce,
            rumqttc::QoS::AtLeastOnce => Self::AtLeastOnce,
            rumqttc::QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// How the underlying connection is carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// Raw TCP stream.
    #[default]
    Tcp,
    /// MQTT over websockets; the broker host must be a `ws://` URL.
    Websocket,
}

/// Lifecycle of the broker link.
///
/// `Connect` moves `Configured` to `Connecting`; the broker's CONNACK moves
/// `Connecting` to `Connected` and triggers the announce+subscribe
/// sequence; a transport-level drop moves `Connected` to `Disconnected`,
/// after which the link driver dials again and the sequence re-runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Unconfigured,
    Configured,
    Connecting,
    Connected,
    Disconnected,
}

/// Broker acknowledgment observed on the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AckEvent {
    /// PUBACK for an at-least-once publish.
    Published(u16),
    /// PUBCOMP completing an exactly-once publish.
    Completed(u16),
}

/// An inbound message as handed to the registered handler.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QosLevel,
    pub retain: bool,
}

/// The single inbound-message handler. A returned error is logged at the
/// dispatch boundary and never propagates into the connection loop.
pub type MessageHandler = Box<dyn FnMut(&InboundMessage) -> Result<(), TelemetryError> + Send>;

/// Build a handler that forwards inbound messages onto a bounded channel,
/// plus the receiving end for a consumer task.
///
/// The handler itself never blocks the connection loop; when the consumer
/// falls behind and the queue is full, the message is dropped and the
/// dispatch boundary logs the error.
pub fn channel_handler(capacity: usize) -> (MessageHandler, mpsc::Receiver<InboundMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handler: MessageHandler = Box::new(move |msg| {
        tx.try_send(msg.clone())
            .map_err(|e| TelemetryError::Connection(format!("inbound queue rejected message: {e}")))
    });
    (handler, rx)
}

const DEFAULT_BROKER: &str = "broker.hivemq.com";
const DEFAULT_PORT: u16 = 1883;
const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(120);
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(5000);
const REQUEST_CHANNEL_CAPACITY: usize = 100;

/// Telemetry client: owns the connection configuration, topic bindings and
/// QoS defaults, and mediates all publish/subscribe traffic.
///
/// Configuration setters take `&mut self` and are therefore only callable
/// before the client is shared and connected. After
/// [`TelemetryClient::connect`] the client is used behind an `Arc` by the
/// link driver, the serving layer and the generator.
pub struct TelemetryClient {
    id: String,
    broker: String,
    port: u16,
    keepalive: Duration,
    clean_session: bool,
    transport: TransportKind,
    credentials: Option<(String, String)>,
    publish_qos: QosLevel,
    subscribe_qos: QosLevel,
    on_connect_msg: Option<String>,
    wait_for_ack: bool,
    ack_timeout: Duration,
    topics: Mutex<TopicTable>,
    sink: Mutex<Option<Arc<dyn MessageSink>>>,
    handler: Mutex<Option<MessageHandler>>,
    state_tx: watch::Sender<LinkState>,
    ack_tx: broadcast::Sender<AckEvent>,
}

impl TelemetryClient {
    /// Create an unconfigured client with the original dashboard defaults:
    /// public test broker, port 1883, subscribe at QoS 0, publish at QoS 2.
    pub fn new(id: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(LinkState::Unconfigured);
        let (ack_tx, _) = broadcast::channel(16);
        Self {
            id: id.into(),
            broker: DEFAULT_BROKER.to_string(),
            port: DEFAULT_PORT,
            keepalive: DEFAULT_KEEPALIVE,
            clean_session: true,
            transport: TransportKind::Tcp,
            credentials: None,
            publish_qos: QosLevel::ExactlyOnce,
            subscribe_qos: QosLevel::AtMostOnce,
            on_connect_msg: None,
            wait_for_ack: false,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            topics: Mutex::new(TopicTable::new()),
            sink: Mutex::new(None),
            handler: Mutex::new(None),
            state_tx,
            ack_tx,
        }
    }

    /// Build a client from the `[mqtt]` configuration section. A missing
    /// client id is filled with a generated one, and out-of-range QoS or
    /// transport values fall back to the defaults with a warning.
    pub fn from_settings(settings: &MqttSettings) -> Self {
        let id = settings
            .client_id
            .clone()
            .unwrap_or_else(|| format!("rovdash-{}", uuid::Uuid::new_v4()));

        let mut client = Self::new(id);
        client.set_broker(&settings.host);
        client.set_port(settings.port);
        client.set_keepalive(Duration::from_secs(settings.keepalive_secs));
        client.set_clean_session(settings.clean_session);
        client.set_publish_topic(&settings.publish_topic);
        client.set_subscribe_topic(&settings.subscribe_topic);

        match settings.transport.as_str() {
            "tcp" => client.set_transport(TransportKind::Tcp),
            "websocket" | "ws" => client.set_transport(TransportKind::Websocket),
            other => warn!("unknown transport '{other}', staying on tcp"),
        }
        match QosLevel::from_u8(settings.publish_qos) {
            Some(qos) => client.set_publish_qos(qos),
            None => warn!("publish_qos {} out of range, keeping default", settings.publish_qos),
        }
        match QosLevel::from_u8(settings.subscribe_qos) {
            Some(qos) => client.set_subscribe_qos(qos),
            None => warn!(
                "subscribe_qos {} out of range, keeping default",
                settings.subscribe_qos
            ),
        }
        if let Some(msg) = &settings.on_connect_message {
            client.set_on_connect_message(msg);
        }
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            client.set_credentials(user, pass);
        }
        client.set_wait_for_ack(
            settings.wait_for_ack,
            Duration::from_millis(settings.ack_timeout_ms),
        );
        client
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_broker(&mut self, host: &str) {
        self.broker = host.to_string();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_keepalive(&mut self, keepalive: Duration) {
        self.keepalive = keepalive;
    }

    pub fn set_clean_session(&mut self, clean: bool) {
        self.clean_session = clean;
    }

    pub fn set_transport(&mut self, transport: TransportKind) {
        self.transport = transport;
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some((username.to_string(), password.to_string()));
    }

    /// Bind the publish channel. The command channel is derived from it as
    /// `<topic>/<client-id>`.
    pub fn set_publish_topic(&mut self, topic: &str) {
        let command = format!("{topic}/{}", self.id);
        {
            let mut table = self.topics.lock().unwrap();
            table.bind(topics::PUBLISH, topic);
            table.bind(topics::COMMAND, &command);
        }
        self.mark_configured_if_ready();
    }

    /// Bind the subscribe channel. Subscription happens inside the
    /// connection-acknowledged handling, so this must be set before
    /// `connect`.
    pub fn set_subscribe_topic(&mut self, topic: &str) {
        self.topics.lock().unwrap().bind(topics::SUBSCRIBE, topic);
        self.mark_configured_if_ready();
    }

    pub fn set_publish_qos(&mut self, qos: QosLevel) {
        self.publish_qos = qos;
    }

    pub fn set_subscribe_qos(&mut self, qos: QosLevel) {
        self.subscribe_qos = qos;
    }

    /// Message published on every (re)connection. When unset, the fallback
    /// is `"<client-id>,connected"`.
    pub fn set_on_connect_message(&mut self, msg: &str) {
        self.on_connect_msg = Some(msg.to_string());
    }

    /// Enable or disable blocking publishes until the broker acknowledges
    /// delivery. At-most-once publishes have no acknowledgment to wait for,
    /// so the wait is a no-op for them regardless of this flag.
    pub fn set_wait_for_ack(&mut self, wait: bool, timeout: Duration) {
        self.wait_for_ack = wait;
        self.ack_timeout = timeout;
    }

    /// Install the inbound-message handler, replacing any previous one.
    /// Takes effect from the next dispatched message.
    pub fn register_handler(&self, handler: MessageHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    /// Watch the link state. The receiver observes every transition,
    /// including the announce-triggering `Connected` edges on reconnect.
    pub fn state(&self) -> watch::Receiver<LinkState> {
        self.state_tx.subscribe()
    }

    /// Open the connection to the broker, using configured defaults for any
    /// omitted argument, and drive the link until the broker acknowledges
    /// the session (at which point the announcement has been published and
    /// the subscription placed).
    ///
    /// Fails with `NotBound` when either topic binding is missing, and with
    /// `Connection` when the broker cannot be reached. Reconnection after a
    /// later drop is handled by the returned [`LinkDriver`], not here.
    pub async fn connect(
        self: Arc<Self>,
        host: Option<&str>,
        port: Option<u16>,
        keepalive: Option<Duration>,
    ) -> Result<LinkDriver, TelemetryError> {
        {
            let table = self.topics.lock().unwrap();
            table.resolve(topics::PUBLISH)?;
            table.resolve(topics::SUBSCRIBE)?;
        }

        let host = host.unwrap_or(&self.broker);
        let port = port.unwrap_or(self.port);
        let keepalive = keepalive.unwrap_or(self.keepalive);

        let mut options = MqttOptions::new(self.id.as_str(), host, port);
        options.set_keep_alive(keepalive);
        options.set_clean_session(self.clean_session);
        if self.transport == TransportKind::Websocket {
            options.set_transport(Transport::Ws);
        }
        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user, pass);
        }

        let (async_client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        self.attach_sink(Arc::new(MqttSink::new(async_client)));
        self.set_state(LinkState::Connecting);
        info!("connecting to {host}:{port} as '{}'", self.id);

        let mut driver = LinkDriver::new(self, event_loop);
        driver.wait_until_connected().await?;
        Ok(driver)
    }

    /// Publish `payload` to `topic` if given, else to the bound publish
    /// channel, at `qos` if given, else the default publish QoS.
    ///
    /// Topic resolution happens before anything touches the network, so an
    /// unbound publish never produces traffic. With wait-for-ack enabled
    /// and a QoS above at-most-once, the call blocks until the matching
    /// broker acknowledgment or fails with `PublishTimeout`; otherwise it
    /// returns as soon as the message is handed to the transport.
    pub async fn publish(
        &self,
        payload: impl Into<Vec<u8>>,
        topic: Option<&str>,
        qos: Option<QosLevel>,
        retain: bool,
    ) -> Result<(), TelemetryError> {
        let topic = match topic {
            Some(explicit) => explicit.to_string(),
            None => self
                .topics
                .lock()
                .unwrap()
                .resolve(topics::PUBLISH)?
                .to_string(),
        };
        let qos = qos.unwrap_or(self.publish_qos);
        let sink = self.sink()?;

        if self.wait_for_ack && qos != QosLevel::AtMostOnce {
            let ack_rx = self.ack_tx.subscribe();
            sink.publish(&topic, qos, retain, payload.into()).await?;
            self.await_ack(ack_rx, qos).await
        } else {
            sink.publish(&topic, qos, retain, payload.into()).await
        }
    }

    /// Forward an operator action over the command channel at the default
    /// publish QoS.
    pub async fn publish_command(&self, action: &str) -> Result<(), TelemetryError> {
        let topic = self
            .topics
            .lock()
            .unwrap()
            .resolve(topics::COMMAND)?
            .to_string();
        self.publish(action.as_bytes().to_vec(), Some(&topic), None, false)
            .await
    }

    /// Route one link event. Called by the link driver for every event the
    /// underlying event loop yields.
    pub(crate) async fn handle_event(&self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("broker acknowledged session (present: {})", ack.session_present);
                    self.set_state(LinkState::Connected);
                    if let Err(e) = self.announce_and_subscribe().await {
                        error!("post-connect sequence failed: {e}");
                    }
                } else {
                    warn!("broker refused connection: {:?}", ack.code);
                    self.set_state(LinkState::Disconnected);
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = InboundMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                    qos: publish.qos.into(),
                    retain: publish.retain,
                };
                self.dispatch(&message);
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                let _ = self.ack_tx.send(AckEvent::Published(ack.pkid));
            }
            Event::Incoming(Packet::PubComp(comp)) => {
                let _ = self.ack_tx.send(AckEvent::Completed(comp.pkid));
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("broker closed the connection");
                self.set_state(LinkState::Disconnected);
            }
            _ => {}
        }
    }

    /// Invoke the registered handler, if any, with one inbound message.
    /// Handler failures are logged here and dispatch continues for
    /// subsequent messages.
    fn dispatch(&self, message: &InboundMessage) {
        let mut guard = self.handler.lock().unwrap();
        let Some(handler) = guard.as_mut() else {
            debug!(topic = %message.topic, "no handler registered, dropping message");
            return;
        };
        if let Err(e) = handler(message) {
            warn!(topic = %message.topic, "message handler failed: {e}");
        }
    }

    /// The sequence the broker's CONNACK triggers, identical on every
    /// (re)connection: announce on the publish channel, then subscribe.
    async fn announce_and_subscribe(&self) -> Result<(), TelemetryError> {
        let sink = self.sink()?;
        let (publish_topic, subscribe_topic) = {
            let table = self.topics.lock().unwrap();
            (
                table.resolve(topics::PUBLISH)?.to_string(),
                table.resolve(topics::SUBSCRIBE)?.to_string(),
            )
        };

        let announcement = self
            .on_connect_msg
            .clone()
            .unwrap_or_else(|| format!("{},connected", self.id));
        sink.publish(
            &publish_topic,
            QosLevel::AtMostOnce,
            false,
            announcement.into_bytes(),
        )
        .await?;
        sink.subscribe(&subscribe_topic, self.subscribe_qos).await?;
        info!("announced on '{publish_topic}', subscribed to '{subscribe_topic}'");
        Ok(())
    }

    /// Wait for the acknowledgment matching `qos`: PUBACK for
    /// at-least-once, PUBCOMP for exactly-once. The single publish channel
    /// this client owns has at most one ack-awaited publish in flight, so
    /// the first matching ack kind completes the wait.
    async fn await_ack(
        &self,
        mut ack_rx: broadcast::Receiver<AckEvent>,
        qos: QosLevel,
    ) -> Result<(), TelemetryError> {
        let wait = tokio::time::timeout(self.ack_timeout, async {
            loop {
                match ack_rx.recv().await {
                    Ok(AckEvent::Published(_)) if qos == QosLevel::AtLeastOnce => break true,
                    Ok(AckEvent::Completed(_)) if qos == QosLevel::ExactlyOnce => break true,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break false,
                }
            }
        })
        .await;

        match wait {
            Ok(true) => Ok(()),
            Ok(false) => Err(TelemetryError::Connection(
                "link closed while awaiting acknowledgment".to_string(),
            )),
            Err(_) => Err(TelemetryError::PublishTimeout(self.ack_timeout)),
        }
    }

    pub(crate) fn attach_sink(&self, sink: Arc<dyn MessageSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        self.state_tx.send_replace(state);
    }

    fn sink(&self) -> Result<Arc<dyn MessageSink>, TelemetryError> {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TelemetryError::Connection("client is not connected".to_string()))
    }

    fn mark_configured_if_ready(&self) {
        let ready = {
            let table = self.topics.lock().unwrap();
            table.is_bound(topics::PUBLISH) && table.is_bound(topics::SUBSCRIBE)
        };
        if ready && *self.state_tx.borrow() == LinkState::Unconfigured {
            self.set_state(LinkState::Configured);
        }
    }
}
