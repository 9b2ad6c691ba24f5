//! MQTT engine - owns the broker connection in a dedicated task.
//!
//! Callers register the topics they publish to and subscribe on, then
//! `start()` the engine. The returned handle carries two channels:
//! - `outbox`: packages to publish (JSON encoded, JWS signed when the topic is)
//! - `commander`: control commands (`Stop`)
//!
//! Incoming messages on subscribed topics are validated and delivered to the
//! inbox registered for the topic. Connection state changes are reported on
//! the status channel and never block the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use p256::ecdsa::{SigningKey, VerifyingKey};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, Publish, QoS};
use serde::Serialize;
use tapir_config::MqttConfig;
use tapir_protocol::{ComponentStatus, ComponentStatusUpdate, TapirMsg};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{MqttError, Result};
use crate::jws::{self, JwsHeader};
use crate::options;
use crate::topic;

/// Capacity of the outbox and command channels
const CHANNEL_BUFFER: usize = 16;

/// Capacity of rumqttc's request channel
const REQUEST_BUFFER: usize = 64;

/// Pause between reconnect attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How long a stopping engine keeps flushing before giving up
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// What an engine may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PubSub {
    pub publish: bool,
    pub subscribe: bool,
}

impl PubSub {
    /// Publish only
    pub const PUB: Self = Self {
        publish: true,
        subscribe: false,
    };
    /// Subscribe only
    pub const SUB: Self = Self {
        publish: false,
        subscribe: true,
    };
    /// Publish and subscribe
    pub const BOTH: Self = Self {
        publish: true,
        subscribe: true,
    };
}

/// Body of an outgoing package
#[derive(Debug, Clone, PartialEq)]
pub enum OutPayload {
    /// JSON document
    Json(serde_json::Value),
    /// Empty payload (clears a retained message)
    Clear,
}

/// A package to publish
#[derive(Debug, Clone, PartialEq)]
pub struct MqttPkgOut {
    /// Target topic; `None` publishes to every registered pub topic
    pub topic: Option<String>,
    pub retain: bool,
    pub payload: OutPayload,
}

impl MqttPkgOut {
    /// Observation message for all pub topics
    pub fn data(msg: &TapirMsg) -> Result<Self> {
        Ok(Self {
            topic: None,
            retain: false,
            payload: OutPayload::Json(serde_json::to_value(msg)?),
        })
    }

    /// Any serializable value for one topic
    pub fn raw<T: Serialize + ?Sized>(topic: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self {
            topic: Some(topic.into()),
            retain: false,
            payload: OutPayload::Json(serde_json::to_value(value)?),
        })
    }

    /// Retained empty message, removing whatever is retained on `topic`
    pub fn clear(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            retain: true,
            payload: OutPayload::Clear,
        }
    }

    /// Set the retain flag
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }
}

/// A message received on a subscribed topic
#[derive(Debug, Clone, PartialEq)]
pub struct MqttPkgIn {
    pub topic: String,
    /// Payload with any JWS envelope removed
    pub payload: Vec<u8>,
    /// True when the signature was checked against the topic's validator key
    pub validated: bool,
}

/// Commands sent to the engine task
#[derive(Debug)]
pub enum EngineCommand {
    /// Disconnect and exit, answering on the channel
    Stop(oneshot::Sender<EngineResponse>),
}

/// Answer to an [`EngineCommand`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineResponse {
    pub status: String,
    pub msg: String,
    pub error: bool,
    pub error_msg: String,
}

impl fmt::Display for EngineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error {
            write!(f, "error: {}", self.error_msg)
        } else {
            write!(f, "{} ({})", self.status, self.msg)
        }
    }
}

/// Handle to a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    pub commander: mpsc::Sender<EngineCommand>,
    pub outbox: mpsc::Sender<MqttPkgOut>,
}

impl EngineHandle {
    /// Queue a package for publishing
    pub async fn publish(&self, pkg: MqttPkgOut) -> Result<()> {
        self.outbox.send(pkg).await.map_err(|_| MqttError::EngineGone)
    }

    /// Stop the engine and wait for its answer
    pub async fn stop(&self) -> Result<EngineResponse> {
        stop_engine(&self.commander).await
    }
}

/// Send `Stop` on `commander` and wait for the answer
pub async fn stop_engine(commander: &mpsc::Sender<EngineCommand>) -> Result<EngineResponse> {
    let (tx, rx) = oneshot::channel();
    commander
        .send(EngineCommand::Stop(tx))
        .await
        .map_err(|_| MqttError::EngineGone)?;
    rx.await.map_err(|_| MqttError::EngineGone)
}

struct PubTopic {
    signer: Option<SigningKey>,
}

/// Wire bytes of `payload` on the registered pub topic `topic`
fn encode(
    pub_topics: &BTreeMap<String, PubTopic>,
    topic: &str,
    payload: &OutPayload,
) -> Result<Vec<u8>> {
    let pub_topic = pub_topics
        .get(topic)
        .ok_or_else(|| MqttError::Jws(format!("{topic} is not a registered pub topic")))?;

    let json = match payload {
        OutPayload::Clear => return Ok(Vec::new()),
        OutPayload::Json(value) => serde_json::to_vec(value)?,
    };

    match &pub_topic.signer {
        Some(key) => Ok(jws::sign(&json, key, &JwsHeader::default())?.into_bytes()),
        None => Ok(json),
    }
}

#[derive(Clone)]
struct SubTopic {
    validator: Option<VerifyingKey>,
    inbox: mpsc::Sender<MqttPkgIn>,
}

/// An engine being set up; becomes a task on [`MqttEngine::start`]
pub struct MqttEngine {
    name: String,
    options: MqttOptions,
    qos: QoS,
    pubsub: PubSub,
    pub_topics: BTreeMap<String, PubTopic>,
    sub_topics: BTreeMap<String, SubTopic>,
    status_tx: mpsc::Sender<ComponentStatusUpdate>,
}

impl MqttEngine {
    /// Prepare an engine connecting as `client_id` to the configured broker
    pub fn new(
        name: impl Into<String>,
        client_id: &str,
        config: &MqttConfig,
        pubsub: PubSub,
        status_tx: mpsc::Sender<ComponentStatusUpdate>,
    ) -> Result<Self> {
        let name = name.into();
        let options = options::mqtt_options(client_id, config)?;
        debug!(
            engine = %name,
            client_id,
            server = %config.server,
            "mqtt engine created"
        );

        Ok(Self {
            name,
            options,
            qos: options::qos(config.qos),
            pubsub,
            pub_topics: BTreeMap::new(),
            sub_topics: BTreeMap::new(),
            status_tx,
        })
    }

    /// Register a topic to publish to
    ///
    /// With `sign` set every payload is wrapped in a JWS made with `key`.
    pub fn pub_to_topic(
        &mut self,
        topic: impl Into<String>,
        key: Option<SigningKey>,
        sign: bool,
    ) -> Result<()> {
        let topic = topic.into();
        if !self.pubsub.publish {
            return Err(MqttError::NoPubCapability {
                engine: self.name.clone(),
                topic,
            });
        }
        if sign && key.is_none() {
            return Err(MqttError::MissingSigningKey(topic));
        }

        debug!(engine = %self.name, topic = %topic, sign, "pub topic added");
        self.pub_topics.insert(
            topic,
            PubTopic {
                signer: if sign { key } else { None },
            },
        );
        Ok(())
    }

    /// Register a topic filter to subscribe on, delivering to `inbox`
    ///
    /// With `validate` set only messages whose JWS verifies with `key` are
    /// delivered.
    pub fn sub_to_topic(
        &mut self,
        topic: impl Into<String>,
        key: Option<VerifyingKey>,
        inbox: mpsc::Sender<MqttPkgIn>,
        validate: bool,
    ) -> Result<()> {
        let topic = topic.into();
        if !self.pubsub.subscribe {
            return Err(MqttError::NoSubCapability {
                engine: self.name.clone(),
                topic,
            });
        }
        if validate && key.is_none() {
            return Err(MqttError::MissingValidatorKey(topic));
        }

        debug!(engine = %self.name, topic = %topic, validate, "sub topic added");
        self.sub_topics.insert(
            topic,
            SubTopic {
                validator: if validate { key } else { None },
                inbox,
            },
        );
        Ok(())
    }

    /// Bytes a package with `payload` would be published as on `topic`
    pub fn encode(&self, topic: &str, payload: &OutPayload) -> Result<Vec<u8>> {
        encode(&self.pub_topics, topic, payload)
    }

    /// Spawn the engine task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<EngineHandle> {
        let (task, handle) = self.into_task();
        tokio::spawn(task.run());
        Ok(handle)
    }

    fn into_task(self) -> (EngineTask, EngineHandle) {
        let (client, eventloop) = AsyncClient::new(self.options, REQUEST_BUFFER);
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_BUFFER);

        let task = EngineTask {
            name: self.name,
            client,
            eventloop,
            qos: self.qos,
            pub_topics: self.pub_topics,
            sub_topics: self.sub_topics,
            status_tx: self.status_tx,
            commands: cmd_rx,
            outbox: out_rx,
            published: 0,
            received: 0,
            dropped: 0,
        };
        let handle = EngineHandle {
            commander: cmd_tx,
            outbox: out_tx,
        };
        (task, handle)
    }
}

struct EngineTask {
    name: String,
    client: AsyncClient,
    eventloop: EventLoop,
    qos: QoS,
    pub_topics: BTreeMap<String, PubTopic>,
    sub_topics: BTreeMap<String, SubTopic>,
    status_tx: mpsc::Sender<ComponentStatusUpdate>,
    commands: mpsc::Receiver<EngineCommand>,
    outbox: mpsc::Receiver<MqttPkgOut>,
    published: u64,
    received: u64,
    dropped: u64,
}

impl EngineTask {
    async fn run(mut self) {
        info!(engine = %self.name, "mqtt engine started");

        let mut outbox_open = true;
        let mut retry_at: Option<Instant> = None;

        loop {
            let waiting = retry_at.is_some();
            let deadline = retry_at.unwrap_or_else(Instant::now);

            tokio::select! {
                cmd = self.commands.recv() => {
                    self.shutdown().await;
                    match cmd {
                        Some(EngineCommand::Stop(resp)) => {
                            let _ = resp.send(self.stopped());
                        }
                        None => debug!(engine = %self.name, "command channel closed"),
                    }
                    break;
                }
                pkg = self.outbox.recv(), if outbox_open => match pkg {
                    Some(pkg) => self.publish(pkg),
                    None => outbox_open = false,
                },
                _ = tokio::time::sleep_until(deadline), if waiting => {
                    retry_at = None;
                }
                event = self.eventloop.poll(), if !waiting => match event {
                    Ok(event) => self.handle_event(event),
                    Err(e) => {
                        warn!(engine = %self.name, error = %e, "mqtt connection error");
                        self.report(ComponentStatus::Fail, format!("connection error: {e}"));
                        retry_at = Some(Instant::now() + RECONNECT_DELAY);
                    }
                },
            }
        }

        info!(
            engine = %self.name,
            published = self.published,
            received = self.received,
            dropped = self.dropped,
            "mqtt engine stopped"
        );
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                info!(engine = %self.name, "connected to broker");
                for filter in self.sub_topics.keys() {
                    if let Err(e) = self.client.try_subscribe(filter.as_str(), self.qos) {
                        warn!(engine = %self.name, topic = %filter, error = %e, "subscribe failed");
                    }
                }
                self.report(ComponentStatus::Ok, "connected to broker".to_string());
            }
            Event::Incoming(Packet::Publish(publish)) => self.deliver(publish),
            other => trace!(engine = %self.name, event = ?other, "mqtt event"),
        }
    }

    fn publish(&mut self, pkg: MqttPkgOut) {
        let topics: Vec<String> = match &pkg.topic {
            Some(topic) => vec![topic.clone()],
            None => self.pub_topics.keys().cloned().collect(),
        };

        for topic in topics {
            let payload = match encode(&self.pub_topics, &topic, &pkg.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(engine = %self.name, topic = %topic, error = %e, "dropping outgoing message");
                    self.report(ComponentStatus::Fail, e.to_string());
                    continue;
                }
            };

            let size = payload.len();
            match self.client.try_publish(topic.as_str(), self.qos, pkg.retain, payload) {
                Ok(()) => {
                    self.published += 1;
                    debug!(engine = %self.name, topic = %topic, size, retain = pkg.retain, "published");
                }
                Err(e) => {
                    warn!(engine = %self.name, topic = %topic, error = %e, "publish failed");
                    self.report(ComponentStatus::Fail, format!("publish to {topic} failed: {e}"));
                }
            }
        }
    }

    /// Hand a received message to its inbox
    ///
    /// A full inbox drops the message; the engine never waits on a consumer.
    fn deliver(&mut self, publish: Publish) {
        let Some(sub) = self
            .sub_topics
            .iter()
            .find(|(filter, _)| topic::matches(filter, &publish.topic))
            .map(|(_, sub)| sub.clone())
        else {
            debug!(engine = %self.name, topic = %publish.topic, "message on unknown topic");
            return;
        };

        if publish.payload.is_empty() {
            debug!(engine = %self.name, topic = %publish.topic, "empty (cleared) message ignored");
            return;
        }

        let (payload, validated) = match &sub.validator {
            Some(key) => {
                let token = String::from_utf8_lossy(&publish.payload);
                match jws::verify(&token, key) {
                    Ok(payload) => (payload, true),
                    Err(e) => {
                        warn!(engine = %self.name, topic = %publish.topic, error = %e, "invalid message dropped");
                        return;
                    }
                }
            }
            None => (
                jws::peek_payload(&publish.payload).unwrap_or_else(|| publish.payload.to_vec()),
                false,
            ),
        };

        self.received += 1;
        let pkg = MqttPkgIn {
            topic: publish.topic,
            payload,
            validated,
        };
        match sub.inbox.try_send(pkg) {
            Ok(()) => {}
            Err(TrySendError::Full(pkg)) => {
                self.dropped += 1;
                warn!(engine = %self.name, topic = %pkg.topic, dropped = self.dropped, "inbox full, message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(engine = %self.name, "inbox closed, message dropped");
            }
        }
    }

    /// Publish what is still queued, then disconnect
    async fn shutdown(&mut self) {
        while let Ok(pkg) = self.outbox.try_recv() {
            self.publish(pkg);
        }
        if let Err(e) = self.client.try_disconnect() {
            debug!(engine = %self.name, error = %e, "disconnect request failed");
        }

        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            debug!(engine = %self.name, "disconnect timed out");
        }
    }

    fn stopped(&self) -> EngineResponse {
        EngineResponse {
            status: "stopped".to_string(),
            msg: format!(
                "engine {} stopped after {} published and {} received messages ({} dropped)",
                self.name, self.published, self.received, self.dropped
            ),
            ..Default::default()
        }
    }

    fn report(&self, status: ComponentStatus, msg: String) {
        // A full status channel must never stall the engine
        let _ = self
            .status_tx
            .try_send(ComponentStatusUpdate::now(self.name.clone(), status, msg));
    }
}
