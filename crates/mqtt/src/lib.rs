//! TAPIR MQTT - the DNS TAPIR message bus client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  outbox   ┌──────────────┐  signed JWS  ┌──────────┐
//! │   Command    │──────────▶│  EngineTask  │─────────────▶│  Broker  │
//! │ (composer,   │ commander │  (rumqttc    │              │          │
//! │  publisher)  │──────────▶│   event loop)│◀─────────────│          │
//! └──────────────┘           └──────────────┘   publish    └──────────┘
//!        ▲                      │        │
//!        │ inbox (validated)    │        │ status (ok/fail)
//!        └──────────────────────┘        ▼
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tapir_config::MqttConfig;
//! use tapir_mqtt::{MqttEngine, MqttPkgOut, PubSub, keys};
//! use tapir_protocol::TapirMsg;
//! use tokio::sync::mpsc;
//!
//! # async fn example(config: MqttConfig) -> tapir_mqtt::Result<()> {
//! let (status_tx, _status_rx) = mpsc::channel(10);
//! let mut engine = MqttEngine::new("observations", "tapir-cli-1", &config, PubSub::PUB, status_tx)?;
//!
//! let key = keys::fetch_signing_key("/etc/dnstapir/certs/mqttsigner-key.pem".as_ref())?;
//! engine.pub_to_topic("events/up/edge-1/observations", Some(key), true)?;
//!
//! let handle = engine.start()?;
//! handle.publish(MqttPkgOut::data(&TapirMsg::observation("tapir-cli"))?).await?;
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod identity;
pub mod jws;
pub mod keys;
pub mod options;
pub mod topic;

pub use engine::{
    EngineCommand, EngineHandle, EngineResponse, MqttEngine, MqttPkgIn, MqttPkgOut, OutPayload,
    PubSub, stop_engine,
};
pub use error::{MqttError, Result};
pub use identity::ClientIdentity;
pub use jws::JwsHeader;
