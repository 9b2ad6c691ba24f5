//! MQTT commands - talk to the DNS TAPIR message bus directly
//!
//! # Usage
//!
//! ```bash
//! # Publish stdin lines to the observations topic and print what arrives
//! tapir-cli mqtt engine --pub --sub -t observations
//!
//! # Publish the global config, retained
//! tapir-cli mqtt tapir config -F global.yaml -R
//!
//! # Interactive composers
//! tapir-cli mqtt tapir observations
//! tapir-cli mqtt tapir status -F pop-lab-1
//!
//! # Greylist counters on every bootstrap server
//! tapir-cli mqtt tapir bootstrap status -G dns-tapir
//! ```

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod interrupt;
pub mod observations;
pub mod printer;
pub mod status;

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use p256::ecdsa::SigningKey;
use tapir_config::{TapirConfig, TopicKind};
use tapir_mqtt::{EngineHandle, keys};
use tapir_protocol::ComponentStatusUpdate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::context::Context;

/// Time given to the event loop to flush the last publish
pub const FLUSH_DELAY: Duration = Duration::from_millis(1000);

const STATUS_BUFFER: usize = 10;

/// MQTT command arguments
#[derive(Args, Debug)]
pub struct MqttArgs {
    /// MQTT client id
    #[arg(long, global = true, default_value_t = default_client_id())]
    pub clientid: String,

    #[command(subcommand)]
    pub command: MqttCommand,
}

#[derive(Subcommand, Debug)]
pub enum MqttCommand {
    /// Run an engine publishing stdin lines and/or printing received messages
    Engine(engine::EngineArgs),

    /// DNS TAPIR message tools
    Tapir(TapirArgs),
}

#[derive(Args, Debug)]
pub struct TapirArgs {
    #[command(subcommand)]
    pub command: TapirCommand,
}

#[derive(Subcommand, Debug)]
pub enum TapirCommand {
    /// Send the TAPIR-POP global config to the config topic
    Config(config::ConfigArgs),

    /// Interactively compose and send observations
    Observations,

    /// Interactively compose and send status reports
    Status(status::StatusArgs),

    /// MQTT bootstrap server commands
    Bootstrap(bootstrap::BootstrapArgs),
}

pub async fn run(ctx: &Context, args: MqttArgs) -> Result<()> {
    match args.command {
        MqttCommand::Engine(engine_args) => engine::run(ctx, &args.clientid, engine_args).await,
        MqttCommand::Tapir(tapir) => match tapir.command {
            TapirCommand::Config(config_args) => {
                config::run(ctx, &args.clientid, config_args).await
            }
            TapirCommand::Observations => observations::run(ctx, &args.clientid).await,
            TapirCommand::Status(status_args) => {
                status::run(ctx, &args.clientid, status_args).await
            }
            TapirCommand::Bootstrap(bootstrap_args) => bootstrap::run(ctx, bootstrap_args).await,
        },
    }
}

/// `tapir-cli-<uuid>`
pub fn default_client_id() -> String {
    format!("tapir-cli-{}", Uuid::new_v4())
}

/// Status channel for an engine, with a task printing every update
pub fn status_printer() -> (mpsc::Sender<ComponentStatusUpdate>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ComponentStatusUpdate>(STATUS_BUFFER);
    let task = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            println!("Status update: {update}");
        }
    });
    (tx, task)
}

/// Signing key configured for `kind`; required
pub fn signing_key(tapir: &TapirConfig, kind: TopicKind) -> Result<SigningKey> {
    let field = kind.key("signingkey");
    let path = tapir
        .topic(kind)
        .signingkey
        .as_deref()
        .with_context(|| format!("missing config key: {field}"))?;
    keys::fetch_signing_key(path)
        .with_context(|| format!("error fetching MQTT signing key {field}"))
}

/// Source name configured for `kind`; required
pub fn srcname(tapir: &TapirConfig, kind: TopicKind) -> Result<&str> {
    let srcname = tapir.topic(kind).srcname.as_str();
    if srcname.is_empty() {
        anyhow::bail!("missing config key: {}", kind.key("srcname"));
    }
    Ok(srcname)
}

/// Give the engine time to flush, then stop it and report
pub async fn flush_and_stop(handle: &EngineHandle, what: &str) -> Result<()> {
    println!("[Waiting {} ms to ensure message has been sent]", FLUSH_DELAY.as_millis());
    tokio::time::sleep(FLUSH_DELAY).await;

    let resp = handle.stop().await.context("MQTT engine did not answer")?;
    println!("Response from MQTT Engine: {resp}");
    println!("Hopefully the {what} message has been sent.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tapir_config::Config;

    #[test]
    fn test_default_client_id() {
        let a = default_client_id();
        let b = default_client_id();
        assert!(a.starts_with("tapir-cli-"));
        assert_eq!(a.len(), "tapir-cli-".len() + 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_srcname_required() {
        let config = Config::from_str("tapir:\n  observations:\n    srcname: lab-edge\n").unwrap();
        assert_eq!(srcname(&config.tapir, TopicKind::Observations).unwrap(), "lab-edge");

        let err = srcname(&config.tapir, TopicKind::Config).unwrap_err();
        assert_eq!(err.to_string(), "missing config key: tapir.config.srcname");
    }

    #[test]
    fn test_signing_key_required() {
        let config = Config::default();
        let err = signing_key(&config.tapir, TopicKind::Status).unwrap_err();
        assert_eq!(err.to_string(), "missing config key: tapir.status.signingkey");
    }

    #[test]
    fn test_signing_key_unreadable() {
        let config =
            Config::from_str("tapir:\n  config:\n    signingkey: /nonexistent/key.pem\n").unwrap();
        let err = signing_key(&config.tapir, TopicKind::Config).unwrap_err();
        assert!(err.to_string().contains("tapir.config.signingkey"));
    }
}
