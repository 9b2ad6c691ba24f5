//! `mqtt engine` - publish stdin lines and print received messages on one topic
//!
//! Each non-empty line read from stdin is sent as a `TapirMsg` carrying the
//! line as its message. The line `QUIT` ends the session.

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use clap::Args;
use p256::ecdsa::{SigningKey, VerifyingKey};
use tapir_config::{Config, TopicKind};
use tapir_mqtt::{MqttEngine, MqttPkgOut, PubSub, keys};
use tapir_protocol::TapirMsg;
use tokio::sync::mpsc;
use tracing::debug;

use super::printer::SubPrinter;
use super::{interrupt, srcname, status_printer};
use crate::context::Context;

const INBOX_BUFFER: usize = 10;

/// Engine command arguments
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Topic to use: config, observations, status or keyupload
    #[arg(short, long)]
    pub topic: TopicKind,

    /// Enable publishing
    #[arg(long = "pub")]
    pub publish: bool,

    /// Enable subscribing
    #[arg(long = "sub")]
    pub subscribe: bool,
}

/// Keys available for one topic
///
/// A key that fails to load disables that direction rather than the command.
#[derive(Debug, Default)]
pub struct TopicKeys {
    pub signing: Option<SigningKey>,
    pub validator: Option<VerifyingKey>,
    pub can_pub: bool,
    pub can_sub: bool,
}

impl TopicKeys {
    /// Load the keys configured for `kind`
    ///
    /// Key uploads are neither signed nor validated.
    pub fn load(config: &Config, kind: TopicKind) -> Self {
        if kind == TopicKind::KeyUpload {
            return Self {
                can_pub: true,
                can_sub: true,
                ..Default::default()
            };
        }

        let topic = config.tapir.topic(kind);
        let signing = match topic.signingkey.as_deref().map(keys::fetch_signing_key) {
            Some(Ok(key)) => Some(key),
            Some(Err(e)) => {
                println!("Error fetching MQTT signing key: {e}");
                None
            }
            None => {
                println!("Error fetching MQTT signing key: {} not set", kind.key("signingkey"));
                None
            }
        };
        let validator = match topic.validatorkey.as_deref().map(keys::fetch_validator_key) {
            Some(Ok(key)) => Some(key),
            Some(Err(e)) => {
                println!("Error fetching MQTT validator key: {e}");
                None
            }
            None => {
                println!("Error fetching MQTT validator key: {} not set", kind.key("validatorkey"));
                None
            }
        };

        Self {
            can_pub: signing.is_some(),
            can_sub: validator.is_some(),
            signing,
            validator,
        }
    }

    fn sign(&self) -> bool {
        self.signing.is_some()
    }

    fn validate(&self) -> bool {
        self.validator.is_some()
    }
}

/// How reading stdin ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinesEnd {
    Quit,
    Eof,
}

/// Publish every non-empty line of `input` as an observation message from `srcname`
pub fn pump_lines<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    srcname: &str,
    outbox: &mpsc::Sender<MqttPkgOut>,
) -> Result<LinesEnd> {
    for line in input.lines() {
        let line = line?;
        let msg = line.trim();
        if msg.is_empty() {
            writeln!(output, "Empty message ignored.")?;
            continue;
        }
        if msg.eq_ignore_ascii_case("QUIT") {
            return Ok(LinesEnd::Quit);
        }

        let tapir_msg = TapirMsg {
            msg: msg.to_string(),
            src_name: srcname.to_string(),
            time_stamp: Utc::now(),
            ..Default::default()
        };
        outbox
            .blocking_send(MqttPkgOut::data(&tapir_msg)?)
            .context("MQTT engine is gone")?;
        debug!(len = msg.len(), "line queued");
    }
    Ok(LinesEnd::Eof)
}

pub async fn run(ctx: &Context, client_id: &str, args: EngineArgs) -> Result<()> {
    if !args.publish && !args.subscribe {
        bail!("nothing to do: enable at least one of --pub and --sub");
    }

    let config = ctx.config()?;
    let topic = config.tapir.require_topic(args.topic)?.to_string();
    let topic_keys = TopicKeys::load(config, args.topic);

    let (status_tx, _status_task) = status_printer();
    let pubsub = PubSub {
        publish: args.publish,
        subscribe: args.subscribe,
    };
    let mut engine = MqttEngine::new("engine", client_id, &config.tapir.mqtt, pubsub, status_tx)?;

    let publishing = args.publish && topic_keys.can_pub;
    if publishing {
        println!("Adding pub topic: {topic}");
        let sign = topic_keys.sign();
        engine.pub_to_topic(&topic, topic_keys.signing.clone(), sign)?;
    }

    let mut printer_task = None;
    if args.subscribe && topic_keys.can_sub {
        println!("Adding sub topic: {topic}");
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_BUFFER);
        let validate = topic_keys.validate();
        engine.sub_to_topic(&topic, topic_keys.validator, inbox_tx, validate)?;
        printer_task = Some(SubPrinter::new()?.spawn(inbox_rx));
    }

    if !publishing && printer_task.is_none() {
        bail!("no usable keys for topic {topic}");
    }

    let handle = engine.start()?;
    interrupt::spawn(handle.commander.clone());

    if publishing {
        let srcname = srcname(&config.tapir, TopicKind::Observations)?.to_string();
        let outbox = handle.outbox.clone();
        let end = tokio::task::spawn_blocking(move || {
            pump_lines(io::stdin().lock(), io::stdout(), &srcname, &outbox)
        })
        .await
        .context("stdin reader panicked")??;
        debug!(?end, "stdin done");

        let resp = handle.stop().await.context("MQTT engine did not answer")?;
        println!("Response from MQTT Engine: {resp}");
    }

    if let Some(task) = printer_task {
        task.await.context("subscription printer panicked")?;
    }
    Ok(())
}
