//! Key upload command - send a public key to TAPIR Core over MQTT
//!
//! The key is wrapped in a JWS signed with the CLI's client certificate key.
//! The JWS header carries the certificate chain (`x5c`) and the SHA-256 of
//! the leaf certificate (`kid`), so Core can tie the key to the edge.
//!
//! # Usage
//!
//! ```bash
//! tapir-cli keyupload -P /etc/dnstapir/certs/edge-signer.pub
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tapir_config::TopicKind;
use tapir_mqtt::{ClientIdentity, MqttEngine, MqttPkgOut, PubSub, jws, topic};
use tapir_protocol::PubKeyUpload;

use super::mqtt::{default_client_id, flush_and_stop, interrupt, status_printer};
use crate::context::Context;

/// Key upload arguments
#[derive(Args, Debug)]
pub struct KeyUploadArgs {
    /// File containing the PEM public key to upload
    #[arg(short = 'P', long = "pubkey")]
    pub pubkey: PathBuf,

    /// MQTT client id
    #[arg(long, default_value_t = default_client_id())]
    pub clientid: String,
}

/// Sign `pubkey` with `identity`
pub fn build_upload(identity: &ClientIdentity, pubkey: &str) -> Result<PubKeyUpload> {
    let jws_message = jws::sign(pubkey.as_bytes(), &identity.signing_key, &identity.jws_header())
        .context("error signing public key")?;
    Ok(PubKeyUpload {
        jws_message,
        client_cert_pem: identity.chain_pem.clone(),
    })
}

pub async fn run(ctx: &Context, args: KeyUploadArgs) -> Result<()> {
    let config = ctx.config()?;

    let pubkey = fs::read_to_string(&args.pubkey)
        .with_context(|| format!("error reading public key file {}", args.pubkey.display()))?;
    if ctx.debug {
        println!("Public key loaded from {}", args.pubkey.display());
        println!("Public key:\n{pubkey}");
    }

    let cert = config.certs.own_cert()?;
    let identity = ClientIdentity::load(&cert.cert, &cert.key)
        .with_context(|| format!("error loading client certificate {}", cert.cert.display()))?;
    if ctx.debug {
        println!("Client certificate chain:\n{}", identity.chain_pem);
    }

    let upload = build_upload(&identity, &pubkey)?;
    println!("JWS Key ID: {}", identity.key_id);
    println!("JWS Message: {}", upload.jws_message);

    let template = config.tapir.require_topic(TopicKind::KeyUpload)?;
    let mqtt_topic = topic::expand(template, &identity.common_name);
    println!("Using DNS TAPIR keyupload MQTT topic: {mqtt_topic}");

    let (status_tx, _status_task) = status_printer();
    let mut engine =
        MqttEngine::new("keyupload", &args.clientid, &config.tapir.mqtt, PubSub::PUB, status_tx)?;
    engine.pub_to_topic(&mqtt_topic, None, false)?;
    let handle = engine.start()?;
    interrupt::spawn(handle.commander.clone());

    handle
        .publish(MqttPkgOut::raw(mqtt_topic.as_str(), &upload)?)
        .await
        .context("MQTT engine is gone")?;

    flush_and_stop(&handle, "public key upload").await
}
