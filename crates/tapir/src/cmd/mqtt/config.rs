//! `mqtt tapir config` - publish the TAPIR-POP global configuration
//!
//! Reads the `globalconfig` section of a YAML file and publishes it as JSON
//! on the config topic, optionally retained. `--clear` publishes an empty
//! retained message instead, removing the retained config from the broker.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde_yaml::Value;
use tapir_config::TopicKind;
use tapir_mqtt::{MqttEngine, MqttPkgOut, PubSub};

use super::{flush_and_stop, interrupt, signing_key, srcname, status_printer};
use crate::context::Context;

/// Accepted spellings of the section holding the global config
const SECTION_KEYS: &[&str] = &["globalconfig", "GlobalConfig"];

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// YAML file with a globalconfig section
    #[arg(short = 'F', long = "cfgfile")]
    pub cfgfile: PathBuf,

    /// Publish as a retained message
    #[arg(short = 'R', long)]
    pub retain: bool,

    /// Clear the retained config instead of publishing one
    #[arg(short = 'C', long)]
    pub clear: bool,
}

/// The global config section of a YAML document
pub fn extract_global_config(yaml: &str) -> Result<Value> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    for key in SECTION_KEYS {
        if let Some(section) = doc.get(*key) {
            return Ok(section.clone());
        }
    }
    bail!("no globalconfig section found")
}

fn load(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("error reading configuration file {}", path.display()))?;
    extract_global_config(&data)
        .with_context(|| format!("error unmarshalling YAML data from file {}", path.display()))
}

/// Package to publish on `topic`
pub fn config_package(topic: &str, global: &Value, retain: bool, clear: bool) -> Result<MqttPkgOut> {
    if clear {
        return Ok(MqttPkgOut::clear(topic));
    }
    Ok(MqttPkgOut::raw(topic, global)?.with_retain(retain))
}

pub async fn run(ctx: &Context, client_id: &str, args: ConfigArgs) -> Result<()> {
    let tapir = &ctx.config()?.tapir;

    let global = load(&args.cfgfile)?;
    println!("Global configuration loaded from {}", args.cfgfile.display());
    let pretty = serde_yaml::to_string(&global).context("error marshalling YAML data")?;
    println!("Global configuration:\n{pretty}");

    let topic = tapir.require_topic(TopicKind::Config)?;
    println!("Using DNS TAPIR config MQTT topic: {topic}");
    let key = signing_key(tapir, TopicKind::Config)?;
    srcname(tapir, TopicKind::Config)?;

    let (status_tx, _status_task) = status_printer();
    let mut engine = MqttEngine::new("config", client_id, &tapir.mqtt, PubSub::PUB, status_tx)?;
    engine.pub_to_topic(topic, Some(key), true)?;
    let handle = engine.start()?;
    interrupt::spawn(handle.commander.clone());

    handle
        .publish(config_package(topic, &global, args.retain, args.clear)?)
        .await
        .context("MQTT engine is gone")?;

    flush_and_stop(&handle, "config").await
}
