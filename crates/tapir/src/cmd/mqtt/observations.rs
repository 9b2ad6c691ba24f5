//! `mqtt tapir observations` - compose observation messages at the terminal
//!
//! Names are collected into one pending `TapirMsg` with `add` and `del`,
//! inspected with `show` and published with `send`, which also starts a new
//! message.

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use p256::ecdsa::SigningKey;
use tapir_config::TopicKind;
use tapir_mqtt::{MqttEngine, MqttPkgOut, PubSub};
use tapir_protocol::{DEFINED_TAGS, Domain, TagMask, TapirMsg, fqdn};

use super::{interrupt, signing_key, srcname, status_printer};
use crate::cmd::debug::tag_table;
use crate::context::Context;
use crate::format::format_list;
use crate::table::Table;
use crate::tty::Prompter;

/// Operations offered at the prompt
pub const OPERATIONS: &[&str] = &["add", "del", "show", "send", "set-ttl", "list-tags", "quit"];

/// TTL given to names until `set-ttl` changes it
pub const DEFAULT_TTL: u32 = 60;

const ADD_MSG: &str = "it is greater to give than to take";
const DEL_MSG: &str = "happiness is a negative diff";

/// Whether the prompt loop goes on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Pending observation plus the answers reused as prompt defaults
#[derive(Debug)]
pub struct ObservationComposer {
    srcname: String,
    ttl: u32,
    names: String,
    tags: String,
    msg: TapirMsg,
    verbose: bool,
    headers: bool,
}

impl ObservationComposer {
    pub fn new(srcname: impl Into<String>) -> Self {
        let srcname = srcname.into();
        Self {
            msg: TapirMsg::observation(srcname.as_str()),
            srcname,
            ttl: DEFAULT_TTL,
            names: String::new(),
            tags: String::new(),
            verbose: false,
            headers: true,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    /// The message `send` would publish
    pub fn pending(&self) -> &TapirMsg {
        &self.msg
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Stage `names` as added with `mask`
    pub fn add<S: AsRef<str>>(&mut self, names: &[S], mask: TagMask, now: DateTime<Utc>) {
        let domains = self.domains(names, mask, now);
        self.msg.added.extend(domains);
        self.msg.msg = ADD_MSG.to_string();
    }

    /// Stage `names` as removed
    pub fn remove<S: AsRef<str>>(&mut self, names: &[S], now: DateTime<Utc>) {
        let domains = self.domains(names, TagMask::NONE, now);
        self.msg.removed.extend(domains);
        self.msg.msg = DEL_MSG.to_string();
    }

    fn domains<S: AsRef<str>>(&self, names: &[S], mask: TagMask, now: DateTime<Utc>) -> Vec<Domain> {
        names
            .iter()
            .map(|name| Domain {
                name: fqdn(name.as_ref()),
                time_added: now,
                ttl: self.ttl,
                tag_mask: mask,
            })
            .collect()
    }

    /// Hand out the pending message and start a new one
    pub fn take(&mut self) -> TapirMsg {
        std::mem::replace(&mut self.msg, TapirMsg::observation(self.srcname.as_str()))
    }

    /// `Domain|Tags` table of the pending message
    pub fn show(&self) -> Table {
        let mut table = Table::new(["Domain", "Tags"]).with_header(self.headers);
        for d in &self.msg.added {
            table.row([format!("ADD: {}", d.name), d.tag_mask.to_string()]);
        }
        for d in &self.msg.removed {
            table.row([format!("DEL: {}", d.name)]);
        }
        table
    }

    /// Run one operation read from `prompter`
    pub fn step<R, W, F>(&mut self, prompter: &mut Prompter<R, W>, send: &mut F) -> Result<Flow>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&TapirMsg) -> Result<()>,
    {
        let op = prompter.radio_button("Operation", "add", OPERATIONS)?;
        match op.as_str() {
            "quit" => {
                writeln!(prompter.out(), "QUIT cmd received.")?;
                return Ok(Flow::Quit);
            }
            "set-ttl" => {
                let ttl = prompter.int_question("TTL (in seconds)", i64::from(DEFAULT_TTL))?;
                match u32::try_from(ttl) {
                    Ok(ttl) => self.ttl = ttl,
                    Err(_) => writeln!(
                        prompter.out(),
                        "Error: TTL must be between 0 and {}",
                        u32::MAX
                    )?,
                }
            }
            "add" | "del" => {
                self.names = prompter.question("Domain names", &self.names)?;
                let names: Vec<String> = self.names.split_whitespace().map(String::from).collect();
                if names.first().is_some_and(|n| n.eq_ignore_ascii_case("QUIT")) {
                    return Ok(Flow::Quit);
                }

                if op == "add" {
                    let mask = self.ask_tags(prompter)?;
                    self.add(&names, mask, Utc::now());
                } else {
                    self.remove(&names, Utc::now());
                }
            }
            "show" => writeln!(prompter.out(), "{}", self.show())?,
            "list-tags" => writeln!(prompter.out(), "{}", tag_table(self.headers))?,
            "send" => {
                let msg = self.take();
                send(&msg)?;
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn ask_tags<R: BufRead, W: Write>(&mut self, prompter: &mut Prompter<R, W>) -> io::Result<TagMask> {
        loop {
            self.tags = prompter.question("Tags", &self.tags)?;
            let tags: Vec<&str> = self.tags.split_whitespace().collect();
            match TagMask::from_tags(&tags) {
                Ok(mask) => {
                    if self.verbose {
                        writeln!(prompter.out(), "TagMask: {mask}")?;
                    }
                    return Ok(mask);
                }
                Err(e) => {
                    writeln!(prompter.out(), "Error: {e}")?;
                    writeln!(prompter.out(), "Defined tags are: {}", format_list(DEFINED_TAGS))?;
                }
            }
        }
    }

    /// Prompt until `quit` or end of input
    pub fn run<R, W, F>(&mut self, prompter: &mut Prompter<R, W>, mut send: F) -> Result<()>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&TapirMsg) -> Result<()>,
    {
        writeln!(prompter.out(), "Defined operations are: {}", format_list(OPERATIONS))?;
        loop {
            match self.step(prompter, &mut send) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(e) if is_eof(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

/// True when `err` is the prompter running out of input
pub fn is_eof(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::UnexpectedEof)
}

/// Register the observations topic on `engine`
///
/// The signing key must be configured, but observations are published as
/// plain JSON.
pub fn add_observation_topic(engine: &mut MqttEngine, topic: &str, key: SigningKey) -> Result<()> {
    engine.pub_to_topic(topic, Some(key), false)?;
    Ok(())
}

pub async fn run(ctx: &Context, client_id: &str) -> Result<()> {
    let tapir = &ctx.config()?.tapir;
    let topic = tapir.require_topic(TopicKind::Observations)?.to_string();
    println!("Using DNS TAPIR observation MQTT topic: {topic}");

    let key = signing_key(tapir, TopicKind::Observations)?;
    let srcname = srcname(tapir, TopicKind::Observations)?.to_string();

    let (status_tx, _status_task) = status_printer();
    let mut engine = MqttEngine::new("observations", client_id, &tapir.mqtt, PubSub::PUB, status_tx)?;
    add_observation_topic(&mut engine, &topic, key)?;
    let handle = engine.start()?;
    interrupt::spawn(handle.commander.clone());

    let outbox = handle.outbox.clone();
    let (verbose, headers) = (ctx.verbose, ctx.headers);
    tokio::task::spawn_blocking(move || {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        let mut composer = ObservationComposer::new(srcname).verbose(verbose).headers(headers);
        composer.run(&mut prompter, |msg| {
            if verbose {
                println!("Sending TAPIR-POP observation message to topic {topic}");
            }
            outbox
                .blocking_send(MqttPkgOut::raw(topic.as_str(), msg)?)
                .context("MQTT engine is gone")
        })
    })
    .await
    .context("observation composer panicked")??;

    let resp = handle.stop().await.context("MQTT engine did not answer")?;
    println!("Response from MQTT Engine: {resp}");
    Ok(())
}
