//! `mqtt tapir bootstrap status` - greylist counters on the bootstrap servers
//!
//! The servers are found in the TAPIR-POP sources file: every MQTT-fed
//! greylist source named `-G` lists its bootstrap servers and the URL
//! template and API key to reach them.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Args, Subcommand};
use tapir_api::ApiClient;
use tapir_config::{SourceConf, parse_sources};
use tapir_protocol::{BootstrapPost, BootstrapResponse};
use tracing::debug;

use crate::cmd::debug::DEFAULT_GREYLIST;
use crate::context::Context;
use crate::format::{format_rfc3339, format_since};
use crate::table::Table;

/// Client certificate presented to bootstrap servers
const BOOTSTRAP_CERT: &str = "tapir-pop";

const HEADER: [&str; 9] = [
    "Server", "Uptime", "Src", "Name", "MQTT Topic", "Pub Msgs", "LastPub", "Sub Msgs", "LastSub",
];

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Name of the MQTT greylist source
    #[arg(short = 'G', long = "greylist", global = true, default_value = DEFAULT_GREYLIST)]
    pub greylist: String,

    #[command(subcommand)]
    pub command: BootstrapCommand,
}

#[derive(Subcommand, Debug)]
pub enum BootstrapCommand {
    /// Ask every bootstrap server for its greylist status
    Status,
}

/// Sources that are the MQTT greylist `list`, by source id
pub fn select_sources<'a>(
    sources: &'a BTreeMap<String, SourceConf>,
    list: &str,
) -> Vec<(&'a str, &'a SourceConf)> {
    sources
        .iter()
        .filter(|(_, src)| src.is_mqtt_greylist(list))
        .map(|(id, src)| (id.as_str(), src))
        .collect()
}

/// The `greylist-status` request for `src`
pub fn status_post(src: &SourceConf) -> BootstrapPost {
    BootstrapPost {
        command: "greylist-status".to_string(),
        list_name: src.name.clone(),
        encoding: "json".to_string(),
    }
}

/// Append one row per topic of a server's reply
pub fn add_rows(
    table: &mut Table,
    server: &str,
    uptime: &str,
    src_id: &str,
    src: &SourceConf,
    resp: &BootstrapResponse,
) {
    for (topic, data) in &resp.topic_data {
        table.row([
            server.to_string(),
            uptime.to_string(),
            src_id.to_string(),
            src.name.clone(),
            topic.clone(),
            data.pub_msgs.to_string(),
            format_rfc3339(&data.latest_pub),
            data.sub_msgs.to_string(),
            format_rfc3339(&data.latest_sub),
        ]);
    }
}

pub async fn run(ctx: &Context, args: BootstrapArgs) -> Result<()> {
    let BootstrapCommand::Status = args.command;

    let config = ctx.config()?;
    let sources = parse_sources(&config.cli.sources)?;
    let selected = select_sources(&sources, &args.greylist);
    if selected.is_empty() {
        bail!("greylist source \"{}\" not found in sources", args.greylist);
    }

    for (src_id, src) in selected {
        if src.bootstrap.is_empty() {
            println!(
                "Note: greylist source {src_id} (name \"{}\") has no bootstrap servers",
                src.name
            );
            continue;
        }
        let table = source_status(ctx, src_id, src).await?;
        println!("{table}");
    }
    Ok(())
}

async fn source_status(ctx: &Context, src_id: &str, src: &SourceConf) -> Result<Table> {
    let mut builder =
        ApiClient::builder(src.bootstrap_url(&src.bootstrap[0])).api_key(&src.bootstrapkey);
    if ctx.use_tls {
        let cert = ctx.config()?.certs.client_cert(BOOTSTRAP_CERT)?;
        builder = builder.tls(ctx.tls_settings(cert.cert, cert.key)?);
    }
    let base = builder.build()?;

    let mut table = ctx.table(HEADER);
    for server in &src.bootstrap {
        let api = base.with_base_url(src.bootstrap_url(server));
        debug!(server = %server, url = %api.base_url(), "querying bootstrap server");

        let ping = match api.send_ping(0).await {
            Ok(ping) => ping,
            Err(e) => {
                println!("Ping to MQTT bootstrap server {server} failed: {e}");
                continue;
            }
        };
        let uptime = format_since(ping.boot_time, Utc::now());

        let resp = match api.send_bootstrap(&status_post(src)).await {
            Ok(resp) => resp,
            Err(e) => {
                println!(
                    "Bootstrap server {server} responded with error: {e} (instead of greylist status)"
                );
                continue;
            }
        };
        report_reply(ctx, server, &resp);
        add_rows(&mut table, server, &uptime, src_id, src, &resp);
    }
    Ok(table)
}

fn report_reply(ctx: &Context, server: &str, resp: &BootstrapResponse) {
    if resp.error {
        println!(
            "Bootstrap server {server} responded with error: {} (instead of greylist status)",
            resp.error_msg
        );
    }
    if ctx.verbose && !resp.msg.is_empty() {
        println!("MQTT Bootstrap server {server} responded with message: {}", resp.msg);
    }
}
