//! Debug commands - inspect TAPIR-POP internals; not for production use
//!
//! # Usage
//!
//! ```bash
//! tapir-cli debug colourlists
//! tapir-cli debug genrpz
//! tapir-cli debug mqtt-stats
//! tapir-cli debug reaper-stats
//! tapir-cli debug update-pop-status -c rpz-update -s fail
//! tapir-cli debug import-greylist -l dns-tapir
//! tapir-cli debug tags --mask 345
//! ```

use std::str::FromStr;

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use tapir_api::{GreylistExport, Method};
use tapir_protocol::{
    BootstrapPost, BootstrapResponse, ComponentStatus, DEFINED_TAGS, DebugPost, DebugResponse,
    MqttStats, ReaperStats, TagMask, WbgList, fqdn,
};

use crate::context::Context;
use crate::format::{format_duration, format_list, format_rfc3339, format_since, format_time};
use crate::table::Table;

/// Greylist exported when none is named
pub const DEFAULT_GREYLIST: &str = "dns-tapir";

/// Debug command arguments
#[derive(Args, Debug)]
pub struct DebugArgs {
    #[command(subcommand)]
    pub command: DebugCommand,
}

#[derive(Subcommand, Debug)]
pub enum DebugCommand {
    /// Return the zone data for a zone (most useful with -d)
    Zonedata {
        /// Zone name
        #[arg(short, long)]
        zone: String,
    },

    /// Show the white/black/grey lists
    Colourlists,

    /// Generate the RPZ output and show it
    Genrpz,

    /// Show the MQTT message counters of the TAPIR-POP MQTT engine
    MqttStats,

    /// Show the reaper schedule of all greylists
    ReaperStats,

    /// Set the status of a TAPIR-POP component, triggering a status report over MQTT
    UpdatePopStatus {
        /// Component name
        #[arg(short, long)]
        component: String,

        /// Component status (ok, warn, fail)
        #[arg(short, long)]
        status: String,
    },

    /// Show the MQTT topic counters of all greylists
    GreylistStatus,

    /// Export a greylist from TAPIR-POP and show it
    ImportGreylist {
        /// Greylist name
        #[arg(short, long)]
        list: Option<String>,
    },

    /// List the defined observation tags, optionally decoding a mask
    Tags {
        /// Tag mask to decode
        #[arg(long)]
        mask: Option<u32>,
    },
}

impl DebugArgs {
    /// True for commands that never talk to a daemon
    pub fn is_local(&self) -> bool {
        matches!(self.command, DebugCommand::Tags { .. })
    }
}

/// The `/debug` body for `update-pop-status`, rejecting unknown statuses
pub fn update_status_post(component: &str, status: &str) -> Result<DebugPost> {
    let Ok(status) = ComponentStatus::from_str(status) else {
        bail!("invalid status: {status} (must be ok, warn or fail)");
    };
    Ok(DebugPost {
        component: component.to_string(),
        status: Some(status),
        ..DebugPost::new("send-status")
    })
}

/// The `/bootstrap` body for `import-greylist`
pub fn export_greylist_post(list: &str) -> BootstrapPost {
    BootstrapPost {
        command: "export-greylist".to_string(),
        list_name: list.to_string(),
        encoding: "json".to_string(),
    }
}

pub async fn run(ctx: &Context, args: DebugArgs) -> Result<()> {
    match args.command {
        DebugCommand::Zonedata { zone } => {
            let resp = send(
                ctx,
                DebugPost {
                    zone: fqdn(&zone),
                    ..DebugPost::new("zonedata")
                },
            )
            .await?;
            println!("Received {} bytes of data", resp.msg.len());
            print_msg(&resp);
        }
        DebugCommand::Colourlists => {
            let resp = send(ctx, DebugPost::new("colourlists")).await?;
            println!("{}", render_colourlists(&resp, ctx.headers));
        }
        DebugCommand::Genrpz => {
            let resp = send(ctx, DebugPost::new("gen-output")).await?;
            println!("{}", render_genrpz(&resp));
        }
        DebugCommand::MqttStats => {
            let resp = send(ctx, DebugPost::new("mqtt-stats")).await?;
            print_msg(&resp);
            println!("{}", render_mqtt_stats(ctx, &resp.mqtt_stats, Utc::now()));
        }
        DebugCommand::ReaperStats => {
            let resp = send(ctx, DebugPost::new("reaper-stats")).await?;
            print_msg(&resp);
            println!("{}", render_reaper_stats(ctx, &resp.reaper_stats));
        }
        DebugCommand::UpdatePopStatus { component, status } => {
            let post = update_status_post(&component, &status)?;
            let resp = send(ctx, post).await?;
            print_msg(&resp);
        }
        DebugCommand::GreylistStatus => greylist_status(ctx).await?,
        DebugCommand::ImportGreylist { list } => import_greylist(ctx, list).await?,
        DebugCommand::Tags { mask } => println!("{}", render_tags(ctx, mask.map(TagMask))),
    }
    Ok(())
}

async fn send(ctx: &Context, post: DebugPost) -> Result<DebugResponse> {
    let api = ctx.pop_api()?;
    let resp = api
        .send_debug(&post)
        .await
        .with_context(|| format!("debug command '{}' to TAPIR-POP failed", post.command))?;
    ctx.dump("Debug response", &resp);
    if resp.error {
        println!("{}", resp.error_msg);
    }
    Ok(resp)
}

fn print_msg(resp: &DebugResponse) {
    if !resp.msg.is_empty() {
        println!("{}", resp.msg);
    }
}

async fn greylist_status(ctx: &Context) -> Result<()> {
    let api = ctx.pop_api()?;
    let post = BootstrapPost {
        command: "greylist-status".to_string(),
        ..Default::default()
    };
    let resp = api
        .send_bootstrap(&post)
        .await
        .context("greylist-status request to TAPIR-POP failed")?;
    ctx.dump("Bootstrap response", &resp);

    println!("{}", render_greylist_status(ctx, &resp));
    Ok(())
}

async fn import_greylist(ctx: &Context, list: Option<String>) -> Result<()> {
    let list = list.unwrap_or_else(|| {
        println!("No greylist name specified, using '{DEFAULT_GREYLIST}'");
        DEFAULT_GREYLIST.to_string()
    });

    let api = ctx.pop_api()?;
    let (status, body) = api
        .request(Method::POST, "/bootstrap", &export_greylist_post(&list))
        .await
        .context("export-greylist request to TAPIR-POP failed")?;
    if !status.is_success() {
        bail!("HTTP error {status}: {}", String::from_utf8_lossy(&body));
    }

    let export = GreylistExport::decode(&body)
        .context("response is neither a greylist nor a bootstrap response")?;
    match export {
        GreylistExport::List(greylist) => {
            println!("{}", render_greylist(ctx, &list, &greylist, Utc::now()));
        }
        GreylistExport::Reply(reply) => {
            if reply.error {
                println!("Command Error: {}", reply.error_msg);
            }
            if !reply.msg.is_empty() {
                println!("Command response: {}", reply.msg);
            }
        }
    }
    Ok(())
}

/// Fixed width listing of every name on every colour list
pub fn render_colourlists(resp: &DebugResponse, headers: bool) -> String {
    fn line(domain: &str, source: &str, src_fmt: &str, colour: &str) -> String {
        format!("{domain:<35}|{source:<20}|{src_fmt:<10}|{colour:<10}")
            .trim_end()
            .to_string()
    }

    let mut lines = Vec::new();
    if headers {
        lines.push(line("Domain", "Source", "Src Fmt", "Colour"));
        lines.push("-".repeat(78));
    }

    for (colour, label) in [("whitelist", "white"), ("blacklist", "black"), ("greylist", "grey")] {
        let Some(lists) = resp.lists.get(colour) else {
            continue;
        };
        for list in lists.values() {
            let src_fmt = if colour == "greylist" {
                list.src_format.as_str()
            } else {
                "-"
            };
            for name in list.names.values() {
                lines.push(line(&name.name, &list.name, src_fmt, label));
            }
        }
    }

    lines.join("\n")
}

/// Counts of black and grey listed names followed by the RPZ records
pub fn render_genrpz(resp: &DebugResponse) -> String {
    let mut lines = vec![
        format!("Received {} bytes of data", resp.msg.len()),
        format!(
            "black count={}: {}",
            resp.blacklisted_names.len(),
            format_list(&resp.blacklisted_names)
        ),
        format!(
            "grey count={}: {}",
            resp.greylisted_names.len(),
            format_list(&resp.greylisted_names)
        ),
    ];
    lines.extend(resp.rpz_output.iter().filter_map(|n| n.rr.clone()));
    lines.join("\n")
}

/// Per topic message count and age of the latest message
pub fn render_mqtt_stats(ctx: &Context, stats: &MqttStats, now: DateTime<Utc>) -> Table {
    let mut table = ctx.table(["MQTT Topic", "Msgs", "Last MQTT Message", "Time since last msg"]);
    for (topic, count) in &stats.msg_counters {
        match stats.msg_time_stamps.get(topic) {
            Some(ts) => table.row([
                topic.clone(),
                count.to_string(),
                format_time(ts),
                format_since(*ts, now),
            ]),
            None => table.row([topic.clone(), count.to_string(), "-".into(), "-".into()]),
        }
    }
    table
}

/// Deletion schedule of each greylist
pub fn render_reaper_stats(ctx: &Context, stats: &ReaperStats) -> String {
    let mut sections = Vec::new();
    for (greylist, schedule) in stats {
        if schedule.is_empty() {
            sections.push(format!("No reaper data for greylist {greylist}"));
            continue;
        }
        let mut table = ctx.table(["Time", "Count", "Names"]);
        for (time, names) in schedule {
            table.row([format_time(time), names.len().to_string(), format_list(names)]);
        }
        sections.push(format!(
            "From greylist {greylist} at the following times these names will be deleted:\n{table}"
        ));
    }
    sections.join("\n")
}

/// Bootstrap reply status lines plus per topic counters
pub fn render_greylist_status(ctx: &Context, resp: &BootstrapResponse) -> String {
    let mut lines = Vec::new();
    if resp.error {
        lines.push(format!("Bootstrap Error: {}", resp.error_msg));
    }
    if !resp.msg.is_empty() {
        lines.push(format!("Bootstrap response: {}", resp.msg));
    }

    let mut table = ctx.table(["Topic", "Pub Msgs", "LatestPub", "Sub Msgs", "LatestSub"]);
    for (topic, data) in &resp.topic_data {
        table.row([
            topic.clone(),
            data.pub_msgs.to_string(),
            format_rfc3339(&data.latest_pub),
            data.sub_msgs.to_string(),
            format_rfc3339(&data.latest_sub),
        ]);
    }
    lines.push(table.to_string());
    lines.join("\n")
}

/// Names and reaper schedule of an exported greylist
pub fn render_greylist(ctx: &Context, list: &str, greylist: &WbgList, now: DateTime<Utc>) -> String {
    let mut out = format!("Names present in greylist {list}:");
    if greylist.names.is_empty() {
        out.push_str(" None");
    } else {
        let mut table = ctx.table(["Name", "Time added", "TTL", "Tags"]);
        for name in greylist.names.values() {
            let tags = name.tag_mask.tags();
            table.row([
                name.name.clone(),
                format_time(&name.time_added),
                format_duration(name.remaining_secs(now)),
                if tags.is_empty() { "-".to_string() } else { tags.join(",") },
            ]);
        }
        out.push('\n');
        out.push_str(&table.to_string());
    }

    out.push_str(&format!("\nReaperData present in greylist {list}:"));
    if greylist.reaper_data.is_empty() {
        out.push_str(" None");
    } else {
        let mut table = ctx.table(["Time", "Count", "Names"]);
        for (time, names) in greylist.reaper_schedule() {
            table.row([format_time(time), names.len().to_string(), format_list(&names)]);
        }
        out.push('\n');
        out.push_str(&table.to_string());
    }
    out
}

/// Table of the defined tags and their bits
pub fn tag_table(headers: bool) -> Table {
    let mut table = Table::new(["Name", "Bit"]).with_header(headers);
    for (bit, tag) in DEFINED_TAGS.iter().enumerate() {
        table.row([tag.to_string(), TagMask(1 << bit).to_string()]);
    }
    table
}

/// Defined tags, plus the decoding of `mask` when given
pub fn render_tags(ctx: &Context, mask: Option<TagMask>) -> String {
    let mut out = tag_table(ctx.headers).to_string();
    if let Some(mask) = mask {
        out.push_str(&format!(
            "\n{mask} num tags: {} {}",
            mask.num_tags(),
            format_list(mask.tags())
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tapir_config::Config;
    use tapir_protocol::{RpzName, TapirName, TopicData};

    fn ctx() -> Context {
        Context::with_config(Config::default())
    }

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn list(name: &str, src_format: &str, names: &[&str]) -> WbgList {
        WbgList {
            name: name.to_string(),
            src_format: src_format.to_string(),
            names: names
                .iter()
                .map(|n| {
                    (
                        n.to_string(),
                        TapirName {
                            name: n.to_string(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Request building
    // =========================================================================

    #[test]
    fn test_update_status_post() {
        let post = update_status_post("rpz-update", "warn").unwrap();
        assert_eq!(post.command, "send-status");
        assert_eq!(post.component, "rpz-update");
        assert_eq!(post.status, Some(ComponentStatus::Warn));

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["Status"], "warn");
        assert!(json.get("Zone").is_none());
    }

    #[test]
    fn test_update_status_rejects_unknown_status() {
        let err = update_status_post("rpz-update", "broken").unwrap_err();
        assert!(err.to_string().contains("invalid status: broken"));
    }

    #[test]
    fn test_export_greylist_post() {
        let post = export_greylist_post("dns-tapir");
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["Command"], "export-greylist");
        assert_eq!(json["ListName"], "dns-tapir");
        assert_eq!(json["Encoding"], "json");
    }

    #[test]
    fn test_only_tags_is_local() {
        let args = DebugArgs {
            command: DebugCommand::Tags { mask: None },
        };
        assert!(args.is_local());
        let args = DebugArgs {
            command: DebugCommand::Genrpz,
        };
        assert!(!args.is_local());
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_render_colourlists() {
        let mut resp = DebugResponse::default();
        let mut white = BTreeMap::new();
        white.insert("allow".to_string(), list("allow", "csv", &["good.example."]));
        let mut grey = BTreeMap::new();
        grey.insert("dns-tapir".to_string(), list("dns-tapir", "tapir-msg", &["odd.example."]));
        resp.lists.insert("whitelist".to_string(), white);
        resp.lists.insert("greylist".to_string(), grey);

        let out = render_colourlists(&resp, true);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Domain                             |Source"));
        assert_eq!(lines[1], "-".repeat(78));
        assert_eq!(
            lines[2],
            format!("{:<35}|{:<20}|{:<10}|white", "good.example.", "allow", "-")
        );
        assert!(lines[3].contains("|tapir-msg |grey"));

        let out = render_colourlists(&resp, false);
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_render_genrpz() {
        let resp = DebugResponse {
            msg: "abcd".to_string(),
            blacklisted_names: vec!["bad.example.".to_string()],
            greylisted_names: vec!["odd.example.".to_string(), "odd2.example.".to_string()],
            rpz_output: vec![
                RpzName {
                    name: "bad.example.".to_string(),
                    rr: Some("bad.example.rpz. 3600 IN CNAME .".to_string()),
                },
                RpzName {
                    name: "skip.".to_string(),
                    rr: None,
                },
            ],
            ..Default::default()
        };

        assert_eq!(
            render_genrpz(&resp),
            "Received 4 bytes of data\n\
             black count=1: [bad.example.]\n\
             grey count=2: [odd.example. odd2.example.]\n\
             bad.example.rpz. 3600 IN CNAME ."
        );
    }

    #[test]
    fn test_render_mqtt_stats() {
        let mut stats = MqttStats::default();
        stats.msg_counters.insert("events/up/a/observations".to_string(), 7);
        stats.msg_counters.insert("status/up/axfr/tapir-pop".to_string(), 1);
        stats
            .msg_time_stamps
            .insert("events/up/a/observations".to_string(), t(12, 0));

        let out = render_mqtt_stats(&ctx(), &stats, t(12, 5)).to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("MQTT Topic"));
        assert!(lines[1].ends_with("7     2024-05-01 12:00:00  5m0s"));
        assert!(lines[2].ends_with("-"));
    }

    #[test]
    fn test_render_reaper_stats() {
        let mut stats = ReaperStats::new();
        stats.insert("empty".to_string(), BTreeMap::new());
        let mut schedule = BTreeMap::new();
        schedule.insert(t(13, 0), vec!["a.".to_string(), "b.".to_string()]);
        stats.insert("dns-tapir".to_string(), schedule);

        let out = render_reaper_stats(&ctx(), &stats);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "From greylist dns-tapir at the following times these names will be deleted:"
        );
        assert_eq!(lines[1], "Time                 Count  Names");
        assert_eq!(lines[2], "2024-05-01 13:00:00  2      [a. b.]");
        assert_eq!(lines[3], "No reaper data for greylist empty");
    }

    #[test]
    fn test_render_greylist_status() {
        let mut resp = BootstrapResponse {
            error: true,
            error_msg: "partial".to_string(),
            msg: "ok-ish".to_string(),
            ..Default::default()
        };
        resp.topic_data.insert(
            "events/up/a/observations".to_string(),
            TopicData {
                pub_msgs: 3,
                sub_msgs: 5,
                latest_pub: t(10, 0),
                latest_sub: t(11, 0),
            },
        );

        let out = render_greylist_status(&ctx(), &resp);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Bootstrap Error: partial");
        assert_eq!(lines[1], "Bootstrap response: ok-ish");
        assert!(lines[2].starts_with("Topic"));
        assert_eq!(
            lines[3],
            "events/up/a/observations  3         2024-05-01T10:00:00Z  5         2024-05-01T11:00:00Z"
        );
    }

    #[test]
    fn test_render_greylist() {
        let mut greylist = WbgList::default();
        greylist.names.insert(
            "odd.example.".to_string(),
            TapirName {
                name: "odd.example.".to_string(),
                time_added: t(12, 0),
                ttl: 3_600 * 1_000_000_000,
                tag_mask: TagMask(0b101),
                rr: None,
            },
        );

        let out = render_greylist(&ctx(), "dns-tapir", &greylist, t(12, 30));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Names present in greylist dns-tapir:");
        assert!(lines[1].starts_with("Name"));
        assert!(lines[2].contains("2024-05-01 12:00:00"));
        assert!(lines[2].contains("30m0s"));
        assert!(lines[2].ends_with("newdomain,verynewdomain"));
        assert_eq!(lines[3], "ReaperData present in greylist dns-tapir: None");
    }

    #[test]
    fn test_render_empty_greylist() {
        let out = render_greylist(&ctx(), "x", &WbgList::default(), t(0, 0));
        assert_eq!(
            out,
            "Names present in greylist x: None\nReaperData present in greylist x: None"
        );
    }

    #[test]
    fn test_render_tags() {
        let out = render_tags(&ctx(), Some(TagMask(345)));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), DEFINED_TAGS.len() + 2);
        assert!(lines[1].starts_with("newdomain"));
        assert!(lines[1].ends_with("00000000000000000000000000000001"));
        assert_eq!(
            *lines.last().unwrap(),
            "00000000000000000000000101011001 num tags: 5 [newdomain lowvolume badip likelymalware childporn]"
        );
    }
}
