//! TAPIR-Slogger commands
//!
//! # Usage
//!
//! ```bash
//! tapir-cli slogger pop status
//! tapir-cli slogger edm status --onlyfails
//! tapir-cli slogger ping
//! ```

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use tapir_protocol::{ComponentStatus, SloggerCmdPost, TapirFunctionStatus};

use super::ping::{self, PingArgs};
use crate::context::Context;
use crate::format::format_time;

/// Slogger command arguments
#[derive(Args, Debug)]
pub struct SloggerArgs {
    #[command(subcommand)]
    pub command: SloggerCommand,
}

#[derive(Subcommand, Debug)]
pub enum SloggerCommand {
    /// TAPIR-POP status as collected by TAPIR-Slogger
    Pop(ReportArgs),

    /// TAPIR-EDM status as collected by TAPIR-Slogger
    Edm(ReportArgs),

    /// Send an API ping to TAPIR-Slogger
    Ping(PingArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Get the status report
    Status {
        /// Show only components that currently fail
        #[arg(short = 'f', long = "onlyfails")]
        only_fails: bool,
    },
}

pub async fn run(ctx: &Context, args: SloggerArgs) -> Result<()> {
    let (label, report) = match args.command {
        SloggerCommand::Ping(ping_args) => {
            let api = ctx.slogger_api()?;
            return ping::run(&api, &ping_args, ctx.verbose).await;
        }
        SloggerCommand::Pop(report) => ("TAPIR-POP", report),
        SloggerCommand::Edm(report) => ("TAPIR-EDM", report),
    };
    let ReportCommand::Status { only_fails } = report.command;

    let api = ctx.slogger_api()?;
    let resp = api
        .send_slogger(&SloggerCmdPost {
            command: "status".to_string(),
        })
        .await
        .context("status request to TAPIR-Slogger failed")?;
    ctx.dump("Slogger response", &resp);

    if resp.error {
        println!("{}", resp.error_msg);
    }
    println!("{}", resp.msg);

    let reports = if label == "TAPIR-POP" {
        &resp.pop_status
    } else {
        &resp.edm_status
    };
    println!("{}", render_function_status(ctx, label, reports, only_fails));
    Ok(())
}

/// One table per reporting function
pub fn render_function_status(
    ctx: &Context,
    label: &str,
    reports: &BTreeMap<String, TapirFunctionStatus>,
    only_fails: bool,
) -> String {
    if reports.is_empty() {
        return format!("No Status reports from any {label} received");
    }

    let qualifier = if only_fails { " (only fails)" } else { "" };
    let mut sections = Vec::new();
    for (function_id, tfs) in reports {
        let mut table = ctx.table([
            "Component",
            "Status",
            "Error msg",
            "NumFailures",
            "LastFailure",
            "LastSuccess",
        ]);
        let shown = tfs
            .component_status
            .iter()
            .filter(|(_, c)| !only_fails || c.status == ComponentStatus::Fail);
        for (name, comp) in shown {
            table.row([
                name.clone(),
                comp.status.to_string(),
                comp.error_msg.clone(),
                comp.num_fails.to_string(),
                format_time(&comp.last_fail),
                format_time(&comp.last_success),
            ]);
        }
        sections.push(format!("Status for {label}{qualifier}: {function_id}\n{table}"));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tapir_config::Config;
    use tapir_protocol::TapirComponentStatus;

    fn ctx() -> Context {
        Context::with_config(Config::default())
    }

    fn report(function_id: &str) -> TapirFunctionStatus {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut tfs = TapirFunctionStatus {
            function: "tapir-pop".to_string(),
            function_id: function_id.to_string(),
            ..Default::default()
        };
        let mut failing = TapirComponentStatus::new("rpz-update");
        failing.record(ComponentStatus::Fail, "refused".to_string(), t);
        let mut fine = TapirComponentStatus::new("config");
        fine.record(ComponentStatus::Ok, "loaded".to_string(), t);
        tfs.component_status.insert("rpz-update".to_string(), failing);
        tfs.component_status.insert("config".to_string(), fine);
        tfs
    }

    #[test]
    fn test_no_reports() {
        let out = render_function_status(&ctx(), "TAPIR-EDM", &BTreeMap::new(), false);
        assert_eq!(out, "No Status reports from any TAPIR-EDM received");
    }

    #[test]
    fn test_all_components() {
        let mut reports = BTreeMap::new();
        reports.insert("pop-1".to_string(), report("pop-1"));
        let out = render_function_status(&ctx(), "TAPIR-POP", &reports, false);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Status for TAPIR-POP: pop-1");
        assert!(lines[1].starts_with("Component   Status  Error msg  NumFailures"));
        assert!(lines[2].starts_with("config      ok                 0"));
        assert!(lines[3].starts_with("rpz-update  fail    refused    1"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_only_fails_per_function() {
        let mut reports = BTreeMap::new();
        reports.insert("pop-1".to_string(), report("pop-1"));
        reports.insert("pop-2".to_string(), report("pop-2"));
        let out = render_function_status(&ctx(), "TAPIR-POP", &reports, true);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Status for TAPIR-POP (only fails): pop-1");
        assert!(lines[2].starts_with("rpz-update"));
        assert_eq!(lines[3], "Status for TAPIR-POP (only fails): pop-2");
        assert_eq!(lines.len(), 6);
        assert!(!out.contains("config"));
    }
}
