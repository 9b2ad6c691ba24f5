//! TAPIR-POP commands
//!
//! # Usage
//!
//! ```bash
//! tapir-cli bump -z rpz.example
//! tapir-cli pop status
//! tapir-cli pop stop
//! tapir-cli pop mqtt restart
//! tapir-cli pop ping -c 2
//! ```

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use tapir_protocol::{CommandPost, CommandResponse, TapirFunctionStatus, fqdn};

use super::ping::{self, PingArgs};
use crate::context::Context;
use crate::format::format_time;

/// Bump command arguments
#[derive(Args, Debug)]
pub struct BumpArgs {
    /// Zone name
    #[arg(short, long)]
    pub zone: String,
}

/// Pop command arguments
#[derive(Args, Debug)]
pub struct PopArgs {
    #[command(subcommand)]
    pub command: PopCommand,
}

#[derive(Subcommand, Debug)]
pub enum PopCommand {
    /// Get the status of TAPIR-POP
    Status,

    /// Instruct TAPIR-POP to stop
    Stop,

    /// Control the TAPIR-POP MQTT engine
    Mqtt(PopMqttArgs),

    /// Send an API ping to TAPIR-POP
    Ping(PingArgs),
}

#[derive(Args, Debug)]
pub struct PopMqttArgs {
    #[command(subcommand)]
    pub command: PopMqttCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopMqttCommand {
    /// Start the MQTT engine
    Start,
    /// Stop the MQTT engine
    Stop,
    /// Restart the MQTT engine
    Restart,
}

impl PopMqttCommand {
    /// Name of the `/command` verb
    pub const fn command(self) -> &'static str {
        match self {
            Self::Start => "mqtt-start",
            Self::Stop => "mqtt-stop",
            Self::Restart => "mqtt-restart",
        }
    }
}

/// The `/command` body for `bump`
pub fn bump_post(zone: &str) -> CommandPost {
    CommandPost::for_zone("bump", fqdn(zone))
}

pub async fn bump(ctx: &Context, args: BumpArgs) -> Result<()> {
    let resp = send(ctx, &bump_post(&args.zone)).await?;
    print_reply(&resp);
    Ok(())
}

pub async fn run(ctx: &Context, args: PopArgs) -> Result<()> {
    match args.command {
        PopCommand::Status => {
            let resp = send(ctx, &CommandPost::new("status")).await?;
            print_reply(&resp);
            if let Some(out) = render_status(ctx, &resp.tapir_function_status) {
                println!("{out}");
            }
        }
        PopCommand::Stop => {
            let resp = send(ctx, &CommandPost::new("stop")).await?;
            print_reply(&resp);
        }
        PopCommand::Mqtt(mqtt) => {
            let resp = send(ctx, &CommandPost::new(mqtt.command.command())).await?;
            print_reply(&resp);
        }
        PopCommand::Ping(ping_args) => {
            let api = ctx.pop_api()?;
            ping::run(&api, &ping_args, ctx.verbose).await?;
        }
    }
    Ok(())
}

async fn send(ctx: &Context, post: &CommandPost) -> Result<CommandResponse> {
    let api = ctx.pop_api()?;
    let resp = api
        .send_command(post)
        .await
        .with_context(|| format!("command '{}' to TAPIR-POP failed", post.command))?;
    ctx.dump("Command response", &resp);
    Ok(resp)
}

fn print_reply(resp: &CommandResponse) {
    if resp.error {
        println!("{}", resp.error_msg);
    }
    println!("{}", resp.msg);
}

/// Summary line plus component table, or `None` if nothing was reported
pub fn render_status(ctx: &Context, tfs: &TapirFunctionStatus) -> Option<String> {
    if tfs.component_status.is_empty() {
        return None;
    }

    let mut table = ctx.table([
        "Component",
        "Status",
        "Error msg",
        "# Fails",
        "# Warns",
        "LastFailure",
        "LastSuccess",
    ]);
    for (name, comp) in &tfs.component_status {
        table.row([
            name.clone(),
            comp.status.to_string(),
            comp.error_msg.clone(),
            comp.num_fails.to_string(),
            comp.num_warnings.to_string(),
            format_time(&comp.last_fail),
            format_time(&comp.last_success),
        ]);
    }

    Some(format!(
        "TAPIR-POP Status. Reported components: {} Total errors (since last start): {}\n{}",
        tfs.component_status.len(),
        tfs.num_failures,
        table
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tapir_config::Config;
    use tapir_protocol::{ComponentStatus, TapirComponentStatus};

    fn ctx() -> Context {
        Context::with_config(Config::default())
    }

    #[test]
    fn test_bump_post_is_fqdn() {
        let post = bump_post("rpz.example");
        assert_eq!(post.command, "bump");
        assert_eq!(post.zone, "rpz.example.");

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["Command"], "bump");
        assert_eq!(json["Zone"], "rpz.example.");
    }

    #[test]
    fn test_mqtt_command_names() {
        assert_eq!(PopMqttCommand::Start.command(), "mqtt-start");
        assert_eq!(PopMqttCommand::Stop.command(), "mqtt-stop");
        assert_eq!(PopMqttCommand::Restart.command(), "mqtt-restart");
    }

    #[test]
    fn test_render_status_empty() {
        assert!(render_status(&ctx(), &TapirFunctionStatus::default()).is_none());
    }

    #[test]
    fn test_render_status_table() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut tfs = TapirFunctionStatus {
            function: "tapir-pop".to_string(),
            function_id: "pop-1".to_string(),
            num_failures: 4,
            ..Default::default()
        };
        tfs.component_status.insert(
            "rpz-update".to_string(),
            TapirComponentStatus {
                component: "rpz-update".to_string(),
                status: ComponentStatus::Fail,
                error_msg: "zone transfer refused".to_string(),
                num_fails: 4,
                last_fail: t,
                last_success: t,
                ..Default::default()
            },
        );

        let out = render_status(&ctx(), &tfs).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "TAPIR-POP Status. Reported components: 1 Total errors (since last start): 4"
        );
        assert!(lines[1].starts_with("Component   Status  Error msg"));
        assert!(lines[2].starts_with("rpz-update  fail    zone transfer refused  4"));
        assert!(lines[2].ends_with("2024-05-01 12:00:00"));
    }
}
