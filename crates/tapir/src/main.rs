//! tapir-cli - command line client for TAPIR-POP, TAPIR-Slogger and the
//! DNS TAPIR MQTT bus
//!
//! # Usage
//!
//! ```bash
//! # Ask TAPIR-POP how it is doing
//! tapir-cli pop status
//! tapir-cli --config ./tapir-cli.yaml pop ping -c 3
//!
//! # Inspect the lists TAPIR-POP holds
//! tapir-cli debug colourlists
//! tapir-cli debug import-greylist -l dns-tapir
//!
//! # Work without a configuration file
//! tapir-cli --standalone debug tags --mask 345
//!
//! # Publish to and watch the MQTT bus
//! tapir-cli mqtt engine --pub --sub -t observations
//! tapir-cli mqtt tapir observations
//! ```

mod cmd;
mod context;
mod format;
mod table;
mod tty;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tapir_config::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use context::{Context, GlobalArgs};

/// tapir-cli - client for TAPIR-POP, TAPIR-Slogger and the DNS TAPIR MQTT bus
#[derive(Parser, Debug)]
#[command(name = "tapir-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Instruct TAPIR-POP to bump the SOA serial of a zone
    Bump(cmd::pop::BumpArgs),

    /// TAPIR-POP commands
    Pop(cmd::pop::PopArgs),

    /// List the API endpoints of TAPIR-POP
    Api(cmd::api::ApiArgs),

    /// TAPIR-POP debug commands
    Debug(cmd::debug::DebugArgs),

    /// MQTT engine and DNS TAPIR message tools
    Mqtt(cmd::mqtt::MqttArgs),

    /// Upload a public key to TAPIR Core
    Keyupload(cmd::keyupload::KeyUploadArgs),

    /// TAPIR-Slogger commands
    Slogger(cmd::slogger::SloggerArgs),
}

impl Command {
    /// Whether the command reads the configuration file
    fn requires_config(&self) -> bool {
        match self {
            Self::Debug(args) => !args.is_local(),
            _ => true,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = Context::new(&cli.global, cli.command.requires_config())?;
    let config_level = ctx.config().ok().map(|c| c.log.level);
    let log_level = resolve_log_level(&cli.global, config_level);
    init_logging(&log_level)?;

    match cli.command {
        Command::Bump(args) => cmd::pop::bump(&ctx, args).await,
        Command::Pop(args) => cmd::pop::run(&ctx, args).await,
        Command::Api(args) => cmd::api::run(&ctx, args).await,
        Command::Debug(args) => cmd::debug::run(&ctx, args).await,
        Command::Mqtt(args) => cmd::mqtt::run(&ctx, args).await,
        Command::Keyupload(args) => cmd::keyupload::run(&ctx, args).await,
        Command::Slogger(args) => cmd::slogger::run(&ctx, args).await,
    }
}

/// Resolve log level: --log-level > --debug > --verbose > config file > "warn"
fn resolve_log_level(args: &GlobalArgs, config_level: Option<LogLevel>) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    if args.debug {
        return LogLevel::Debug.as_str().to_string();
    }
    if args.verbose {
        return LogLevel::Info.as_str().to_string();
    }
    config_level.unwrap_or_default().as_str().to_string()
}

/// Initialize the tracing subscriber; logs go to stderr, output to stdout
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("warn"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();

    Ok(())
}
