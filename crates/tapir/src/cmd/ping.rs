//! Ping command - API ping against a TAPIR daemon
//!
//! # Usage
//!
//! ```bash
//! tapir-cli pop ping
//! tapir-cli pop ping -c 3 -v
//! tapir-cli slogger ping
//! ```

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tapir_api::ApiClient;
use tapir_protocol::PingResponse;

use crate::format::{format_since, format_time};

/// Ping command arguments
#[derive(Args, Debug, Default)]
pub struct PingArgs {
    /// Number of pings to send
    #[arg(short, long, default_value_t = 0)]
    pub count: u32,
}

pub async fn run(api: &ApiClient, args: &PingArgs, verbose: bool) -> Result<()> {
    let resp = api
        .send_ping(args.count)
        .await
        .with_context(|| format!("ping to {} failed", api.base_url()))?;

    println!("{}", render_ping(&resp, verbose, Utc::now()));
    Ok(())
}

/// One line summary of a ping response
pub fn render_ping(resp: &PingResponse, verbose: bool, now: DateTime<Utc>) -> String {
    let uptime = format_since(resp.boot_time, now);
    let time = format_time(&resp.time);

    if verbose {
        format!(
            "{} from {} @ {} (version {}): pings: {}, pongs: {}, uptime: {} time: {}, client: {}",
            resp.msg,
            resp.daemon,
            resp.server_host,
            resp.version,
            resp.pings,
            resp.pongs,
            uptime,
            time,
            resp.client
        )
    } else {
        format!(
            "{}: pings: {}, pongs: {}, uptime: {}, time: {}",
            resp.msg, resp.pings, resp.pongs, uptime, time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PingResponse {
        PingResponse {
            time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            boot_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            daemon: "tapir-pop".to_string(),
            server_host: "pop.example".to_string(),
            client: "127.0.0.1:5555".to_string(),
            version: "0.3.1".to_string(),
            msg: "pong".to_string(),
            pings: 2,
            pongs: 3,
        }
    }

    #[test]
    fn test_render_ping_short() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();
        assert_eq!(
            render_ping(&sample(), false, now),
            "pong: pings: 2, pongs: 3, uptime: 1h30m5s, time: 2024-05-01 12:00:00"
        );
    }

    #[test]
    fn test_render_ping_verbose() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let line = render_ping(&sample(), true, now);
        assert!(line.starts_with("pong from tapir-pop @ pop.example (version 0.3.1)"));
        assert!(line.ends_with("client: 127.0.0.1:5555"));
        assert!(line.contains("uptime: 1h30m0s time: 2024-05-01 12:00:00"));
    }
}
