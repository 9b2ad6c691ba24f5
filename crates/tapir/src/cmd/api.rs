//! API command - List the endpoints TAPIR-POP serves
//!
//! # Usage
//!
//! ```bash
//! tapir-cli api
//! ```

use anyhow::{Context as _, Result};
use clap::Args;
use tapir_protocol::ShowApiResponse;

use crate::context::Context;

/// API command arguments
#[derive(Args, Debug)]
pub struct ApiArgs {}

pub async fn run(ctx: &Context, _args: ApiArgs) -> Result<()> {
    let api = ctx.pop_api()?;
    let resp = api
        .show_api()
        .await
        .context("failed to fetch the API summary from TAPIR-POP")?;
    ctx.dump("Show API response", &resp);

    println!("{}", render_api(&resp));
    Ok(())
}

/// Message line followed by one line per endpoint
pub fn render_api(resp: &ShowApiResponse) -> String {
    let mut lines = Vec::with_capacity(resp.data.len() + 1);
    if !resp.msg.is_empty() {
        lines.push(resp.msg.clone());
    }
    lines.extend(resp.data.iter().cloned());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_api() {
        let resp = ShowApiResponse {
            status: 200,
            msg: "TAPIR-POP API".to_string(),
            data: vec![
                "/ping".to_string(),
                "/command".to_string(),
                "/debug".to_string(),
            ],
        };
        assert_eq!(render_api(&resp), "TAPIR-POP API\n/ping\n/command\n/debug");
    }

    #[test]
    fn test_render_api_without_msg() {
        let resp = ShowApiResponse {
            data: vec!["/ping".to_string()],
            ..Default::default()
        };
        assert_eq!(render_api(&resp), "/ping");
    }
}
