//! Environment variable overrides
//!
//! `TAPIR_CLI_*` variables replace the matching config keys after the file
//! has been read.

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::logging::LogLevel;
use crate::server::Service;

/// Prefix shared by all override variables
pub const ENV_PREFIX: &str = "TAPIR_CLI_";

impl Config {
    /// Apply overrides looked up through `lookup`
    ///
    /// `lookup` receives the full variable name (e.g. `TAPIR_CLI_POP_URL`).
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|v| !v.is_empty())
        };

        for (service, prefix) in [(Service::Pop, "POP"), (Service::Slogger, "SLOGGER")] {
            let server = self.cli.server_mut(service);
            if let Some(v) = get(&format!("{prefix}_URL")) {
                server.url = v;
            }
            if let Some(v) = get(&format!("{prefix}_TLSURL")) {
                server.tlsurl = v;
            }
            if let Some(v) = get(&format!("{prefix}_APIKEY")) {
                server.apikey = v;
            }
        }

        if let Some(v) = get("CERTDIR") {
            self.certs.certdir = Some(v.into());
        }
        if let Some(v) = get("MQTT_SERVER") {
            self.tapir.mqtt.server = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log.level = LogLevel::parse(&v).ok_or_else(|| {
                ConfigError::invalid_value(
                    format!("{ENV_PREFIX}LOG_LEVEL"),
                    format!("unknown level '{v}'"),
                )
            })?;
        }

        self.validate()
    }
}
