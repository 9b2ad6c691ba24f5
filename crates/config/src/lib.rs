//! TAPIR CLI Configuration
//!
//! YAML configuration with environment overrides. Every section is optional;
//! a command that needs a key that is not set fails with
//! [`ConfigError::MissingKey`] naming it.
//!
//! # Parsing
//!
//! ```
//! use tapir_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("cli:\n  tapir-pop:\n    url: http://127.0.0.1:9099/api/v1\n").unwrap();
//! assert_eq!(config.cli.tapir_pop.url, "http://127.0.0.1:9099/api/v1");
//! ```
//!
//! # Example Config
//!
//! ```yaml
//! cli:
//!   tapir-pop:
//!     url: http://127.0.0.1:9099/api/v1
//!     tlsurl: https://127.0.0.1:9098/api/v1
//!     apikey: be-vewy-vewy-quiet
//!   tapir-slogger:
//!     tlsurl: https://127.0.0.1:9398/api/v1
//!     apikey: be-vewy-vewy-quiet
//! certs:
//!   certdir: /etc/dnstapir/certs
//!   cacertfile: /etc/dnstapir/certs/tapirCA.crt
//! tapir:
//!   mqtt:
//!     server: tls://mqtt.dev.dnstapir.se:8883
//!   observations:
//!     topic: events/up/{EdgeId}/observations
//!     signingkey: /etc/dnstapir/certs/mqttsigner-key.pem
//! log:
//!   level: warn
//! ```

mod certs;
mod env;
mod error;
mod logging;
mod server;
mod sources;
mod tapir;
mod validation;

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use certs::{CertsConfig, ClientCertPaths, DEFAULT_CERT_NAME};
pub use env::ENV_PREFIX;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};
pub use server::{CliConfig, DEFAULT_SOURCES_FILE, ServerConfig, Service};
pub use sources::{SourceConf, parse_sources, parse_sources_str};
pub use tapir::{MqttConfig, TapirConfig, TopicConfig, TopicKind};

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "/etc/dnstapir/tapir-cli.yaml";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daemon endpoints
    pub cli: CliConfig,

    /// Client certificates
    pub certs: CertsConfig,

    /// MQTT broker and topics
    pub tapir: TapirConfig,

    /// Logging
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load from a file, then apply `TAPIR_CLI_*` variables from the process
    /// environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn parse(s: &str) -> Result<Self> {
        // serde_yaml turns an empty document into a unit, not an empty map
        let config: Config = if s.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(s)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert!(config.cli.tapir_pop.url.is_empty());
        assert_eq!(config.cli.sources, DEFAULT_SOURCES_FILE);
        assert_eq!(config.certs.certname, DEFAULT_CERT_NAME);
        assert_eq!(config.tapir.mqtt.qos, 2);
        assert_eq!(config.log.level, LogLevel::Warn);
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
cli:
  tapir-pop:
    url: http://127.0.0.1:9099/api/v1
    tlsurl: https://127.0.0.1:9098/api/v1
    apikey: be-vewy-vewy-quiet
  tapir-slogger:
    tlsurl: https://127.0.0.1:9398/api/v1
  sources: /tmp/sources.yaml
certs:
  certdir: /etc/dnstapir/certs
  cacertfile: /etc/dnstapir/certs/tapirCA.crt
  certname: ops
tapir:
  mqtt:
    server: tls://broker:8883
    qos: 1
    keepalive: 10
  config:
    topic: config/down/tapir-pop/global
    signingkey: /etc/dnstapir/certs/config-key.pem
  status:
    topic: status/up/axfr/tapir-pop
  keyupload:
    topic: keys/up/{EdgeId}/pubkey
log:
  level: info
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.cli.tapir_pop.apikey, "be-vewy-vewy-quiet");
        assert_eq!(
            config.cli.tapir_slogger.base_url(Service::Slogger, true).unwrap(),
            "https://127.0.0.1:9398/api/v1"
        );
        assert_eq!(config.cli.sources, "/tmp/sources.yaml");
        assert_eq!(config.certs.certname, "ops");
        assert_eq!(config.tapir.mqtt.qos, 1);
        assert_eq!(config.tapir.mqtt.keepalive, 10);
        assert_eq!(
            config.tapir.require_topic(TopicKind::KeyUpload).unwrap(),
            "keys/up/{EdgeId}/pubkey"
        );
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Config::from_str("cli: [unterminated");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "certs:\n  certdir: /srv/certs").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        let paths = config.certs.own_cert().unwrap();
        assert_eq!(paths.cert, Path::new("/srv/certs/tapir-cli.crt"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/tapir-cli.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tapir-cli.yaml"));
    }
}
