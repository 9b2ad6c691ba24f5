//! Daemon endpoints
//!
//! Each daemon the CLI talks to has a plain URL, a TLS URL and an API key.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default path of the TAPIR-POP sources file
pub const DEFAULT_SOURCES_FILE: &str = "/etc/dnstapir/tapir-pop-sources.yaml";

/// Daemons reachable over the HTTP API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// TAPIR-POP, the policy processor
    Pop,
    /// TAPIR-Slogger, the status logger
    Slogger,
}

impl Service {
    /// Name of the service as used in config keys
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pop => "tapir-pop",
            Self::Slogger => "tapir-slogger",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection settings for one daemon
///
/// # Example
///
/// ```yaml
/// url: http://127.0.0.1:9099/api/v1
/// tlsurl: https://127.0.0.1:9098/api/v1
/// apikey: be-vewy-vewy-quiet
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Plain HTTP base URL
    pub url: String,
    /// HTTPS base URL, used when TLS is enabled
    pub tlsurl: String,
    /// Value of the X-API-Key header
    pub apikey: String,
}

impl ServerConfig {
    /// Base URL to use for `service`
    ///
    /// Picks `tlsurl` when TLS is on, otherwise `url`.
    pub fn base_url(&self, service: Service, use_tls: bool) -> Result<&str> {
        let (url, key) = if use_tls {
            (&self.tlsurl, "tlsurl")
        } else {
            (&self.url, "url")
        };
        if url.is_empty() {
            return Err(ConfigError::missing_key(format!("cli.{service}.{key}")));
        }
        Ok(url)
    }
}

/// The `cli` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// TAPIR-POP endpoints
    #[serde(rename = "tapir-pop")]
    pub tapir_pop: ServerConfig,

    /// TAPIR-Slogger endpoints
    #[serde(rename = "tapir-slogger")]
    pub tapir_slogger: ServerConfig,

    /// TAPIR-POP sources file (lists greylist sources and bootstrap servers)
    /// Default: /etc/dnstapir/tapir-pop-sources.yaml
    pub sources: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            tapir_pop: ServerConfig::default(),
            tapir_slogger: ServerConfig::default(),
            sources: DEFAULT_SOURCES_FILE.to_string(),
        }
    }
}

impl CliConfig {
    /// Endpoints for `service`
    pub fn server(&self, service: Service) -> &ServerConfig {
        match service {
            Service::Pop => &self.tapir_pop,
            Service::Slogger => &self.tapir_slogger,
        }
    }

    pub(crate) fn server_mut(&mut self, service: Service) -> &mut ServerConfig {
        match service {
            Service::Pop => &mut self.tapir_pop,
            Service::Slogger => &mut self.tapir_slogger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_prefers_tls() {
        let server = ServerConfig {
            url: "http://pop:9099".to_string(),
            tlsurl: "https://pop:9098".to_string(),
            apikey: String::new(),
        };
        assert_eq!(server.base_url(Service::Pop, true).unwrap(), "https://pop:9098");
        assert_eq!(server.base_url(Service::Pop, false).unwrap(), "http://pop:9099");
    }

    #[test]
    fn test_missing_tlsurl_names_key() {
        let server = ServerConfig {
            url: "http://slogger:9099".to_string(),
            ..Default::default()
        };
        let err = server.base_url(Service::Slogger, true).unwrap_err();
        assert_eq!(err.to_string(), "missing config key: cli.tapir-slogger.tlsurl");
    }

    #[test]
    fn test_deserialize_dashed_keys() {
        let yaml = r#"
tapir-pop:
  url: http://pop
  apikey: secret
tapir-slogger:
  tlsurl: https://slogger
"#;
        let cli: CliConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cli.server(Service::Pop).url, "http://pop");
        assert_eq!(cli.server(Service::Pop).apikey, "secret");
        assert_eq!(cli.server(Service::Slogger).tlsurl, "https://slogger");
        assert_eq!(cli.sources, DEFAULT_SOURCES_FILE);
    }
}
