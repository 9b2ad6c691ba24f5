//! MQTT broker and topic configuration (the `tapir` section)

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Broker connection settings
///
/// # Example
///
/// ```yaml
/// tapir:
///   mqtt:
///     server: tls://mqtt.dev.dnstapir.se:8883
///     clientcert: /etc/dnstapir/certs/mqttclient.crt
///     clientkey: /etc/dnstapir/certs/mqttclient-key.pem
///     cacert: /etc/dnstapir/certs/tapirCA.crt
///     qos: 2
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL (`tcp://`, `mqtt://`, `ssl://`, `tls://` or `mqtts://`)
    pub server: String,

    /// Client certificate for mutual TLS
    pub clientcert: Option<PathBuf>,

    /// Client private key for mutual TLS
    pub clientkey: Option<PathBuf>,

    /// CA bundle used to verify the broker
    pub cacert: Option<PathBuf>,

    /// Quality of service for publish and subscribe
    /// Default: 2
    pub qos: u8,

    /// Keepalive interval in seconds
    /// Default: 30
    pub keepalive: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            clientcert: None,
            clientkey: None,
            cacert: None,
            qos: 2,
            keepalive: 30,
        }
    }
}

impl MqttConfig {
    /// The broker URL, or an error if unset
    pub fn require_server(&self) -> Result<&str> {
        if self.server.is_empty() {
            return Err(ConfigError::missing_key("tapir.mqtt.server"));
        }
        Ok(&self.server)
    }
}

/// One topic the CLI publishes to or subscribes on
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Topic name (may contain `{EdgeId}`)
    pub topic: String,

    /// Private key used to sign outgoing messages
    pub signingkey: Option<PathBuf>,

    /// Public key used to validate incoming messages
    pub validatorkey: Option<PathBuf>,

    /// Source name put into outgoing observations
    pub srcname: String,
}

/// The configured topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Global configuration (retained)
    Config,
    /// Observations from edges
    Observations,
    /// Component status reports
    Status,
    /// Public key uploads
    KeyUpload,
}

impl TopicKind {
    /// All kinds, in display order
    pub const ALL: [TopicKind; 4] = [
        TopicKind::Config,
        TopicKind::Observations,
        TopicKind::Status,
        TopicKind::KeyUpload,
    ];

    /// Config key name of this kind
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Observations => "observations",
            Self::Status => "status",
            Self::KeyUpload => "keyupload",
        }
    }

    /// Dotted config key for a field of this topic
    pub fn key(self, field: &str) -> String {
        format!("tapir.{}.{}", self.as_str(), field)
    }
}

impl std::fmt::Display for TopicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TopicKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "config" => Ok(Self::Config),
            "observations" => Ok(Self::Observations),
            "status" => Ok(Self::Status),
            "keyupload" => Ok(Self::KeyUpload),
            other => Err(ConfigError::invalid_value(
                "topic",
                format!(
                    "unknown topic type '{other}' (expected config, observations, status or keyupload)"
                ),
            )),
        }
    }
}

/// The `tapir` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TapirConfig {
    /// Broker connection
    pub mqtt: MqttConfig,
    /// Global config topic
    pub config: TopicConfig,
    /// Observations topic
    pub observations: TopicConfig,
    /// Status topic
    pub status: TopicConfig,
    /// Key upload topic
    pub keyupload: TopicConfig,
}

impl TapirConfig {
    /// Settings of one topic
    pub fn topic(&self, kind: TopicKind) -> &TopicConfig {
        match kind {
            TopicKind::Config => &self.config,
            TopicKind::Observations => &self.observations,
            TopicKind::Status => &self.status,
            TopicKind::KeyUpload => &self.keyupload,
        }
    }

    /// Topic name for `kind`, or an error if unset
    pub fn require_topic(&self, kind: TopicKind) -> Result<&str> {
        let topic = &self.topic(kind).topic;
        if topic.is_empty() {
            return Err(ConfigError::missing_key(kind.key("topic")));
        }
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mqtt_defaults() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.qos, 2);
        assert_eq!(mqtt.keepalive, 30);
        assert!(mqtt.require_server().is_err());
    }

    #[test]
    fn test_topic_kind_parse() {
        for kind in TopicKind::ALL {
            assert_eq!(kind.as_str().parse::<TopicKind>().unwrap(), kind);
        }
        let err = "telemetry".parse::<TopicKind>().unwrap_err();
        assert!(err.to_string().contains("unknown topic type 'telemetry'"));
    }

    #[test]
    fn test_topic_lookup() {
        let yaml = r#"
mqtt:
  server: tls://broker:8883
observations:
  topic: events/up/{EdgeId}/observations
  validatorkey: /etc/dnstapir/certs/validate.pem
status:
  topic: status/up/axfr/tapir-pop
  signingkey: /etc/dnstapir/certs/sign.key
"#;
        let tapir: TapirConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            tapir.require_topic(TopicKind::Observations).unwrap(),
            "events/up/{EdgeId}/observations"
        );
        assert!(tapir.topic(TopicKind::Status).signingkey.is_some());
        assert!(tapir.topic(TopicKind::Status).validatorkey.is_none());

        let err = tapir.require_topic(TopicKind::KeyUpload).unwrap_err();
        assert_eq!(err.to_string(), "missing config key: tapir.keyupload.topic");
    }
}
