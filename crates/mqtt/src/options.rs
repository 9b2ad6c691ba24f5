//! Broker connection options.

use std::path::Path;
use std::time::Duration;

use rumqttc::{MqttOptions, QoS, TlsConfiguration, Transport};
use tapir_config::{ConfigError, MqttConfig};
use url::Url;

use crate::error::{MqttError, Result};

/// Largest packet accepted or sent (observation batches can be large)
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Map a configured QoS level to rumqttc's enum
pub fn qos(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Build rumqttc options from the `tapir.mqtt` section
///
/// `tcp://` and `mqtt://` connect in the clear (default port 1883);
/// `ssl://`, `tls://` and `mqtts://` use TLS (default port 8883) with the
/// configured CA and, when both are set, the client certificate and key.
pub fn mqtt_options(client_id: &str, config: &MqttConfig) -> Result<MqttOptions> {
    let server = config.require_server()?;
    let invalid = |message: &str| MqttError::InvalidServer {
        server: server.to_string(),
        message: message.to_string(),
    };

    let url = Url::parse(server).map_err(|e| invalid(&e.to_string()))?;
    let tls = match url.scheme() {
        "tcp" | "mqtt" => false,
        "ssl" | "tls" | "mqtts" => true,
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    };
    let host = url.host_str().ok_or_else(|| invalid("no host"))?;
    let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

    let mut options = MqttOptions::new(client_id, host, port);
    options
        .set_keep_alive(Duration::from_secs(config.keepalive.max(1)))
        .set_clean_session(true)
        .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

    if tls {
        let cacert = config
            .cacert
            .as_deref()
            .ok_or_else(|| ConfigError::missing_key("tapir.mqtt.cacert"))?;
        let client_auth = match (&config.clientcert, &config.clientkey) {
            (Some(cert), Some(key)) => Some((read(cert)?, read(key)?)),
            (Some(_), None) => return Err(ConfigError::missing_key("tapir.mqtt.clientkey").into()),
            (None, Some(_)) => return Err(ConfigError::missing_key("tapir.mqtt.clientcert").into()),
            (None, None) => None,
        };
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca: read(cacert)?,
            alpn: None,
            client_auth,
        }));
    }

    Ok(options)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| MqttError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(server: &str) -> MqttConfig {
        MqttConfig {
            server: server.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_default_port() {
        let options = mqtt_options("tapir-cli-1", &config("tcp://broker.example")).unwrap();
        assert_eq!(options.broker_address(), ("broker.example".to_string(), 1883));
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.clean_session());
    }

    #[test]
    fn test_tls_needs_cacert() {
        let err = mqtt_options("c", &config("tls://broker:8883")).unwrap_err();
        assert_eq!(err.to_string(), "missing config key: tapir.mqtt.cacert");
    }

    #[test]
    fn test_tls_with_client_cert() {
        let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data");
        let mut cfg = config("mqtts://broker");
        cfg.cacert = Some(data.join("edge.crt"));
        cfg.clientcert = Some(data.join("edge.crt"));
        cfg.clientkey = Some(data.join("edge.key"));
        let options = mqtt_options("c", &cfg).unwrap();
        assert_eq!(options.broker_address().1, 8883);
        assert!(matches!(options.transport(), Transport::Tls(_)));
    }

    #[test]
    fn test_half_client_auth_rejected() {
        let mut cfg = config("ssl://broker:8883");
        cfg.cacert = Some(PathBuf::from("/etc/dnstapir/certs/tapirCA.crt"));
        cfg.clientcert = Some(PathBuf::from("/etc/dnstapir/certs/mqtt.crt"));
        let err = mqtt_options("c", &cfg).unwrap_err();
        assert!(err.to_string().contains("tapir.mqtt.clientkey"));
    }

    #[test]
    fn test_bad_scheme_and_missing_server() {
        assert!(matches!(
            mqtt_options("c", &config("http://broker")),
            Err(MqttError::InvalidServer { .. })
        ));
        assert!(matches!(
            mqtt_options("c", &MqttConfig::default()),
            Err(MqttError::Config(_))
        ));
    }

    #[test]
    fn test_qos_levels() {
        assert_eq!(qos(0), QoS::AtMostOnce);
        assert_eq!(qos(1), QoS::AtLeastOnce);
        assert_eq!(qos(2), QoS::ExactlyOnce);
    }
}
