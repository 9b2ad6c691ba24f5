//! Configuration validation
//!
//! Only values that are set are checked; whether a key is required depends
//! on the command and is reported when the command asks for it.

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::server::Service;

/// URL schemes accepted for the broker
const MQTT_SCHEMES: &[&str] = &["tcp", "mqtt", "ssl", "tls", "mqtts"];

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_servers(config)?;
    validate_mqtt(config)?;
    Ok(())
}

fn validate_servers(config: &Config) -> Result<()> {
    for service in [Service::Pop, Service::Slogger] {
        let server = config.cli.server(service);
        check_http_url(&format!("cli.{service}.url"), &server.url)?;
        check_http_url(&format!("cli.{service}.tlsurl"), &server.tlsurl)?;
    }
    Ok(())
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::invalid_value(
        field,
        format!("'{url}' must start with http:// or https://"),
    ))
}

fn validate_mqtt(config: &Config) -> Result<()> {
    let mqtt = &config.tapir.mqtt;

    if mqtt.qos > 2 {
        return Err(ConfigError::invalid_value(
            "tapir.mqtt.qos",
            format!("{} is not 0, 1 or 2", mqtt.qos),
        ));
    }

    if !mqtt.server.is_empty() {
        let scheme = mqtt.server.split_once("://").map(|(s, _)| s);
        if !scheme.is_some_and(|s| MQTT_SCHEMES.contains(&s)) {
            return Err(ConfigError::invalid_value(
                "tapir.mqtt.server",
                format!(
                    "'{}' must use one of the schemes {}",
                    mqtt.server,
                    MQTT_SCHEMES.join(", ")
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Config;
    use std::str::FromStr;

    #[test]
    fn test_qos_out_of_range() {
        let err = Config::from_str("tapir:\n  mqtt:\n    qos: 3\n").unwrap_err();
        assert!(err.to_string().contains("tapir.mqtt.qos"));
    }

    #[test]
    fn test_qos_in_range() {
        for qos in 0..=2 {
            let yaml = format!("tapir:\n  mqtt:\n    qos: {qos}\n");
            assert!(Config::from_str(&yaml).is_ok());
        }
    }

    #[test]
    fn test_bad_url_scheme() {
        let yaml = "cli:\n  tapir-pop:\n    url: ftp://pop\n";
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("cli.tapir-pop.url"));
    }

    #[test]
    fn test_mqtt_schemes() {
        for server in ["tcp://b:1883", "mqtt://b", "ssl://b:8883", "tls://b:8883", "mqtts://b"] {
            let yaml = format!("tapir:\n  mqtt:\n    server: {server}\n");
            assert!(Config::from_str(&yaml).is_ok(), "{server} should be accepted");
        }
        for server in ["http://b", "broker:1883"] {
            let yaml = format!("tapir:\n  mqtt:\n    server: \"{server}\"\n");
            assert!(Config::from_str(&yaml).is_err(), "{server} should be rejected");
        }
    }
}
