//! Client certificate locations

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default certificate name (files `<certdir>/tapir-cli.{key,crt}`)
pub const DEFAULT_CERT_NAME: &str = "tapir-cli";

/// Paths of a client key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertPaths {
    /// PEM private key
    pub key: PathBuf,
    /// PEM certificate (chain)
    pub cert: PathBuf,
}

/// The `certs` section
///
/// # Example
///
/// ```yaml
/// certs:
///   certdir: /etc/dnstapir/certs
///   cacertfile: /etc/dnstapir/certs/tapirCA.crt
///   certname: tapir-cli
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CertsConfig {
    /// Directory holding `<name>.key` and `<name>.crt`
    pub certdir: Option<PathBuf>,

    /// CA bundle used to verify the daemons
    pub cacertfile: Option<PathBuf>,

    /// Certificate name used by the CLI itself
    /// Default: tapir-cli
    pub certname: String,
}

impl Default for CertsConfig {
    fn default() -> Self {
        Self {
            certdir: None,
            cacertfile: None,
            certname: DEFAULT_CERT_NAME.to_string(),
        }
    }
}

impl CertsConfig {
    /// Key and certificate paths for `name` inside `certdir`
    pub fn client_cert(&self, name: &str) -> Result<ClientCertPaths> {
        let dir = self
            .certdir
            .as_ref()
            .ok_or_else(|| ConfigError::missing_key("certs.certdir"))?;
        Ok(ClientCertPaths {
            key: dir.join(format!("{name}.key")),
            cert: dir.join(format!("{name}.crt")),
        })
    }

    /// Key and certificate paths of the CLI's own certificate
    pub fn own_cert(&self) -> Result<ClientCertPaths> {
        self.client_cert(&self.certname)
    }
}
