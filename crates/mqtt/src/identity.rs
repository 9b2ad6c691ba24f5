//! Client certificate identity.
//!
//! The CLI's client certificate names the edge (its common name) and its
//! private key signs key uploads.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

use crate::error::{MqttError, Result};
use crate::jws::JwsHeader;
use crate::keys;

/// Certificate chain and key of the CLI
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// DER certificates, leaf first
    pub chain: Vec<Vec<u8>>,
    /// The certificate file as PEM text
    pub chain_pem: String,
    /// Common name of the leaf certificate
    pub common_name: String,
    /// Hex SHA-256 of the leaf certificate
    pub key_id: String,
    /// Private key matching the leaf certificate
    pub signing_key: SigningKey,
}

impl ClientIdentity {
    /// Load a PEM certificate chain and its PEM private key
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let file = File::open(cert_path).map_err(|e| MqttError::io(cert_path, e))?;
        let chain: Vec<Vec<u8>> = rustls_pemfile::certs(&mut BufReader::new(file))
            .map(|c| c.map(|der| der.to_vec()))
            .collect::<std::io::Result<_>>()
            .map_err(|e| MqttError::certificate(cert_path, e))?;

        let leaf = chain
            .first()
            .ok_or_else(|| MqttError::certificate(cert_path, "no certificates found"))?;

        let (_, cert) =
            X509Certificate::from_der(leaf).map_err(|e| MqttError::certificate(cert_path, e))?;
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .ok_or_else(|| MqttError::certificate(cert_path, "no common name in subject"))?
            .to_string();

        let key_id = hex::encode(Sha256::digest(leaf));
        let chain_pem = std::fs::read_to_string(cert_path).map_err(|e| MqttError::io(cert_path, e))?;
        let signing_key = keys::fetch_signing_key(key_path)?;

        Ok(Self {
            chain,
            chain_pem,
            common_name,
            key_id,
            signing_key,
        })
    }

    /// JWS header naming this identity (`kid` and `x5c`)
    pub fn jws_header(&self) -> JwsHeader {
        JwsHeader {
            kid: Some(self.key_id.clone()),
            x5c: Some(self.chain.iter().map(|der| STANDARD.encode(der)).collect()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn data(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
    }

    #[test]
    fn test_load_identity() {
        let id = ClientIdentity::load(&data("edge.crt"), &data("edge.key")).unwrap();
        assert_eq!(id.common_name, "edge-7f3a");
        assert_eq!(id.chain.len(), 1);
        assert_eq!(
            id.key_id,
            "76cf1841bb99b9dae74e58446acad6cd7a4b138d642eec64eeac33c7f651db40"
        );
        assert!(id.chain_pem.starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn test_jws_header_carries_chain() {
        let id = ClientIdentity::load(&data("edge.crt"), &data("edge-pkcs8.key")).unwrap();
        let header = id.jws_header();
        assert_eq!(header.kid.as_deref(), Some(id.key_id.as_str()));
        let x5c = header.x5c.unwrap();
        assert_eq!(STANDARD.decode(&x5c[0]).unwrap(), id.chain[0]);
    }

    #[test]
    fn test_key_file_is_not_a_certificate() {
        let err = ClientIdentity::load(&data("edge.key"), &data("edge.key")).unwrap_err();
        assert!(err.to_string().contains("no certificates found"));
    }
}
