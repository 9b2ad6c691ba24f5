//! P-256 key loading.
//!
//! Signing keys may be PKCS#8 (`BEGIN PRIVATE KEY`) or SEC1
//! (`BEGIN EC PRIVATE KEY`); validator keys are SPKI (`BEGIN PUBLIC KEY`).

use std::path::Path;

use p256::SecretKey;
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use tracing::debug;

use crate::error::{MqttError, Result};

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| MqttError::io(path, e))
}

/// Parse a PEM private key
pub fn parse_signing_key(pem: &str) -> std::result::Result<SigningKey, String> {
    if let Ok(key) = SigningKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    SecretKey::from_sec1_pem(pem)
        .map(SigningKey::from)
        .map_err(|e| format!("not a PKCS#8 or SEC1 P-256 private key ({e})"))
}

/// Load the private key used to sign messages on a topic
pub fn fetch_signing_key(path: &Path) -> Result<SigningKey> {
    let key = parse_signing_key(&read_pem(path)?).map_err(|e| MqttError::key(path, e))?;
    debug!(path = %path.display(), "loaded signing key");
    Ok(key)
}

/// Load the public key used to validate messages on a topic
pub fn fetch_validator_key(path: &Path) -> Result<VerifyingKey> {
    let key = VerifyingKey::from_public_key_pem(&read_pem(path)?)
        .map_err(|e| MqttError::key(path, format!("not a P-256 public key ({e})")))?;
    debug!(path = %path.display(), "loaded validator key");
    Ok(key)
}
