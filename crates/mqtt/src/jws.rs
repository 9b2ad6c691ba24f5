//! Compact JWS with ES256.
//!
//! `BASE64URL(header) . BASE64URL(payload) . BASE64URL(r || s)`, no padding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{MqttError, Result};

/// Algorithm name for ECDSA P-256 with SHA-256
pub const ES256: &str = "ES256";

/// Protected header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Certificate chain, standard base64 DER, leaf first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
}

impl Default for JwsHeader {
    fn default() -> Self {
        Self {
            alg: ES256.to_string(),
            kid: None,
            x5c: None,
        }
    }
}

/// Sign `payload`, producing a compact token
pub fn sign(payload: &[u8], key: &SigningKey, header: &JwsHeader) -> Result<String> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let payload = URL_SAFE_NO_PAD.encode(payload);
    let signing_input = format!("{header}.{payload}");

    let signature: Signature = key.sign(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(signature.to_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify `token` and return its payload
pub fn verify(token: &str, key: &VerifyingKey) -> Result<Vec<u8>> {
    let token = token.trim();
    let parts = split(token)?;

    let header: JwsHeader = serde_json::from_slice(&decode_part(parts[0], "header")?)
        .map_err(|e| MqttError::Jws(format!("bad header: {e}")))?;
    if header.alg != ES256 {
        return Err(MqttError::Jws(format!("unsupported alg {}", header.alg)));
    }

    let signature = Signature::from_slice(&decode_part(parts[2], "signature")?)
        .map_err(|e| MqttError::Jws(format!("bad signature: {e}")))?;

    let signing_input = &token[..parts[0].len() + 1 + parts[1].len()];
    key.verify(signing_input.as_bytes(), &signature)
        .map_err(|_| MqttError::Jws("signature verification failed".to_string()))?;

    decode_part(parts[1], "payload")
}

/// Payload of `token` without checking the signature
///
/// Returns `None` when `token` is not a compact JWS.
pub fn peek_payload(token: &[u8]) -> Option<Vec<u8>> {
    let token = std::str::from_utf8(token).ok()?.trim();
    let parts = split(token).ok()?;
    let header = decode_part(parts[0], "header").ok()?;
    serde_json::from_slice::<JwsHeader>(&header).ok()?;
    decode_part(parts[1], "payload").ok()
}

fn split(token: &str) -> Result<[&str; 3]> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) => Ok([h, p, s]),
        _ => Err(MqttError::Jws("not a compact JWS".to_string())),
    }
}

fn decode_part(part: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| MqttError::Jws(format!("bad {what} encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_slice(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let key = key();
        let token = sign(br#"{"Msg":"hello"}"#, &key, &JwsHeader::default()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));

        let payload = verify(&token, key.verifying_key()).unwrap();
        assert_eq!(payload, br#"{"Msg":"hello"}"#);
    }

    #[test]
    fn test_header_fields() {
        let header = JwsHeader {
            kid: Some("abc".to_string()),
            x5c: Some(vec!["MIIB".to_string()]),
            ..Default::default()
        };
        let token = sign(b"x", &key(), &header).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(token.split('.').next().unwrap()).unwrap();
        let decoded: JwsHeader = serde_json::from_slice(&raw).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let key = key();
        let token = sign(b"original", &key, &JwsHeader::default()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(b"forged"), parts[2]);

        let err = verify(&forged, key.verifying_key()).unwrap_err();
        assert!(err.to_string().contains("verification failed"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = sign(b"payload", &key(), &JwsHeader::default()).unwrap();
        let other = SigningKey::from_slice(&[9u8; 32]).unwrap();
        assert!(verify(&token, other.verifying_key()).is_err());
    }

    #[test]
    fn test_malformed_tokens() {
        let key = key();
        assert!(verify("only.two", key.verifying_key()).is_err());
        assert!(verify("a.b.c.d", key.verifying_key()).is_err());
        assert!(verify("!!.??.**", key.verifying_key()).is_err());
    }

    #[test]
    fn test_peek_payload() {
        let token = sign(b"{}", &key(), &JwsHeader::default()).unwrap();
        assert_eq!(peek_payload(token.as_bytes()).unwrap(), b"{}");
        assert!(peek_payload(br#"{"Msg":"plain json"}"#).is_none());
    }
}
