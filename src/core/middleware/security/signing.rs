//! Canonical serialization and request signing. Signing always happens on
//! the *redacted* payload — the signature proves what actually left the
//! process, not what the caller originally typed.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::error::{ConfigError, Result};

/// Deterministic JSON: object keys sorted, no insignificant whitespace.
/// `serde_json::Value`'s default `Map` is already key-ordered
/// (`preserve_order` is not enabled), so a plain compact `to_string` is
/// already canonical for every value this crate signs.
pub fn canonicalize(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut sorted_map = serde_json::Map::new();
                for (k, v) in entries {
                    sorted_map.insert(k.clone(), sorted(v));
                }
                Value::Object(sorted_map)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sorted(value)).expect("canonical value always serializes")
}

type HmacSha256 = Hmac<Sha256>;

pub fn sign_hmac_sha256(key: &[u8], payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ConfigError::new(format!("invalid HMAC signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(feature = "ecdsa-signing")]
pub fn sign_ecdsa_p256(key: &[u8], payload: &str) -> Result<String> {
    use p256::ecdsa::{signature::Signer, Signature, SigningKey};

    let signing_key = SigningKey::from_slice(key)
        .map_err(|e| ConfigError::new(format!("invalid ECDSA P-256 signing key: {e}")))?;
    let signature: Signature = signing_key.sign(payload.as_bytes());
    Ok(hex::encode(signature.to_bytes()))
}

#[cfg(not(feature = "ecdsa-signing"))]
pub fn sign_ecdsa_p256(_key: &[u8], _payload: &str) -> Result<String> {
    Err(ConfigError::new(
        "ECDSA P-256 signing was requested but this build was compiled without the \
         `ecdsa-signing` feature",
    )
    .into())
}
