//! Credential minting and constant-time comparison.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Prefix carried by every tenant api_key.
pub const API_KEY_PREFIX: &str = "eck_";

/// 33 random bytes encode to exactly 44 base64url characters, giving
/// 264 bits of entropy and a 48-character key with the prefix.
const API_KEY_RANDOM_BYTES: usize = 33;

/// Mint a fresh tenant api_key: `eck_` + 44 URL-safe characters.
pub fn generate_api_key() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; API_KEY_RANDOM_BYTES] = rand::Rng::random(&mut rng);
    format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Mint a fresh HMAC signing secret (32 random bytes, hex-encoded).
pub fn generate_hmac_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    hex::encode(bytes)
}

/// Domain-bound tenant identifier: hex SHA-256 of `domain ‖ tenant_id`.
/// Used as an anti-swap check when a tenant's site_url changes.
pub fn site_hash(domain: &str, tenant_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(tenant_id.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time equality. Length is not secret; contents are.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
