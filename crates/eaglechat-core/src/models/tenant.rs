//! Tenant domain model.
//!
//! A tenant is one onboarded WordPress site — the primary principal.
//! Credentials are immutable after registration except via explicit
//! rotation; secrets are stored sealed and only the vault can open
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent tenant record, the root aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Opaque bearer credential, `eck_`-prefixed. Secret.
    pub api_key: String,
    /// Absolute URL of the tenant site, unique among active tenants.
    pub site_url: String,
    /// Unique among active tenants.
    pub admin_email: String,
    /// Normalized host (lowercase, port only if non-default).
    pub domain: String,
    /// Hex SHA-256 of `domain ‖ tenant_id`; anti-swap check.
    pub site_hash: String,
    /// Sealed HMAC secret; present iff request signing is configured.
    pub hmac_secret_sealed: Option<String>,
    pub hmac_secret_updated_at: Option<DateTime<Utc>>,
    pub anthropic_key_sealed: Option<String>,
    pub openai_key_sealed: Option<String>,
    pub provider_keys_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Touched on every successful credential validation.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Soft-delete flag; inactive tenants are skipped by all lookups.
    pub is_active: bool,
    /// Arbitrary key-value metadata.
    pub metadata: serde_json::Value,
}

/// Transient draft held by the registration coordinator until insert
/// succeeds. Credentials are minted before this is built, never after.
#[derive(Debug, Clone)]
pub struct TenantDraft {
    pub id: Uuid,
    pub api_key: String,
    pub site_url: String,
    pub admin_email: String,
    pub domain: String,
    pub site_hash: String,
    pub metadata: Option<serde_json::Value>,
}

/// Everything the request verifier needs for one tenant.
#[derive(Debug, Clone)]
pub struct HmacContext {
    pub sealed_secret: String,
    pub domain: String,
    pub site_hash: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sealed provider keys as stored; `None` means not configured.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub anthropic_sealed: Option<String>,
    pub openai_sealed: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
