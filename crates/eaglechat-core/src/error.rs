//! Error taxonomy for the EagleChat gateway.
//!
//! Variants are kinds, not transport codes: the server crate owns the
//! mapping to HTTP. Signing failures carry no detail about which check
//! tripped; that detail is logged, never returned.

use thiserror::Error;

use crate::models::provider::Provider;

/// Which uniqueness invariant a conflicting registration tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Site,
    Email,
    Id,
    ApiKey,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DuplicateKind::Site => "site_url",
            DuplicateKind::Email => "admin_email",
            DuplicateKind::Id => "tenant_id",
            DuplicateKind::ApiKey => "api_key",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("tenant already registered: {0} conflicts")]
    DuplicateTenant(DuplicateKind),

    #[error("callback verification failed after {attempts} attempt(s): {reason}")]
    CallbackFailed { reason: String, attempts: u32 },

    /// Tenant/api_key mismatch. Deliberately field-free.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("request signature mismatch")]
    BadSignature,

    #[error("request timestamp outside freshness window")]
    StaleTimestamp,

    #[error("HMAC secret not configured for tenant")]
    HmacNotConfigured,

    #[error("{0} rejected the supplied API key")]
    InvalidProviderKey(Provider),

    #[error("{0} key validation probe unavailable")]
    ProbeUnavailable(Provider),

    #[error("no {0} API key configured for tenant")]
    NoProviderKey(Provider),

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// Sealed ciphertext failed authentication. Never caused by caller
    /// input; indicates tampering or a master-key mismatch.
    #[error("sealed value failed integrity check")]
    SealIntegrity,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
