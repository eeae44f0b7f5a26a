//! Database-specific error types and conversions.

use eaglechat_core::{DuplicateKind, Error};

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("statement failed: {0}")]
    Statement(String),

    #[error("row decode failed: {0}")]
    Decode(String),

    #[error("record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write; `kind` names the invariant.
    #[error("uniqueness violation on {0}")]
    Duplicate(DuplicateKind),
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => Error::NotFound { entity, id },
            DbError::Duplicate(kind) => Error::DuplicateTenant(kind),
            other => Error::StoreUnavailable(other.to_string()),
        }
    }
}

/// Whether a SurrealDB statement error is any uniqueness violation:
/// a duplicate record id or a unique index rejection.
pub(crate) fn is_unique_violation(message: &str) -> bool {
    message.contains("already exists") || message.contains("already contains")
}

/// Map a SurrealDB statement error onto the uniqueness invariant it
/// violated, if any. Index names are ours, so string matching is
/// stable.
pub(crate) fn classify_duplicate(message: &str) -> Option<DuplicateKind> {
    if message.contains("idx_tenant_site_url") {
        Some(DuplicateKind::Site)
    } else if message.contains("idx_tenant_admin_email") {
        Some(DuplicateKind::Email)
    } else if message.contains("idx_tenant_api_key") {
        Some(DuplicateKind::ApiKey)
    } else if message.contains("already exists") {
        // Record-id collision on CREATE type::record('tenant', ...).
        Some(DuplicateKind::Id)
    } else {
        None
    }
}
