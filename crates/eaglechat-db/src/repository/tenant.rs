//! SurrealDB implementation of [`TenantRepository`].
//!
//! Uniqueness is enforced by the schema's unique indexes; this module
//! only classifies the resulting violations. Every read filters
//! `is_active = true` so deactivated tenants are invisible.

use chrono::{DateTime, Utc};
use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::provider::Provider;
use eaglechat_core::models::tenant::{HmacContext, ProviderKeys, Tenant, TenantDraft};
use eaglechat_core::repository::TenantRepository;
use subtle::ConstantTimeEq;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify_duplicate};

/// Same length and prefix as a real api_key; compared against the
/// candidate when the tenant row is absent so the miss path costs the
/// same as the hit path.
const DUMMY_API_KEY: &str = "eck_00000000000000000000000000000000000000000000";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    api_key: String,
    site_url: String,
    admin_email: String,
    domain: String,
    site_hash: String,
    hmac_secret_sealed: Option<String>,
    hmac_secret_updated_at: Option<DateTime<Utc>>,
    anthropic_key_sealed: Option<String>,
    openai_key_sealed: Option<String>,
    provider_keys_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_seen_at: Option<DateTime<Utc>>,
    is_active: bool,
    metadata: serde_json::Value,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Tenant {
        Tenant {
            id,
            api_key: self.api_key,
            site_url: self.site_url,
            admin_email: self.admin_email,
            domain: self.domain,
            site_hash: self.site_hash,
            hmac_secret_sealed: self.hmac_secret_sealed,
            hmac_secret_updated_at: self.hmac_secret_updated_at,
            anthropic_key_sealed: self.anthropic_key_sealed,
            openai_key_sealed: self.openai_key_sealed,
            provider_keys_updated_at: self.provider_keys_updated_at,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
            is_active: self.is_active,
            metadata: self.metadata,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    api_key: String,
    site_url: String,
    admin_email: String,
    domain: String,
    site_hash: String,
    hmac_secret_sealed: Option<String>,
    hmac_secret_updated_at: Option<DateTime<Utc>>,
    anthropic_key_sealed: Option<String>,
    openai_key_sealed: Option<String>,
    provider_keys_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_seen_at: Option<DateTime<Utc>>,
    is_active: bool,
    metadata: serde_json::Value,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> std::result::Result<Tenant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid tenant UUID: {e}")))?;
        Ok(Tenant {
            id,
            api_key: self.api_key,
            site_url: self.site_url,
            admin_email: self.admin_email,
            domain: self.domain,
            site_hash: self.site_hash,
            hmac_secret_sealed: self.hmac_secret_sealed,
            hmac_secret_updated_at: self.hmac_secret_updated_at,
            anthropic_key_sealed: self.anthropic_key_sealed,
            openai_key_sealed: self.openai_key_sealed,
            provider_keys_updated_at: self.provider_keys_updated_at,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
            is_active: self.is_active,
            metadata: self.metadata,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ApiKeyRow {
    api_key: String,
}

#[derive(Debug, SurrealValue)]
struct HmacRow {
    hmac_secret_sealed: Option<String>,
    domain: String,
    site_hash: String,
    hmac_secret_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct ProviderKeyRow {
    anthropic_key_sealed: Option<String>,
    openai_key_sealed: Option<String>,
    provider_keys_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    fn not_found(id: Uuid) -> DbError {
        DbError::NotFound {
            entity: "tenant".into(),
            id: id.to_string(),
        }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn register(&self, draft: TenantDraft) -> Result<Tenant> {
        let id = draft.id;
        let id_str = id.to_string();
        let metadata = draft
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 api_key = $api_key, \
                 site_url = $site_url, \
                 admin_email = $admin_email, \
                 domain = $domain, \
                 site_hash = $site_hash, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("api_key", draft.api_key))
            .bind(("site_url", draft.site_url))
            .bind(("admin_email", draft.admin_email))
            .bind(("domain", draft.domain))
            .bind(("site_hash", draft.site_hash))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            let msg = e.to_string();
            match classify_duplicate(&msg) {
                Some(kind) => DbError::Duplicate(kind),
                None => DbError::Statement(msg),
            }
        })?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(id))?;

        Ok(row.into_tenant(id))
    }

    async fn validate(&self, tenant_id: Uuid, api_key: &str) -> Result<bool> {
        let mut result = self
            .db
            .query(
                "SELECT api_key FROM type::record('tenant', $id) \
                 WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;

        // Compare against a dummy when the row is absent so a missing
        // tenant costs the same as a key mismatch.
        let stored = rows
            .first()
            .map(|r| r.api_key.as_str())
            .unwrap_or(DUMMY_API_KEY);
        let lengths_match = stored.len() == api_key.len();
        let bytes_match = bool::from(stored.as_bytes().ct_eq(api_key.as_bytes()));
        let matched = !rows.is_empty() && lengths_match && bytes_match;

        if matched {
            self.db
                .query("UPDATE type::record('tenant', $id) SET last_seen_at = time::now()")
                .bind(("id", tenant_id.to_string()))
                .await
                .map_err(DbError::from)?;
        }

        Ok(matched)
    }

    async fn get_by_id(&self, tenant_id: Uuid) -> Result<Tenant> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('tenant', $id) \
                 WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(tenant_id))?;

        Ok(row.into_tenant(tenant_id))
    }

    async fn get_by_email(&self, admin_email: &str) -> Result<Option<Tenant>> {
        let email = admin_email.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE admin_email = $email AND is_active = true",
            )
            .bind(("email", email))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_tenant().map_err(Error::from)?)),
            None => Ok(None),
        }
    }

    async fn site_exists(&self, site_url: &str) -> Result<bool> {
        let site_url = site_url.to_string();

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE site_url = $site_url AND is_active = true GROUP ALL",
            )
            .bind(("site_url", site_url))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn get_hmac_context(&self, tenant_id: Uuid) -> Result<HmacContext> {
        let mut result = self
            .db
            .query(
                "SELECT hmac_secret_sealed, domain, site_hash, \
                 hmac_secret_updated_at \
                 FROM type::record('tenant', $id) WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HmacRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(tenant_id))?;

        let sealed_secret = row.hmac_secret_sealed.ok_or(Error::HmacNotConfigured)?;

        Ok(HmacContext {
            sealed_secret,
            domain: row.domain,
            site_hash: row.site_hash,
            updated_at: row.hmac_secret_updated_at,
        })
    }

    async fn set_hmac_context(
        &self,
        tenant_id: Uuid,
        sealed_secret: &str,
        domain: &str,
        site_hash: &str,
    ) -> Result<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 hmac_secret_sealed = $sealed, \
                 domain = $domain, \
                 site_hash = $site_hash, \
                 hmac_secret_updated_at = time::now() \
                 WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .bind(("sealed", sealed_secret.to_string()))
            .bind(("domain", domain.to_string()))
            .bind(("site_hash", site_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HmacRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Self::not_found(tenant_id).into());
        }
        Ok(())
    }

    async fn set_provider_key(
        &self,
        tenant_id: Uuid,
        provider: Provider,
        sealed: Option<&str>,
    ) -> Result<()> {
        // Field name comes from the enum, never from caller input.
        let field = match provider {
            Provider::Anthropic => "anthropic_key_sealed",
            Provider::OpenAi => "openai_key_sealed",
        };

        let query = format!(
            "UPDATE type::record('tenant', $id) SET \
             {field} = $sealed, \
             provider_keys_updated_at = time::now() \
             WHERE is_active = true"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("id", tenant_id.to_string()))
            .bind(("sealed", sealed.map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderKeyRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Self::not_found(tenant_id).into());
        }
        Ok(())
    }

    async fn get_provider_keys(&self, tenant_id: Uuid) -> Result<ProviderKeys> {
        let mut result = self
            .db
            .query(
                "SELECT anthropic_key_sealed, openai_key_sealed, \
                 provider_keys_updated_at \
                 FROM type::record('tenant', $id) WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderKeyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(tenant_id))?;

        Ok(ProviderKeys {
            anthropic_sealed: row.anthropic_key_sealed,
            openai_sealed: row.openai_key_sealed,
            updated_at: row.provider_keys_updated_at,
        })
    }

    async fn deactivate(&self, tenant_id: Uuid) -> Result<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET is_active = false \
                 WHERE is_active = true",
            )
            .bind(("id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Self::not_found(tenant_id).into());
        }
        Ok(())
    }
}
