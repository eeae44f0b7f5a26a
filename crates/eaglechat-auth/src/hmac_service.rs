//! HMAC secret provisioning and request verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eaglechat_core::error::Result;
use eaglechat_core::repository::TenantRepository;
use eaglechat_vault::{Vault, tokens};
use tracing::info;
use uuid::Uuid;

use crate::signature::{self, SignatureEnvelope};

/// Owns the signing secret lifecycle for protected routes.
pub struct HmacService<R> {
    repo: R,
    vault: Arc<Vault>,
}

impl<R: TenantRepository> HmacService<R> {
    pub fn new(repo: R, vault: Arc<Vault>) -> Self {
        Self { repo, vault }
    }

    /// Mint a fresh signing secret for the tenant, seal it, and store
    /// it alongside the domain binding. The plaintext is returned to
    /// the caller exactly once; re-provisioning rotates the secret.
    pub async fn provision(&self, tenant_id: Uuid) -> Result<String> {
        let tenant = self.repo.get_by_id(tenant_id).await?;

        let secret = tokens::generate_hmac_secret();
        let sealed = self.vault.seal(secret.as_bytes())?;

        self.repo
            .set_hmac_context(tenant_id, &sealed, &tenant.domain, &tenant.site_hash)
            .await?;

        info!(%tenant_id, "HMAC secret provisioned");
        Ok(secret)
    }

    /// Verify a signed request for the tenant: load the sealed secret,
    /// open it, and check the envelope against the raw body.
    pub async fn verify_request(
        &self,
        tenant_id: Uuid,
        envelope: &SignatureEnvelope,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ctx = self.repo.get_hmac_context(tenant_id).await?;
        let secret = self.vault.open_string(&ctx.sealed_secret)?;
        signature::verify(secret.as_bytes(), envelope, body, now)
    }
}
