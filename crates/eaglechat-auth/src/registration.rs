//! Registration coordinator — the three-party onboarding handshake.
//!
//! Duplicate detection runs before the callback so known-bad requests
//! never spend remote capacity; the callback runs before credential
//! minting so a flaky origin can never leak credentials into storage.

use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::registration::{Registered, RegistrationRequest};
use eaglechat_core::models::tenant::TenantDraft;
use eaglechat_core::repository::TenantRepository;
use eaglechat_core::{DuplicateKind, validators};
use eaglechat_vault::tokens;
use tracing::info;
use uuid::Uuid;

use crate::callback::CallbackVerifier;
use crate::config::AuthConfig;

/// Orchestrates registration. Generic over the repository and the
/// callback client so the coordinator has no I/O of its own.
pub struct RegistrationService<R, V> {
    repo: R,
    callback: V,
    config: AuthConfig,
}

impl<R: TenantRepository, V: CallbackVerifier> RegistrationService<R, V> {
    pub fn new(repo: R, callback: V, config: AuthConfig) -> Self {
        Self {
            repo,
            callback,
            config,
        }
    }

    /// Run the full handshake: validate, pre-check duplicates, attest
    /// via callback, mint credentials, persist.
    pub async fn register(&self, request: RegistrationRequest) -> Result<Registered> {
        // 1. Validate and normalize the claimed origin.
        let site_url =
            validators::validate_site_url(&request.site_url, self.config.development_mode)?;
        let domain = validators::derive_domain(&site_url)?;

        // 2. Validate the contact address.
        validators::validate_admin_email(&request.admin_email)?;

        // 3. Validate the attestation nonce.
        validators::validate_callback_token(
            &request.callback_token,
            self.config.development_mode,
        )?;

        // 4. Reject known duplicates before burning a callback.
        if self.repo.site_exists(&site_url).await? {
            return Err(Error::DuplicateTenant(DuplicateKind::Site));
        }
        if self.repo.get_by_email(&request.admin_email).await?.is_some() {
            return Err(Error::DuplicateTenant(DuplicateKind::Email));
        }

        // 5. Prove the caller controls the origin.
        self.callback
            .verify(&site_url, &request.callback_token)
            .await?;

        // 6. Mint credentials only after attestation succeeds.
        let tenant_id = Uuid::new_v4();
        let api_key = tokens::generate_api_key();
        let site_hash = tokens::site_hash(&domain, tenant_id);

        let draft = TenantDraft {
            id: tenant_id,
            api_key,
            site_url,
            admin_email: request.admin_email,
            domain,
            site_hash,
            metadata: None,
        };

        // 7. Insert; a concurrent registration racing past the
        // pre-check surfaces here as the same DuplicateTenant.
        let tenant = self.repo.register(draft).await?;

        info!(tenant_id = %tenant.id, domain = %tenant.domain, "Tenant registered");

        // 8. Credentials go to the caller exactly once.
        Ok(Registered {
            tenant_id: tenant.id,
            api_key: tenant.api_key,
        })
    }
}
