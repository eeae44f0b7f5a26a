//! Provider-key broker.
//!
//! Brokers tenant-supplied upstream keys: validates them against the
//! provider, seals them for storage, and hands out short-lived
//! plaintext copies on the hot path. The in-memory cache holds sealed
//! ciphertext only, never plaintext, and outbound calls happen outside
//! the cache lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::provider::Provider;
use eaglechat_core::repository::TenantRepository;
use eaglechat_vault::Vault;
use tracing::info;
use uuid::Uuid;

use crate::probe::{KeyProbe, ProbeFailure};

/// Fixed masked-middle run so the display never leaks key length.
const MASK_RUN: usize = 12;
/// Leading characters revealed by `mask`.
const MASK_HEAD: usize = 8;
/// Trailing characters revealed by `mask`.
const MASK_TAIL: usize = 4;

/// Masked display form: `first8 + "*"×12 + last4`. Keys too short to
/// split are fully masked at the same width.
pub fn mask_key(key: &str) -> String {
    if key.len() >= MASK_HEAD + MASK_TAIL {
        format!(
            "{}{}{}",
            &key[..MASK_HEAD],
            "*".repeat(MASK_RUN),
            &key[key.len() - MASK_TAIL..]
        )
    } else {
        "*".repeat(MASK_HEAD + MASK_RUN + MASK_TAIL)
    }
}

/// Broker over the tenant store, the vault, and a key probe.
pub struct KeyBroker<R, P> {
    repo: R,
    probe: P,
    vault: Arc<Vault>,
    /// tenant → provider → sealed ciphertext. Invalidated on every
    /// configure/remove.
    cache: Mutex<HashMap<Uuid, HashMap<Provider, String>>>,
}

impl<R: TenantRepository, P: KeyProbe> KeyBroker<R, P> {
    pub fn new(repo: R, probe: P, vault: Arc<Vault>) -> Self {
        Self {
            repo,
            probe,
            vault,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Validate a tenant-supplied key against its provider, then seal
    /// and persist it. Nothing is stored unless the probe accepts.
    pub async fn configure(
        &self,
        tenant_id: Uuid,
        provider: Provider,
        plaintext_key: &str,
    ) -> Result<()> {
        if !plaintext_key.starts_with(provider.key_prefix()) {
            return Err(Error::Validation(format!(
                "{provider} keys must start with {}",
                provider.key_prefix()
            )));
        }

        self.probe
            .probe(provider, plaintext_key)
            .await
            .map_err(|failure| match failure {
                ProbeFailure::Rejected => Error::InvalidProviderKey(provider),
                ProbeFailure::Unavailable(_) => Error::ProbeUnavailable(provider),
            })?;

        let sealed = self.vault.seal(plaintext_key.as_bytes())?;
        self.repo
            .set_provider_key(tenant_id, provider, Some(&sealed))
            .await?;

        let mut cache = self.cache.lock().expect("broker cache poisoned");
        cache.entry(tenant_id).or_default().insert(provider, sealed);

        info!(%tenant_id, %provider, "Provider key configured");
        Ok(())
    }

    /// Masked display view. Never returns plaintext.
    pub async fn mask(&self, tenant_id: Uuid, provider: Provider) -> Result<String> {
        let plaintext = self.use_key(tenant_id, provider).await?;
        Ok(mask_key(&plaintext))
    }

    /// Short-lived plaintext copy for one outbound call. The caller
    /// must discard it after use.
    pub async fn use_key(&self, tenant_id: Uuid, provider: Provider) -> Result<String> {
        let sealed = self.sealed_for(tenant_id, provider).await?;
        Ok(self.vault.open_string(&sealed)?)
    }

    /// Clear a stored key and drop it from the cache.
    pub async fn remove(&self, tenant_id: Uuid, provider: Provider) -> Result<()> {
        self.repo
            .set_provider_key(tenant_id, provider, None)
            .await?;

        let mut cache = self.cache.lock().expect("broker cache poisoned");
        if let Some(entry) = cache.get_mut(&tenant_id) {
            entry.remove(&provider);
        }

        info!(%tenant_id, %provider, "Provider key removed");
        Ok(())
    }

    /// Which providers currently hold a key for this tenant.
    pub async fn configured(&self, tenant_id: Uuid) -> Result<Vec<Provider>> {
        let keys = self.repo.get_provider_keys(tenant_id).await?;
        let mut providers = Vec::new();
        if keys.anthropic_sealed.is_some() {
            providers.push(Provider::Anthropic);
        }
        if keys.openai_sealed.is_some() {
            providers.push(Provider::OpenAi);
        }
        Ok(providers)
    }

    /// Sealed ciphertext from cache, falling back to the store.
    async fn sealed_for(&self, tenant_id: Uuid, provider: Provider) -> Result<String> {
        {
            let cache = self.cache.lock().expect("broker cache poisoned");
            if let Some(sealed) = cache.get(&tenant_id).and_then(|e| e.get(&provider)) {
                return Ok(sealed.clone());
            }
        }

        let keys = self.repo.get_provider_keys(tenant_id).await?;
        let sealed = match provider {
            Provider::Anthropic => keys.anthropic_sealed,
            Provider::OpenAi => keys.openai_sealed,
        }
        .ok_or(Error::NoProviderKey(provider))?;

        let mut cache = self.cache.lock().expect("broker cache poisoned");
        cache
            .entry(tenant_id)
            .or_default()
            .insert(provider, sealed.clone());

        Ok(sealed)
    }
}
