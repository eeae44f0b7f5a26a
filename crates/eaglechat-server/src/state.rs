//! Shared application state wired at startup.

use std::sync::Arc;
use std::time::Duration;

use eaglechat_auth::{
    AuthConfig, HmacService, HttpKeyProbe, KeyBroker, RegistrationService,
    WordPressCallbackClient,
};
use eaglechat_core::error::{Error, Result};
use eaglechat_db::{DbManager, SurrealConversationRepository, SurrealTenantRepository};
use eaglechat_vault::Vault;
use surrealdb::engine::remote::ws::Client;

use crate::config::Settings;
use crate::middleware::rate_limit::RateLimiter;
use crate::providers::ChatClient;

type TenantRepo = SurrealTenantRepository<Client>;
type ConversationRepo = SurrealConversationRepository<Client>;

/// Everything a request handler can reach. Built once before the
/// listener binds; the vault and the derived key inside it are
/// immutable from then on.
pub struct AppState {
    pub settings: Settings,
    pub tenants: TenantRepo,
    pub conversations: ConversationRepo,
    pub registration: RegistrationService<TenantRepo, WordPressCallbackClient>,
    pub hmac: HmacService<TenantRepo>,
    pub broker: KeyBroker<TenantRepo, HttpKeyProbe>,
    pub chat: ChatClient,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(settings: Settings, vault: Arc<Vault>, db: DbManager) -> Result<Self> {
        let auth_config = AuthConfig {
            callback_retry_attempts: settings.callback.retry_attempts,
            callback_retry_delay: Duration::from_secs(settings.callback.retry_delay_seconds),
            development_mode: settings.api.development_mode,
        };

        let tenants = SurrealTenantRepository::new(db.client().clone());
        let conversations = SurrealConversationRepository::new(db.client().clone());

        let callback = WordPressCallbackClient::new(&auth_config)?;
        let registration =
            RegistrationService::new(tenants.clone(), callback, auth_config);

        let hmac = HmacService::new(tenants.clone(), vault.clone());

        let probe = HttpKeyProbe::new().map_err(Error::Internal)?;
        let broker = KeyBroker::new(tenants.clone(), probe, vault);

        Ok(Self {
            settings,
            tenants,
            conversations,
            registration,
            hmac,
            broker,
            chat: ChatClient::new()?,
            rate_limiter: RateLimiter::new(),
        })
    }
}
