//! Repository trait definitions for data access abstraction.
//!
//! All operations are async and single-statement atomic at the storage
//! layer; uniqueness is enforced by storage constraints, not
//! read-then-write. Inactive tenants are invisible to every lookup.

use uuid::Uuid;

use crate::error::Result;
use crate::models::conversation::{Conversation, Message, NewMessage};
use crate::models::provider::Provider;
use crate::models::tenant::{HmacContext, ProviderKeys, Tenant, TenantDraft};

pub trait TenantRepository: Send + Sync {
    /// Atomic insert. Fails with `DuplicateTenant{kind}` naming the
    /// violated invariant (tenant_id, api_key, site_url, admin_email).
    fn register(&self, draft: TenantDraft) -> impl Future<Output = Result<Tenant>> + Send;

    /// Constant-time credential check. Touches `last_seen_at` on
    /// success; never reveals which field mismatched, and takes the
    /// same time whether the tenant exists or not.
    fn validate(
        &self,
        tenant_id: Uuid,
        api_key: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn get_by_id(&self, tenant_id: Uuid) -> impl Future<Output = Result<Tenant>> + Send;

    /// Active-tenant lookup by admin email, for duplicate pre-checks.
    fn get_by_email(
        &self,
        admin_email: &str,
    ) -> impl Future<Output = Result<Option<Tenant>>> + Send;

    /// Whether an active tenant already claims this site_url.
    fn site_exists(&self, site_url: &str) -> impl Future<Output = Result<bool>> + Send;

    fn get_hmac_context(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = Result<HmacContext>> + Send;

    /// Upsert the signing context; bumps `hmac_secret_updated_at`.
    fn set_hmac_context(
        &self,
        tenant_id: Uuid,
        sealed_secret: &str,
        domain: &str,
        site_hash: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// `None` clears the key. Bumps `provider_keys_updated_at`.
    fn set_provider_key(
        &self,
        tenant_id: Uuid,
        provider: Provider,
        sealed: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn get_provider_keys(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = Result<ProviderKeys>> + Send;

    /// Soft delete; the record stays for audit but every lookup skips it.
    fn deactivate(&self, tenant_id: Uuid) -> impl Future<Output = Result<()>> + Send;
}

pub trait ConversationRepository: Send + Sync {
    /// Get-or-create under the unique `(tenant_id, session_id)` index.
    fn ensure(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        user_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> impl Future<Output = Result<Conversation>> + Send;

    /// Append one message; bumps the conversation's `updated_at`.
    fn append(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        message: NewMessage,
    ) -> impl Future<Output = Result<Message>> + Send;

    /// Most recent `limit` messages in chronological order.
    fn history(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;
}
