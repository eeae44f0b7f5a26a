//! Route handlers for the HTTP surface.

pub mod chat;
pub mod health;
pub mod keys;
pub mod tenants;

use eaglechat_core::Error;
use eaglechat_core::repository::TenantRepository;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Gate for credentialed endpoints: constant-time check against the
/// stored api_key. The failure is deliberately featureless.
pub(crate) async fn require_credentials(
    state: &AppState,
    tenant_id: Uuid,
    api_key: &str,
) -> Result<(), ApiError> {
    if state.tenants.validate(tenant_id, api_key).await? {
        Ok(())
    } else {
        Err(ApiError(Error::InvalidCredentials))
    }
}
