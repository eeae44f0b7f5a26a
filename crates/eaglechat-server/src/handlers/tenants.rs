//! Tenant onboarding and credential endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use eaglechat_core::models::registration::RegistrationRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_credentials;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub tenant_id: Uuid,
    pub api_key: String,
    pub message: String,
}

/// POST /api/v1/register — the three-party onboarding handshake.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegistrationRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let registered = state.registration.register(request).await?;

    Ok(Json(RegisterResponse {
        success: true,
        tenant_id: registered.tenant_id,
        api_key: registered.api_key,
        message: "tenant registered".into(),
    }))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// POST /api/v1/validate — credential check. 200 on match, 401
/// otherwise; never says which field mismatched.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;
    Ok(Json(ValidateResponse { valid: true }))
}

#[derive(Deserialize)]
pub struct ConfigureHmacRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct ConfigureHmacResponse {
    pub success: bool,
    /// Returned exactly once; the server keeps only the sealed form.
    pub hmac_secret: String,
}

/// POST /api/v1/configure-hmac — mint and install a signing secret.
/// Calling again rotates it.
pub async fn configure_hmac(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigureHmacRequest>,
) -> Result<Json<ConfigureHmacResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;

    let hmac_secret = state.hmac.provision(request.tenant_id).await?;

    Ok(Json(ConfigureHmacResponse {
        success: true,
        hmac_secret,
    }))
}
