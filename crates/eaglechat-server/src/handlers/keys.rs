//! Provider-key endpoints: install, display, and remove.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use eaglechat_core::models::provider::Provider;
use eaglechat_core::repository::TenantRepository;
use eaglechat_core::Error;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_credentials;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ConfigureKeysRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

#[derive(Serialize)]
pub struct ConfigureKeysResponse {
    pub success: bool,
    pub configured: Vec<String>,
}

/// POST /api/v1/configure-keys — probe-validate, seal, and store
/// tenant provider keys. Nothing is stored for a key the probe
/// rejects.
pub async fn configure_keys(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigureKeysRequest>,
) -> Result<Json<ConfigureKeysResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;

    if request.anthropic_api_key.is_none() && request.openai_api_key.is_none() {
        return Err(ApiError(Error::Validation(
            "at least one provider key is required".into(),
        )));
    }

    let mut configured = Vec::new();

    if let Some(key) = &request.anthropic_api_key {
        state
            .broker
            .configure(request.tenant_id, Provider::Anthropic, key)
            .await?;
        configured.push(Provider::Anthropic.as_str().to_string());
    }

    if let Some(key) = &request.openai_api_key {
        state
            .broker
            .configure(request.tenant_id, Provider::OpenAi, key)
            .await?;
        configured.push(Provider::OpenAi.as_str().to_string());
    }

    Ok(Json(ConfigureKeysResponse {
        success: true,
        configured,
    }))
}

#[derive(Deserialize)]
pub struct KeyStatusRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct KeyStatusEntry {
    pub configured: bool,
    /// Masked display form; never the plaintext.
    pub masked_key: Option<String>,
}

#[derive(Serialize)]
pub struct KeyStatusResponse {
    pub anthropic: KeyStatusEntry,
    pub openai: KeyStatusEntry,
    pub updated_at: Option<DateTime<Utc>>,
}

/// POST /api/v1/get-key-status — masked views of the stored keys.
pub async fn key_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeyStatusRequest>,
) -> Result<Json<KeyStatusResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;

    let keys = state.tenants.get_provider_keys(request.tenant_id).await?;

    let mut response = KeyStatusResponse {
        anthropic: KeyStatusEntry {
            configured: keys.anthropic_sealed.is_some(),
            masked_key: None,
        },
        openai: KeyStatusEntry {
            configured: keys.openai_sealed.is_some(),
            masked_key: None,
        },
        updated_at: keys.updated_at,
    };

    if response.anthropic.configured {
        response.anthropic.masked_key = Some(
            state
                .broker
                .mask(request.tenant_id, Provider::Anthropic)
                .await?,
        );
    }
    if response.openai.configured {
        response.openai.masked_key = Some(
            state
                .broker
                .mask(request.tenant_id, Provider::OpenAi)
                .await?,
        );
    }

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct RemoveKeyRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
    pub provider: String,
}

#[derive(Serialize)]
pub struct RemoveKeyResponse {
    pub success: bool,
}

/// POST /api/v1/remove-key — clear one provider key.
pub async fn remove_key(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RemoveKeyRequest>,
) -> Result<Json<RemoveKeyResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;

    let provider = Provider::parse(&request.provider).ok_or_else(|| {
        ApiError(Error::Validation(format!(
            "unknown provider: {}",
            request.provider
        )))
    })?;

    state.broker.remove(request.tenant_id, provider).await?;

    Ok(Json(RemoveKeyResponse { success: true }))
}
