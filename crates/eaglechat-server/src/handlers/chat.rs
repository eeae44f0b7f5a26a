//! HMAC-protected endpoints: chat proxy and conversation retrieval.
//!
//! Both run behind the signature middleware; credentials are still
//! re-validated here so a signed request for someone else's tenant_id
//! cannot borrow their conversation state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use eaglechat_core::models::conversation::{MemoryWindow, MessageRole, NewMessage};
use eaglechat_core::repository::ConversationRepository;
use eaglechat_core::validators;
use eaglechat_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::require_credentials;
use crate::error::ApiError;
use crate::providers::{self, WireMessage};
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 10_000;
const DEFAULT_HISTORY_LIMIT: u64 = 50;
const MAX_HISTORY_LIMIT: u64 = 200;

fn default_temperature() -> f64 {
    0.0
}

#[derive(Deserialize)]
pub struct AiConfigPayload {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub conversation_memory: MemoryWindow,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
    pub message: String,
    pub session_id: String,
    pub ai_config: AiConfigPayload,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub model_used: String,
    pub finish_reason: String,
    pub session_id: String,
}

/// POST /api/v1/chat — proxy one exchange to the tenant's provider
/// under the tenant's own key.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;

    validators::validate_session_id(&request.session_id)?;
    if request.message.is_empty() || request.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError(Error::Validation(format!(
            "message must be between 1 and {MAX_MESSAGE_CHARS} characters"
        ))));
    }
    if !(0.0..=2.0).contains(&request.ai_config.temperature) {
        return Err(ApiError(Error::Validation(
            "temperature must be between 0.0 and 2.0".into(),
        )));
    }

    let spec = providers::resolve(&request.ai_config.model)?;
    let max_tokens = request
        .ai_config
        .max_tokens
        .unwrap_or(spec.default_max_tokens);

    // Two stored messages per exchange.
    let history_limit = request.ai_config.conversation_memory.exchanges() * 2;
    let history = state
        .conversations
        .history(request.tenant_id, &request.session_id, history_limit)
        .await?;

    let user_ip = addr.ip().to_string();
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    state
        .conversations
        .ensure(
            request.tenant_id,
            &request.session_id,
            Some(&user_ip),
            user_agent,
        )
        .await?;

    // Short-lived plaintext copy, dropped at the end of this call.
    let provider_key = state
        .broker
        .use_key(request.tenant_id, spec.provider)
        .await?;

    let mut wire: Vec<WireMessage> = history
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect();
    wire.push(WireMessage {
        role: MessageRole::User.as_str().to_string(),
        content: request.message.clone(),
    });

    state
        .conversations
        .append(
            request.tenant_id,
            &request.session_id,
            NewMessage {
                role: MessageRole::User,
                content: request.message.clone(),
                metadata: None,
            },
        )
        .await?;

    let outcome = state
        .chat
        .complete(
            spec,
            &provider_key,
            &wire,
            request.ai_config.temperature,
            max_tokens,
        )
        .await?;

    state
        .conversations
        .append(
            request.tenant_id,
            &request.session_id,
            NewMessage {
                role: MessageRole::Assistant,
                content: outcome.text.clone(),
                metadata: Some(json!({
                    "model": request.ai_config.model,
                    "input_tokens": outcome.input_tokens,
                    "output_tokens": outcome.output_tokens,
                })),
            },
        )
        .await?;

    Ok(Json(ChatResponse {
        response: outcome.text,
        input_tokens: outcome.input_tokens,
        output_tokens: outcome.output_tokens,
        total_tokens: outcome.input_tokens + outcome.output_tokens,
        model_used: request.ai_config.model,
        finish_reason: outcome.finish_reason,
        session_id: request.session_id,
    }))
}

#[derive(Deserialize)]
pub struct HistoryRequest {
    pub tenant_id: Uuid,
    pub api_key: String,
    pub session_id: String,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
    pub ts: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub session_id: String,
    pub messages: Vec<HistoryMessage>,
}

/// POST /api/v1/conversation-history — prior messages for one
/// tenant-scoped session, oldest first.
pub async fn conversation_history(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    require_credentials(&state, request.tenant_id, &request.api_key).await?;
    validators::validate_session_id(&request.session_id)?;

    let limit = request
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let messages = state
        .conversations
        .history(request.tenant_id, &request.session_id, limit)
        .await?;

    Ok(Json(HistoryResponse {
        success: true,
        session_id: request.session_id,
        messages: messages
            .into_iter()
            .map(|m| HistoryMessage {
                role: m.role,
                content: m.content,
                ts: m.ts,
                metadata: m.metadata,
            })
            .collect(),
    }))
}
