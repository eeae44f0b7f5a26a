//! Outbound chat proxy to upstream model providers.
//!
//! Every call runs under the tenant's own key; there is no house key
//! to fall back to, so a missing or invalid tenant key fails the
//! request.

mod anthropic;
mod openai;

use std::time::Duration;

use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::provider::Provider;
use serde::Serialize;

/// Total budget for one upstream completion call.
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// One entry of the model alias table: the public alias tenants use,
/// and where it routes.
pub struct ModelSpec {
    pub alias: &'static str,
    pub provider: Provider,
    pub wire_id: &'static str,
    pub default_max_tokens: u32,
}

static MODEL_TABLE: &[ModelSpec] = &[
    ModelSpec {
        alias: "claude-sonnet",
        provider: Provider::Anthropic,
        wire_id: "claude-3-5-sonnet-20241022",
        default_max_tokens: 4096,
    },
    ModelSpec {
        alias: "claude-haiku",
        provider: Provider::Anthropic,
        wire_id: "claude-3-5-haiku-20241022",
        default_max_tokens: 4096,
    },
    ModelSpec {
        alias: "claude-opus",
        provider: Provider::Anthropic,
        wire_id: "claude-3-opus-20240229",
        default_max_tokens: 4096,
    },
    ModelSpec {
        alias: "openai-gpt5",
        provider: Provider::OpenAi,
        wire_id: "gpt-5",
        default_max_tokens: 4096,
    },
    ModelSpec {
        alias: "openai-gpt-mini",
        provider: Provider::OpenAi,
        wire_id: "gpt-5-mini",
        default_max_tokens: 4096,
    },
    ModelSpec {
        alias: "openai-gpt-nano",
        provider: Provider::OpenAi,
        wire_id: "gpt-5-nano",
        default_max_tokens: 2048,
    },
];

/// Look up a model alias. Unknown aliases are a caller error.
pub fn resolve(alias: &str) -> Result<&'static ModelSpec> {
    MODEL_TABLE
        .iter()
        .find(|spec| spec.alias == alias)
        .ok_or_else(|| Error::Validation(format!("unsupported model: {alias}")))
}

/// Message in provider wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Normalized completion result across providers.
#[derive(Debug)]
pub struct ChatOutcome {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

/// Shared reqwest client for all provider calls.
pub struct ChatClient {
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("chat client build: {e}")))?;
        Ok(Self { client })
    }

    /// Run one non-streaming completion under the tenant's key.
    pub async fn complete(
        &self,
        spec: &ModelSpec,
        api_key: &str,
        messages: &[WireMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<ChatOutcome> {
        match spec.provider {
            Provider::Anthropic => {
                anthropic::complete(
                    &self.client,
                    api_key,
                    spec.wire_id,
                    messages,
                    temperature,
                    max_tokens,
                )
                .await
            }
            Provider::OpenAi => {
                openai::complete(
                    &self.client,
                    api_key,
                    spec.wire_id,
                    messages,
                    temperature,
                    max_tokens,
                )
                .await
            }
        }
    }
}
