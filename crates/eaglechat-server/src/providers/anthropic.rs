//! Anthropic Messages API client (non-streaming).

use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::provider::Provider;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChatOutcome, WireMessage};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

pub(super) async fn complete(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    messages: &[WireMessage],
    temperature: f64,
    max_tokens: u32,
) -> Result<ChatOutcome> {
    let request = MessagesRequest {
        model,
        max_tokens,
        temperature,
        messages,
    };

    let response = client
        .post(MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::Internal(format!("anthropic request failed: {e}")))?;

    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(Error::InvalidProviderKey(Provider::Anthropic));
    }
    if !status.is_success() {
        warn!(%status, "Anthropic returned an error status");
        return Err(Error::Internal(format!("anthropic error status {status}")));
    }

    let body: MessagesResponse = response
        .json()
        .await
        .map_err(|e| Error::Internal(format!("anthropic response decode: {e}")))?;

    let text = body
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("");

    Ok(ChatOutcome {
        text,
        input_tokens: body.usage.input_tokens,
        output_tokens: body.usage.output_tokens,
        finish_reason: body.stop_reason.unwrap_or_else(|| "stop".into()),
    })
}
