//! OpenAI Chat Completions API client (non-streaming).

use eaglechat_core::error::{Error, Result};
use eaglechat_core::models::provider::Provider;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChatOutcome, WireMessage};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub(super) async fn complete(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    messages: &[WireMessage],
    temperature: f64,
    max_tokens: u32,
) -> Result<ChatOutcome> {
    let request = CompletionsRequest {
        model,
        max_tokens,
        temperature,
        messages,
    };

    let response = client
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::Internal(format!("openai request failed: {e}")))?;

    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(Error::InvalidProviderKey(Provider::OpenAi));
    }
    if !status.is_success() {
        warn!(%status, "OpenAI returned an error status");
        return Err(Error::Internal(format!("openai error status {status}")));
    }

    let body: CompletionsResponse = response
        .json()
        .await
        .map_err(|e| Error::Internal(format!("openai response decode: {e}")))?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Internal("openai returned no choices".into()))?;

    Ok(ChatOutcome {
        text: choice.message.content.unwrap_or_default(),
        input_tokens: body.usage.prompt_tokens,
        output_tokens: body.usage.completion_tokens,
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
    })
}
