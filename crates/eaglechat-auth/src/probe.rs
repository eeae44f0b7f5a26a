//! Provider key probes.
//!
//! A probe is the cheapest possible request that forces the provider
//! to authenticate the key. It runs once, before a key is sealed and
//! stored, so a tenant can never persist a key their provider would
//! reject.

use std::time::Duration;

use eaglechat_core::models::provider::Provider;
use serde::Serialize;
use tracing::{info, warn};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Cheapest Anthropic model, used only for key validation.
const ANTHROPIC_PROBE_MODEL: &str = "claude-3-haiku-20240307";

const OPENAI_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_PROBE_MODEL: &str = "gpt-3.5-turbo";

/// Total budget per probe call.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a probe did not accept the key.
#[derive(Debug)]
pub enum ProbeFailure {
    /// The provider authenticated the request and said no.
    Rejected,
    /// The provider could not be reached; nothing was proven.
    Unavailable(String),
}

pub trait KeyProbe: Send + Sync {
    fn probe(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> impl Future<Output = std::result::Result<(), ProbeFailure>> + Send;
}

#[derive(Serialize)]
struct ProbeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ProbeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ProbeMessage<'a>>,
}

impl<'a> ProbeRequest<'a> {
    fn minimal(model: &'a str) -> Self {
        Self {
            model,
            max_tokens: 1,
            messages: vec![ProbeMessage {
                role: "user",
                content: "Hi",
            }],
        }
    }
}

/// reqwest-backed probe against the real provider endpoints.
pub struct HttpKeyProbe {
    client: reqwest::Client,
}

impl HttpKeyProbe {
    pub fn new() -> std::result::Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| format!("probe client build: {e}"))?;
        Ok(Self { client })
    }

    fn classify(provider: Provider, status: reqwest::StatusCode) -> Result<(), ProbeFailure> {
        match status.as_u16() {
            200 => {
                info!(%provider, "Provider key probe accepted");
                Ok(())
            }
            // Rate-limited keys are live keys.
            429 => {
                warn!(%provider, "Provider rate-limited the probe, treating key as valid");
                Ok(())
            }
            401 | 403 => Err(ProbeFailure::Rejected),
            other => {
                warn!(%provider, status = other, "Unexpected probe status");
                Err(ProbeFailure::Rejected)
            }
        }
    }
}

impl KeyProbe for HttpKeyProbe {
    async fn probe(&self, provider: Provider, api_key: &str) -> Result<(), ProbeFailure> {
        let response = match provider {
            Provider::Anthropic => {
                self.client
                    .post(ANTHROPIC_MESSAGES_URL)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&ProbeRequest::minimal(ANTHROPIC_PROBE_MODEL))
                    .send()
                    .await
            }
            Provider::OpenAi => {
                self.client
                    .post(OPENAI_COMPLETIONS_URL)
                    .bearer_auth(api_key)
                    .json(&ProbeRequest::minimal(OPENAI_PROBE_MODEL))
                    .send()
                    .await
            }
        };

        match response {
            Ok(resp) => Self::classify(provider, resp.status()),
            Err(e) => {
                warn!(%provider, error = %e, "Probe transport failure");
                Err(ProbeFailure::Unavailable(e.to_string()))
            }
        }
    }
}
