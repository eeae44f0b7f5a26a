//! Callback attestation client.
//!
//! Registration only proceeds once the claimed origin proves control
//! of the site by echoing the caller's token back through its own
//! verify endpoint.

use std::time::Duration;

use eaglechat_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;

/// Route on the tenant site that answers the attestation call.
const VERIFY_ROUTE: &str = "/wp-json/eaglechat-plugin/v1/verify";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Proof-of-control check against a claimed origin. Trait so tests
/// can script outcomes without a network.
pub trait CallbackVerifier: Send + Sync {
    /// Ok(()) iff the origin confirmed the token. Every other outcome
    /// is `CallbackFailed` carrying the reason and attempts spent.
    fn verify(
        &self,
        site_url: &str,
        callback_token: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    callback_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    verified: bool,
}

/// reqwest-backed callback client with a bounded retry loop.
///
/// 5xx and transport errors retry; a 4xx or an explicit
/// `verified: false` is a definitive verdict from the origin and
/// fails immediately. Each inter-attempt sleep is a cancellation
/// point.
pub struct WordPressCallbackClient {
    client: reqwest::Client,
    attempts: u32,
    delay: Duration,
}

impl WordPressCallbackClient {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("callback client build: {e}")))?;

        Ok(Self {
            client,
            attempts: config.callback_retry_attempts.max(1),
            delay: config.callback_retry_delay,
        })
    }

    fn failed(reason: impl Into<String>, attempts: u32) -> Error {
        Error::CallbackFailed {
            reason: reason.into(),
            attempts,
        }
    }
}

impl CallbackVerifier for WordPressCallbackClient {
    async fn verify(&self, site_url: &str, callback_token: &str) -> Result<()> {
        let base = site_url.strip_suffix('/').unwrap_or(site_url);
        let callback_url = format!("{base}{VERIFY_ROUTE}");

        info!(%callback_url, "Verifying callback token with origin");

        let mut last_reason = String::from("no attempts made");

        for attempt in 1..=self.attempts {
            let response = self
                .client
                .post(&callback_url)
                .json(&VerifyRequest { callback_token })
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body: VerifyResponse = resp.json().await.unwrap_or(VerifyResponse {
                            verified: false,
                        });
                        if body.verified {
                            info!(%callback_url, attempt, "Callback token verified");
                            return Ok(());
                        }
                        // The origin answered and said no.
                        warn!(%callback_url, "Origin rejected the callback token");
                        return Err(Self::failed("origin rejected the callback token", attempt));
                    }

                    if status.is_client_error() {
                        warn!(%callback_url, %status, "Callback returned client error");
                        return Err(Self::failed(
                            format!("origin returned status {status}"),
                            attempt,
                        ));
                    }

                    warn!(%callback_url, %status, attempt, "Callback attempt failed");
                    last_reason = format!("origin returned status {status}");
                }
                Err(e) => {
                    warn!(%callback_url, attempt, error = %e, "Callback request error");
                    last_reason = format!("request error: {e}");
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(Self::failed(last_reason, self.attempts))
    }
}
