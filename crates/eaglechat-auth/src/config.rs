//! Auth service configuration.

use std::time::Duration;

/// Configuration shared by the registration coordinator and the
/// outbound callback client.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Callback attempts before giving up (default: 3).
    pub callback_retry_attempts: u32,
    /// Pause between callback attempts (default: 3 s).
    pub callback_retry_delay: Duration,
    /// Relaxes origin checks for local testing: private callback
    /// targets allowed, shorter callback tokens accepted. Signature
    /// checks are never relaxed.
    pub development_mode: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            callback_retry_attempts: 3,
            callback_retry_delay: Duration::from_secs(3),
            development_mode: false,
        }
    }
}
