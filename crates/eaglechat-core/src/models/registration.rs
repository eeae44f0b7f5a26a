//! Registration request/response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a site posts to onboard itself.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub site_url: String,
    pub admin_email: String,
    /// Caller-supplied nonce echoed back during callback attestation.
    pub callback_token: String,
}

/// Credentials issued after callback attestation and insert succeed.
/// The api_key is returned exactly once and never logged.
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub tenant_id: Uuid,
    pub api_key: String,
}
