//! HTTP error mapping.
//!
//! One place turns the domain taxonomy into wire responses. Signing
//! failures collapse to a generic 401 with the real reason logged;
//! crypto-integrity and store outages collapse to a generic 500.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use eaglechat_core::Error;
use serde_json::json;

/// Newtype so handlers can return `Result<Json<T>, ApiError>` and the
/// mapping stays in one impl.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            Error::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            Error::DuplicateTenant(kind) => (
                StatusCode::BAD_REQUEST,
                "duplicate_tenant",
                format!("a tenant with this {kind} is already registered"),
            ),
            Error::CallbackFailed { .. } => {
                (StatusCode::BAD_REQUEST, "callback_failed", self.0.to_string())
            }
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.0.to_string(),
            ),
            Error::BadSignature | Error::StaleTimestamp | Error::HmacNotConfigured => {
                // Detail goes to the log, never to the caller.
                tracing::warn!(reason = %self.0, "Rejected signed request");
                (
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "unauthorized".to_string(),
                )
            }
            Error::InvalidProviderKey(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_provider_key",
                self.0.to_string(),
            ),
            Error::ProbeUnavailable(_) => (
                StatusCode::BAD_REQUEST,
                "probe_unavailable",
                self.0.to_string(),
            ),
            Error::NoProviderKey(_) => (
                StatusCode::BAD_REQUEST,
                "no_provider_key",
                self.0.to_string(),
            ),
            Error::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "error": {
                        "code": "rate_limited",
                        "message": "rate limit exceeded, slow down"
                    }
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    body,
                )
                    .into_response();
            }
            Error::NotFound { .. } => (
                StatusCode::BAD_REQUEST,
                "unknown_tenant",
                "unknown tenant".to_string(),
            ),
            Error::SealIntegrity => {
                tracing::error!("Sealed value failed integrity check");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
            Error::StoreUnavailable(detail) => {
                tracing::error!(%detail, "Tenant store unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_unavailable",
                    "temporary storage outage, retry shortly".to_string(),
                )
            }
            Error::Internal(detail) => {
                tracing::error!(%detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
