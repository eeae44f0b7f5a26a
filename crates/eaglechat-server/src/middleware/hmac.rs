//! HMAC verification middleware for protected routes.
//!
//! Buffers the raw body (the signature covers the exact bytes), pulls
//! the tenant from the JSON payload, verifies the envelope, then
//! reinstates the body for the handler.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use eaglechat_auth::signature::{
    SIGNATURE_HEADER, SignatureEnvelope, TIMESTAMP_HEADER, VERSION_HEADER,
};
use eaglechat_core::Error;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Signed request bodies are small JSON; bound them hard.
const MAX_BODY_SIZE: usize = 256 * 1024;

#[derive(Deserialize)]
struct TenantIdOnly {
    tenant_id: Uuid,
}

pub async fn hmac_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let envelope = SignatureEnvelope {
        signature: required_header(&parts.headers, SIGNATURE_HEADER)?,
        timestamp: required_header(&parts.headers, TIMESTAMP_HEADER)?,
        version: required_header(&parts.headers, VERSION_HEADER)?,
    };

    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|_| ApiError(Error::Validation("request body unreadable or too large".into())))?;

    let TenantIdOnly { tenant_id } = serde_json::from_slice(&bytes)
        .map_err(|_| ApiError(Error::Validation("request body must carry tenant_id".into())))?;

    state
        .hmac
        .verify_request(tenant_id, &envelope, &bytes, Utc::now())
        .await
        .map_err(|err| match err {
            // A signature for an unknown tenant gets the same generic
            // rejection as a bad signature.
            Error::NotFound { .. } => ApiError(Error::InvalidCredentials),
            other => ApiError(other),
        })?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn required_header(
    headers: &axum::http::HeaderMap,
    name: &str,
) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError(Error::Validation(format!("missing {name} header"))))
}
