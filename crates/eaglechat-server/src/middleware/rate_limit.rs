//! Per-source-address token bucket rate limiter.
//!
//! Buckets refill continuously and expire after an idle timeout so the
//! table stays bounded; cleanup runs every Nth check rather than on a
//! timer.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use eaglechat_core::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Requests allowed per window.
const MAX_REQUESTS: f64 = 20.0;
/// Window the budget refills over.
const WINDOW: Duration = Duration::from_secs(60);
/// Idle time after which a bucket is dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// Run cleanup every Nth check.
const CLEANUP_INTERVAL: u64 = 256;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter keyed by source IP. Lock is held only for the
/// map access; never across I/O.
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
    checks: AtomicU64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
            refill_per_sec: MAX_REQUESTS / WINDOW.as_secs_f64(),
        }
    }

    /// Take one token for this source, or report how long to back off.
    pub fn check(&self, addr: IpAddr) -> Result<(), u64> {
        self.check_at(addr, Instant::now())
    }

    fn check_at(&self, addr: IpAddr, now: Instant) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().expect("rate limiter poisoned");

        if self.checks.fetch_add(1, Ordering::Relaxed) % CLEANUP_INTERVAL == 0 {
            buckets.retain(|_, b| now.duration_since(b.last_refill) < IDLE_TIMEOUT);
        }

        let bucket = buckets.entry(addr).or_insert(Bucket {
            tokens: MAX_REQUESTS,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(MAX_REQUESTS);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            Err((deficit / self.refill_per_sec).ceil() as u64)
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state
        .rate_limiter
        .check(addr.ip())
        .map_err(|retry_after_secs| {
            tracing::warn!(source = %addr.ip(), retry_after_secs, "Rate limited");
            ApiError(Error::RateLimited { retry_after_secs })
        })?;

    Ok(next.run(request).await)
}
