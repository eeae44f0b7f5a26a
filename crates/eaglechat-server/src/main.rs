//! EagleChat Server — application entry point.
//!
//! Startup order matters: settings, logging, master key, store, then
//! the listener. Any failure before the bind is fatal; nothing is
//! served with a partially established trust root.

mod config;
mod error;
mod handlers;
mod logging;
mod middleware;
mod providers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use eaglechat_db::{DbConfig, DbManager};
use eaglechat_vault::Vault;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Env, Settings};
use crate::state::AppState;

const BIND_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load("config.json")?;
    let _log_guard = logging::init(&settings.logging)?;

    info!(
        service = %settings.api.title,
        version = %settings.api.version,
        "Starting EagleChat server"
    );
    if settings.api.development_mode {
        warn!("Development mode enabled: private callback targets and short tokens allowed");
    }

    // Required environment; absent variables abort startup here.
    let env = Env::from_env()?;

    // The data-encryption key is derived once and immutable afterwards.
    let vault = Arc::new(Vault::new(&env.master_key));

    let db = DbManager::connect(&DbConfig {
        url: env.store_url.clone(),
        service_key: env.store_service_key.clone(),
        ..DbConfig::default()
    })
    .await?;
    eaglechat_db::run_migrations(db.client()).await?;

    let state = Arc::new(AppState::new(settings, vault, db)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR).await?;
    info!(addr = BIND_ADDR, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    // Chat and history carry the HMAC envelope; everything else is
    // authenticated by credentials alone.
    let protected = Router::new()
        .route("/api/v1/chat", post(handlers::chat::chat))
        .route(
            "/api/v1/conversation-history",
            post(handlers::chat::conversation_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::hmac::hmac_middleware,
        ));

    let api = Router::new()
        .route("/api/v1/register", post(handlers::tenants::register))
        .route("/api/v1/validate", post(handlers::tenants::validate))
        .route(
            "/api/v1/configure-hmac",
            post(handlers::tenants::configure_hmac),
        )
        .route("/api/v1/configure-keys", post(handlers::keys::configure_keys))
        .route("/api/v1/get-key-status", post(handlers::keys::key_status))
        .route("/api/v1/remove-key", post(handlers::keys::remove_key))
        .merge(protected)
        // Rate limiting wraps the whole API surface, outside the
        // signature check.
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(handlers::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
