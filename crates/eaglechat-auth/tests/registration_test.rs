//! Integration tests for the registration coordinator: in-memory
//! store plus a scripted local origin standing in for the WordPress
//! verify endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use axum::routing::post;
use axum::{Json, Router};
use eaglechat_auth::{AuthConfig, RegistrationService, WordPressCallbackClient};
use eaglechat_core::error::Error;
use eaglechat_core::models::registration::RegistrationRequest;
use eaglechat_core::repository::TenantRepository;
use eaglechat_core::DuplicateKind;
use eaglechat_db::SurrealTenantRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// What the fake origin answers on each verify call.
#[derive(Clone, Copy)]
enum OriginScript {
    Verified,
    RejectToken,
    ServerError,
    NotFound,
}

/// Spin up a local origin running the verify route; returns its base
/// URL and a counter of calls received.
async fn spawn_origin(script: OriginScript) -> (String, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/wp-json/eaglechat-plugin/v1/verify",
        post(move || {
            let hits = handler_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                match script {
                    OriginScript::Verified => (
                        axum::http::StatusCode::OK,
                        Json(serde_json::json!({"verified": true})),
                    ),
                    OriginScript::RejectToken => (
                        axum::http::StatusCode::OK,
                        Json(serde_json::json!({"verified": false})),
                    ),
                    OriginScript::ServerError => (
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({"error": "boom"})),
                    ),
                    OriginScript::NotFound => (
                        axum::http::StatusCode::NOT_FOUND,
                        Json(serde_json::json!({"error": "no such route"})),
                    ),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), hits)
}

async fn repo() -> SurrealTenantRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    eaglechat_db::run_migrations(&db).await.unwrap();
    SurrealTenantRepository::new(db)
}

/// Development mode so the coordinator accepts the loopback origin.
fn test_config() -> AuthConfig {
    AuthConfig {
        callback_retry_attempts: 3,
        callback_retry_delay: Duration::from_millis(50),
        development_mode: true,
    }
}

fn service(
    repo: SurrealTenantRepository<surrealdb::engine::local::Db>,
    config: AuthConfig,
) -> RegistrationService<
    SurrealTenantRepository<surrealdb::engine::local::Db>,
    WordPressCallbackClient,
> {
    let callback = WordPressCallbackClient::new(&config).unwrap();
    RegistrationService::new(repo, callback, config)
}

fn request(site_url: &str, admin_email: &str) -> RegistrationRequest {
    RegistrationRequest {
        site_url: site_url.into(),
        admin_email: admin_email.into(),
        callback_token: format!("t_{}", "0123456789abcdef0123456789abcdef"),
    }
}

#[tokio::test]
async fn happy_path_issues_credentials_and_persists() {
    let (origin, hits) = spawn_origin(OriginScript::Verified).await;
    let repo = repo().await;
    let svc = service(repo.clone(), test_config());

    let registered = svc
        .register(request(&origin, "a@shop.example.com"))
        .await
        .unwrap();

    // api_key: eck_ + 44 URL-safe chars.
    assert_eq!(registered.api_key.len(), 48);
    assert!(registered.api_key.starts_with("eck_"));
    assert!(
        registered.api_key[4..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );

    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let tenant = repo.get_by_id(registered.tenant_id).await.unwrap();
    assert_eq!(tenant.site_url, origin);
    assert!(repo.validate(tenant.id, &registered.api_key).await.unwrap());
}

#[tokio::test]
async fn callback_exhaustion_retries_then_fails_without_persisting() {
    let (origin, hits) = spawn_origin(OriginScript::ServerError).await;
    let repo = repo().await;
    let svc = service(repo.clone(), test_config());

    let started = Instant::now();
    let result = svc.register(request(&origin, "a@shop.example.com")).await;
    let elapsed = started.elapsed();

    match result {
        Err(Error::CallbackFailed { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected CallbackFailed, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    // Two inter-attempt delays of 50 ms each.
    assert!(elapsed >= Duration::from_millis(100));

    assert!(!repo.site_exists(&origin).await.unwrap());
}

#[tokio::test]
async fn origin_rejecting_token_fails_after_one_attempt() {
    let (origin, hits) = spawn_origin(OriginScript::RejectToken).await;
    let svc = service(repo().await, test_config());

    let result = svc.register(request(&origin, "a@shop.example.com")).await;

    match result {
        Err(Error::CallbackFailed { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("expected CallbackFailed, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_error_from_origin_fails_fast() {
    let (origin, hits) = spawn_origin(OriginScript::NotFound).await;
    let svc = service(repo().await, test_config());

    let result = svc.register(request(&origin, "a@shop.example.com")).await;

    assert!(matches!(result, Err(Error::CallbackFailed { attempts: 1, .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_site_url_is_rejected_before_callback() {
    let (origin, hits) = spawn_origin(OriginScript::Verified).await;
    let repo = repo().await;
    let svc = service(repo.clone(), test_config());

    svc.register(request(&origin, "a@shop.example.com"))
        .await
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Same site, different email, fresh token: still a duplicate, and
    // the origin is not called again.
    let result = svc.register(request(&origin, "b@shop.example.com")).await;
    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(DuplicateKind::Site))
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_admin_email_is_rejected_before_callback() {
    let (origin_a, _) = spawn_origin(OriginScript::Verified).await;
    let (origin_b, hits_b) = spawn_origin(OriginScript::Verified).await;
    let repo = repo().await;
    let svc = service(repo.clone(), test_config());

    svc.register(request(&origin_a, "a@shop.example.com"))
        .await
        .unwrap();

    let result = svc.register(request(&origin_b, "a@shop.example.com")).await;
    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(DuplicateKind::Email))
    ));
    assert_eq!(hits_b.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_inputs_never_reach_the_origin() {
    let (origin, hits) = spawn_origin(OriginScript::Verified).await;
    let svc = service(repo().await, test_config());

    let mut bad_email = request(&origin, "not-an-email");
    bad_email.admin_email = "not-an-email".into();
    assert!(matches!(
        svc.register(bad_email).await,
        Err(Error::Validation(_))
    ));

    let mut bad_token = request(&origin, "a@shop.example.com");
    bad_token.callback_token = "abc".into();
    assert!(matches!(
        svc.register(bad_token).await,
        Err(Error::Validation(_))
    ));

    assert!(matches!(
        svc.register(request("not a url", "a@shop.example.com"))
            .await,
        Err(Error::Validation(_))
    ));

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_registrations_for_one_site_yield_one_winner() {
    let (origin, _) = spawn_origin(OriginScript::Verified).await;
    let repo = repo().await;
    let svc_a = service(repo.clone(), test_config());
    let svc_b = service(repo.clone(), test_config());

    let (a, b) = tokio::join!(
        svc_a.register(request(&origin, "a@shop.example.com")),
        svc_b.register(request(&origin, "b@shop.example.com")),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one registration must win");

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser,
        Err(Error::DuplicateTenant(DuplicateKind::Site))
    ));
}

#[tokio::test]
async fn production_mode_blocks_loopback_origins() {
    let (origin, hits) = spawn_origin(OriginScript::Verified).await;
    let config = AuthConfig {
        development_mode: false,
        ..test_config()
    };
    let svc = service(repo().await, config);

    let result = svc.register(request(&origin, "a@shop.example.com")).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
