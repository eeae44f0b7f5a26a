//! Integration tests for the tenant repository using in-memory
//! SurrealDB.

use eaglechat_core::error::Error;
use eaglechat_core::models::provider::Provider;
use eaglechat_core::models::tenant::TenantDraft;
use eaglechat_core::repository::TenantRepository;
use eaglechat_db::SurrealTenantRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    eaglechat_db::run_migrations(&db).await.unwrap();
    db
}

fn draft(site_url: &str, admin_email: &str) -> TenantDraft {
    let id = Uuid::new_v4();
    TenantDraft {
        id,
        api_key: format!("eck_{}", Uuid::new_v4().simple()),
        site_url: site_url.into(),
        admin_email: admin_email.into(),
        domain: "shop.example.com".into(),
        site_hash: format!("{:0>64}", id.simple().to_string()),
        metadata: None,
    }
}

// -----------------------------------------------------------------------
// Registration and uniqueness
// -----------------------------------------------------------------------

#[tokio::test]
async fn register_and_get_by_id() {
    let repo = SurrealTenantRepository::new(setup().await);
    let input = draft("https://shop.example.com", "a@shop.example.com");

    let tenant = repo.register(input.clone()).await.unwrap();
    assert_eq!(tenant.id, input.id);
    assert_eq!(tenant.site_url, "https://shop.example.com");
    assert!(tenant.is_active);
    assert!(tenant.hmac_secret_sealed.is_none());
    assert!(tenant.last_seen_at.is_none());

    let fetched = repo.get_by_id(tenant.id).await.unwrap();
    assert_eq!(fetched.api_key, tenant.api_key);
    assert_eq!(fetched.admin_email, "a@shop.example.com");
}

#[tokio::test]
async fn duplicate_site_url_is_classified() {
    let repo = SurrealTenantRepository::new(setup().await);
    repo.register(draft("https://shop.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    let result = repo
        .register(draft("https://shop.example.com", "b@shop.example.com"))
        .await;

    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(eaglechat_core::DuplicateKind::Site))
    ));
}

#[tokio::test]
async fn duplicate_admin_email_is_classified() {
    let repo = SurrealTenantRepository::new(setup().await);
    repo.register(draft("https://one.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    let result = repo
        .register(draft("https://two.example.com", "a@shop.example.com"))
        .await;

    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(eaglechat_core::DuplicateKind::Email))
    ));
}

#[tokio::test]
async fn duplicate_api_key_is_classified() {
    let repo = SurrealTenantRepository::new(setup().await);
    let first = draft("https://one.example.com", "a@shop.example.com");
    repo.register(first.clone()).await.unwrap();

    let mut second = draft("https://two.example.com", "b@shop.example.com");
    second.api_key = first.api_key;
    let result = repo.register(second).await;

    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(
            eaglechat_core::DuplicateKind::ApiKey
        ))
    ));
}

#[tokio::test]
async fn duplicate_tenant_id_is_classified() {
    let repo = SurrealTenantRepository::new(setup().await);
    let first = draft("https://one.example.com", "a@shop.example.com");
    repo.register(first.clone()).await.unwrap();

    let mut second = draft("https://two.example.com", "b@shop.example.com");
    second.id = first.id;
    let result = repo.register(second).await;

    assert!(matches!(
        result,
        Err(Error::DuplicateTenant(eaglechat_core::DuplicateKind::Id))
    ));
}

// -----------------------------------------------------------------------
// Credential validation
// -----------------------------------------------------------------------

#[tokio::test]
async fn validate_matching_key_touches_last_seen() {
    let repo = SurrealTenantRepository::new(setup().await);
    let input = draft("https://shop.example.com", "a@shop.example.com");
    let tenant = repo.register(input.clone()).await.unwrap();
    assert!(tenant.last_seen_at.is_none());

    assert!(repo.validate(tenant.id, &input.api_key).await.unwrap());

    let fetched = repo.get_by_id(tenant.id).await.unwrap();
    assert!(fetched.last_seen_at.is_some());
}

#[tokio::test]
async fn validate_wrong_key_is_false_and_does_not_touch() {
    let repo = SurrealTenantRepository::new(setup().await);
    let tenant = repo
        .register(draft("https://shop.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    assert!(
        !repo
            .validate(tenant.id, "eck_definitely-not-the-right-key")
            .await
            .unwrap()
    );

    let fetched = repo.get_by_id(tenant.id).await.unwrap();
    assert!(fetched.last_seen_at.is_none());
}

#[tokio::test]
async fn validate_unknown_tenant_is_false() {
    let repo = SurrealTenantRepository::new(setup().await);
    assert!(
        !repo
            .validate(Uuid::new_v4(), "eck_anything")
            .await
            .unwrap()
    );
}

// -----------------------------------------------------------------------
// HMAC context
// -----------------------------------------------------------------------

#[tokio::test]
async fn hmac_context_roundtrip() {
    let repo = SurrealTenantRepository::new(setup().await);
    let tenant = repo
        .register(draft("https://shop.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    // Not configured yet.
    assert!(matches!(
        repo.get_hmac_context(tenant.id).await,
        Err(Error::HmacNotConfigured)
    ));

    repo.set_hmac_context(tenant.id, "sealed-blob", "shop.example.com", "abc123")
        .await
        .unwrap();

    let ctx = repo.get_hmac_context(tenant.id).await.unwrap();
    assert_eq!(ctx.sealed_secret, "sealed-blob");
    assert_eq!(ctx.domain, "shop.example.com");
    assert_eq!(ctx.site_hash, "abc123");
    assert!(ctx.updated_at.is_some());
}

#[tokio::test]
async fn hmac_context_for_unknown_tenant_is_not_found() {
    let repo = SurrealTenantRepository::new(setup().await);
    assert!(matches!(
        repo.get_hmac_context(Uuid::new_v4()).await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        repo.set_hmac_context(Uuid::new_v4(), "s", "d", "h").await,
        Err(Error::NotFound { .. })
    ));
}

// -----------------------------------------------------------------------
// Provider keys
// -----------------------------------------------------------------------

#[tokio::test]
async fn provider_keys_set_get_clear() {
    let repo = SurrealTenantRepository::new(setup().await);
    let tenant = repo
        .register(draft("https://shop.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    let keys = repo.get_provider_keys(tenant.id).await.unwrap();
    assert!(keys.anthropic_sealed.is_none());
    assert!(keys.openai_sealed.is_none());
    assert!(keys.updated_at.is_none());

    repo.set_provider_key(tenant.id, Provider::Anthropic, Some("sealed-anthropic"))
        .await
        .unwrap();
    repo.set_provider_key(tenant.id, Provider::OpenAi, Some("sealed-openai"))
        .await
        .unwrap();

    let keys = repo.get_provider_keys(tenant.id).await.unwrap();
    assert_eq!(keys.anthropic_sealed.as_deref(), Some("sealed-anthropic"));
    assert_eq!(keys.openai_sealed.as_deref(), Some("sealed-openai"));
    assert!(keys.updated_at.is_some());

    repo.set_provider_key(tenant.id, Provider::Anthropic, None)
        .await
        .unwrap();

    let keys = repo.get_provider_keys(tenant.id).await.unwrap();
    assert!(keys.anthropic_sealed.is_none());
    assert_eq!(keys.openai_sealed.as_deref(), Some("sealed-openai"));
}

// -----------------------------------------------------------------------
// Lookups and soft delete
// -----------------------------------------------------------------------

#[tokio::test]
async fn site_exists_and_email_lookup() {
    let repo = SurrealTenantRepository::new(setup().await);
    repo.register(draft("https://shop.example.com", "a@shop.example.com"))
        .await
        .unwrap();

    assert!(repo.site_exists("https://shop.example.com").await.unwrap());
    assert!(!repo.site_exists("https://other.example.com").await.unwrap());

    let found = repo.get_by_email("a@shop.example.com").await.unwrap();
    assert!(found.is_some());
    assert!(repo.get_by_email("b@shop.example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn deactivated_tenant_is_invisible() {
    let repo = SurrealTenantRepository::new(setup().await);
    let input = draft("https://shop.example.com", "a@shop.example.com");
    let tenant = repo.register(input.clone()).await.unwrap();

    repo.deactivate(tenant.id).await.unwrap();

    assert!(matches!(
        repo.get_by_id(tenant.id).await,
        Err(Error::NotFound { .. })
    ));
    assert!(!repo.validate(tenant.id, &input.api_key).await.unwrap());
    assert!(!repo.site_exists("https://shop.example.com").await.unwrap());
    assert!(repo.get_by_email("a@shop.example.com").await.unwrap().is_none());

    // Second deactivate finds nothing active to update.
    assert!(matches!(
        repo.deactivate(tenant.id).await,
        Err(Error::NotFound { .. })
    ));
}
