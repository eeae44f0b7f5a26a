//! Integration tests for the provider-key broker over an in-memory
//! store, with a scripted probe in place of real provider calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use eaglechat_auth::probe::{KeyProbe, ProbeFailure};
use eaglechat_auth::KeyBroker;
use eaglechat_core::error::Error;
use eaglechat_core::models::provider::Provider;
use eaglechat_core::models::tenant::TenantDraft;
use eaglechat_core::repository::TenantRepository;
use eaglechat_db::SurrealTenantRepository;
use eaglechat_vault::Vault;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

#[derive(Clone, Copy)]
enum ProbeScript {
    Accept,
    Reject,
    Unavailable,
}

struct ScriptedProbe {
    script: ProbeScript,
    calls: Arc<AtomicU32>,
}

impl ScriptedProbe {
    fn new(script: ProbeScript) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl KeyProbe for ScriptedProbe {
    async fn probe(&self, _provider: Provider, _api_key: &str) -> Result<(), ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            ProbeScript::Accept => Ok(()),
            ProbeScript::Reject => Err(ProbeFailure::Rejected),
            ProbeScript::Unavailable => Err(ProbeFailure::Unavailable("connect timeout".into())),
        }
    }
}

async fn repo_with_tenant() -> (SurrealTenantRepository<surrealdb::engine::local::Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    eaglechat_db::run_migrations(&db).await.unwrap();

    let repo = SurrealTenantRepository::new(db);
    let id = Uuid::new_v4();
    repo.register(TenantDraft {
        id,
        api_key: format!("eck_{}", Uuid::new_v4().simple()),
        site_url: "https://shop.example.com".into(),
        admin_email: "a@shop.example.com".into(),
        domain: "shop.example.com".into(),
        site_hash: "h".repeat(64),
        metadata: None,
    })
    .await
    .unwrap();

    (repo, id)
}

fn vault() -> Arc<Vault> {
    Arc::new(Vault::new(b"broker-test-master-key"))
}

const GOOD_KEY: &str = "sk-ant-REDACTED";

#[tokio::test]
async fn configure_seals_and_mask_reveals_edges_only() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, _) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(repo.clone(), probe, vault());

    broker
        .configure(tenant, Provider::Anthropic, GOOD_KEY)
        .await
        .unwrap();

    // Stored value is sealed, not the plaintext.
    let keys = repo.get_provider_keys(tenant).await.unwrap();
    let sealed = keys.anthropic_sealed.unwrap();
    assert_ne!(sealed, GOOD_KEY);
    assert!(!sealed.contains("sk-ant"));

    let masked = broker.mask(tenant, Provider::Anthropic).await.unwrap();
    assert_eq!(masked.len(), 24);
    assert!(masked.starts_with("sk-ant-a"));
    assert!(masked.ends_with("6789"));
    assert!(masked.contains("************"));
}

#[tokio::test]
async fn use_key_returns_the_plaintext() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, _) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(repo, probe, vault());

    broker
        .configure(tenant, Provider::Anthropic, GOOD_KEY)
        .await
        .unwrap();

    let plaintext = broker.use_key(tenant, Provider::Anthropic).await.unwrap();
    assert_eq!(plaintext, GOOD_KEY);
}

#[tokio::test]
async fn rejected_probe_stores_nothing() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, calls) = ScriptedProbe::new(ProbeScript::Reject);
    let broker = KeyBroker::new(repo.clone(), probe, vault());

    let result = broker
        .configure(tenant, Provider::Anthropic, "sk-ant-invalid")
        .await;

    assert!(matches!(
        result,
        Err(Error::InvalidProviderKey(Provider::Anthropic))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let keys = repo.get_provider_keys(tenant).await.unwrap();
    assert!(keys.anthropic_sealed.is_none());
}

#[tokio::test]
async fn unavailable_probe_stores_nothing() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, _) = ScriptedProbe::new(ProbeScript::Unavailable);
    let broker = KeyBroker::new(repo.clone(), probe, vault());

    let result = broker
        .configure(tenant, Provider::OpenAi, "sk-something-plausible")
        .await;

    assert!(matches!(
        result,
        Err(Error::ProbeUnavailable(Provider::OpenAi))
    ));
    assert!(
        repo.get_provider_keys(tenant)
            .await
            .unwrap()
            .openai_sealed
            .is_none()
    );
}

#[tokio::test]
async fn wrong_prefix_is_rejected_without_probing() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, calls) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(repo, probe, vault());

    let result = broker
        .configure(tenant, Provider::Anthropic, "sk-not-anthropic")
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remove_then_use_yields_no_provider_key() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, _) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(repo, probe, vault());

    broker
        .configure(tenant, Provider::Anthropic, GOOD_KEY)
        .await
        .unwrap();
    broker.remove(tenant, Provider::Anthropic).await.unwrap();

    let result = broker.use_key(tenant, Provider::Anthropic).await;
    assert!(matches!(
        result,
        Err(Error::NoProviderKey(Provider::Anthropic))
    ));
}

#[tokio::test]
async fn configured_lists_only_present_providers() {
    let (repo, tenant) = repo_with_tenant().await;
    let (probe, _) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(repo, probe, vault());

    assert!(broker.configured(tenant).await.unwrap().is_empty());

    broker
        .configure(tenant, Provider::Anthropic, GOOD_KEY)
        .await
        .unwrap();
    assert_eq!(
        broker.configured(tenant).await.unwrap(),
        vec![Provider::Anthropic]
    );
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    eaglechat_db::run_migrations(&db).await.unwrap();

    let (probe, _) = ScriptedProbe::new(ProbeScript::Accept);
    let broker = KeyBroker::new(SurrealTenantRepository::new(db), probe, vault());

    let result = broker
        .configure(Uuid::new_v4(), Provider::Anthropic, GOOD_KEY)
        .await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}
