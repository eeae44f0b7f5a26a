//! Schema and migration tests on in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn fresh_db() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[tokio::test]
async fn migrations_run_cleanly() {
    let db = fresh_db().await;
    eaglechat_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = fresh_db().await;
    eaglechat_db::run_migrations(&db).await.unwrap();
    eaglechat_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn unique_index_prevents_duplicate_site_urls() {
    let db = fresh_db().await;
    eaglechat_db::run_migrations(&db).await.unwrap();

    let create = "CREATE tenant SET \
                  api_key = $api_key, site_url = $site_url, \
                  admin_email = $admin_email, domain = 'x.example.com', \
                  site_hash = 'h'";

    db.query(create)
        .bind(("api_key", "eck_one"))
        .bind(("site_url", "https://x.example.com"))
        .bind(("admin_email", "one@x.example.com"))
        .await
        .unwrap()
        .check()
        .unwrap();

    let second = db
        .query(create)
        .bind(("api_key", "eck_two"))
        .bind(("site_url", "https://x.example.com"))
        .bind(("admin_email", "two@x.example.com"))
        .await
        .unwrap()
        .check();

    assert!(second.is_err(), "duplicate site_url should be rejected");
}

#[tokio::test]
async fn message_role_is_constrained() {
    let db = fresh_db().await;
    eaglechat_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE message SET conversation_id = 'c', tenant_id = 't', \
             role = 'system', content = 'nope'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown role should be rejected");
}
