//! Schema definitions and migration runner.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Uniqueness invariants live in
//! `DEFINE INDEX ... UNIQUE` statements so the store, not application
//! code, is the enforcement point.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD api_key ON TABLE tenant TYPE string;
DEFINE FIELD site_url ON TABLE tenant TYPE string;
DEFINE FIELD admin_email ON TABLE tenant TYPE string;
DEFINE FIELD domain ON TABLE tenant TYPE string;
DEFINE FIELD site_hash ON TABLE tenant TYPE string;
DEFINE FIELD hmac_secret_sealed ON TABLE tenant TYPE option<string>;
DEFINE FIELD hmac_secret_updated_at ON TABLE tenant \
    TYPE option<datetime>;
DEFINE FIELD anthropic_key_sealed ON TABLE tenant TYPE option<string>;
DEFINE FIELD openai_key_sealed ON TABLE tenant TYPE option<string>;
DEFINE FIELD provider_keys_updated_at ON TABLE tenant \
    TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_seen_at ON TABLE tenant TYPE option<datetime>;
DEFINE FIELD is_active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD metadata ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE INDEX idx_tenant_api_key ON TABLE tenant \
    COLUMNS api_key UNIQUE;
DEFINE INDEX idx_tenant_site_url ON TABLE tenant \
    COLUMNS site_url UNIQUE;
DEFINE INDEX idx_tenant_admin_email ON TABLE tenant \
    COLUMNS admin_email UNIQUE;

-- =======================================================================
-- Conversations (tenant scope)
-- =======================================================================
DEFINE TABLE conversation SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE conversation TYPE string;
DEFINE FIELD session_id ON TABLE conversation TYPE string;
DEFINE FIELD user_ip ON TABLE conversation TYPE option<string>;
DEFINE FIELD user_agent ON TABLE conversation TYPE option<string>;
DEFINE FIELD created_at ON TABLE conversation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE conversation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD metadata ON TABLE conversation TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE INDEX idx_conversation_tenant_session ON TABLE conversation \
    COLUMNS tenant_id, session_id UNIQUE;

-- =======================================================================
-- Messages (append-only)
-- =======================================================================
DEFINE TABLE message SCHEMAFULL \
    PERMISSIONS \
        FOR create FULL \
        FOR select FULL \
        FOR update NONE \
        FOR delete NONE;
DEFINE FIELD conversation_id ON TABLE message TYPE string;
DEFINE FIELD tenant_id ON TABLE message TYPE string;
DEFINE FIELD role ON TABLE message TYPE string \
    ASSERT $value IN ['user', 'assistant'];
DEFINE FIELD content ON TABLE message TYPE string;
DEFINE FIELD ts ON TABLE message TYPE datetime DEFAULT time::now();
DEFINE FIELD metadata ON TABLE message TYPE object FLEXIBLE DEFAULT {};
DEFINE INDEX idx_message_conversation ON TABLE message \
    COLUMNS conversation_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );

            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query("CREATE _migration SET version = $version, name = $name")
                .bind(("version", migration.version))
                .bind(("name", migration.name))
                .await?
                .check()
                .map_err(|e| {
                    DbError::Migration(format!(
                        "failed to record migration v{}: {}",
                        migration.version, e,
                    ))
                })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}

/// Raw schema DDL for version 1, exposed for in-memory test setups.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
