// src/db/schema.rs
// Database schema and migrations for taxonomy and model-registry storage

use anyhow::Result;
use rusqlite::Connection;

/// Base schema. Keywords are stored as an ordered JSON array; `position`
/// on llm_models fixes the ensemble iteration order.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id                TEXT PRIMARY KEY,
    org_id            TEXT NOT NULL REFERENCES organizations(id),
    parent_id         TEXT REFERENCES categories(id),
    name              TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    keywords          TEXT NOT NULL DEFAULT '[]',
    level             INTEGER NOT NULL,
    use_keywords      INTEGER NOT NULL DEFAULT 0,
    high_threshold    REAL NOT NULL DEFAULT 0.85,
    medium_threshold  REAL NOT NULL DEFAULT 0.6,
    active            INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_categories_org_level
    ON categories(org_id, level, active);
CREATE INDEX IF NOT EXISTS idx_categories_parent
    ON categories(parent_id);

CREATE TABLE IF NOT EXISTS llm_models (
    id            TEXT PRIMARY KEY,
    backend       TEXT NOT NULL DEFAULT 'ollama',
    model         TEXT NOT NULL,
    vision        INTEGER NOT NULL DEFAULT 0,
    timeout_secs  INTEGER NOT NULL DEFAULT 120,
    active        INTEGER NOT NULL DEFAULT 1,
    position      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_llm_models_active
    ON llm_models(active, position);
";

/// Run all schema setup and migrations.
///
/// Called during pool initialization. Idempotent - existing tables and
/// indexes are left alone.
pub fn run_all_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_all_migrations(&conn).unwrap();
        run_all_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('organizations', 'categories', 'llm_models')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
