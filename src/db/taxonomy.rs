// src/db/taxonomy.rs
// Row queries for the category tree and model registry, plus the pooled
// store handed to the pipeline.
//
// Rows are validated into typed values at this boundary; a malformed row is
// an error here, never a malformed prompt later.

use crate::db::pool::DatabasePool;
use crate::error::Result as MailroomResult;
use crate::taxonomy::{
    Backend, Category, CategoryParams, ModelDescriptor, ModelRegistry, TaxonomyStore,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rusqlite::{Connection, Row, params};
use std::sync::Arc;
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, org_id, parent_id, name, description, keywords, \
     level, use_keywords, high_threshold, medium_threshold, active";

fn parse_uuid(text: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(text).with_context(|| format!("invalid UUID in column {column}: {text}"))
}

fn category_from_row(row: &Row<'_>) -> Result<Category> {
    let id: String = row.get("id")?;
    let org_id: String = row.get("org_id")?;
    let parent_id: Option<String> = row.get("parent_id")?;
    let keywords_json: String = row.get("keywords")?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_json)
        .with_context(|| format!("invalid keywords JSON for category {id}"))?;
    let level: i64 = row.get("level")?;

    Category::new(CategoryParams {
        id: parse_uuid(&id, "id")?,
        org_id: parse_uuid(&org_id, "org_id")?,
        parent_id: parent_id
            .map(|p| parse_uuid(&p, "parent_id"))
            .transpose()?,
        name: row.get("name")?,
        description: row.get("description")?,
        keywords,
        level: u8::try_from(level).map_err(|_| anyhow!("category level {level} out of range"))?,
        use_keywords: row.get("use_keywords")?,
        high_threshold: row.get("high_threshold")?,
        medium_threshold: row.get("medium_threshold")?,
        active: row.get("active")?,
    })
    .map_err(Into::into)
}

/// Active level-1 categories for an organization, in name order.
pub fn get_level1_categories_sync(conn: &Connection, org_id: Uuid) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE org_id = ?1 AND level = 1 AND active = 1 AND parent_id IS NULL
         ORDER BY name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_and_then(params![org_id.to_string()], category_from_row)?;
    rows.collect()
}

/// Active level-2 children of a level-1 category, in name order.
pub fn get_level2_categories_sync(
    conn: &Connection,
    org_id: Uuid,
    parent_id: Uuid,
) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE org_id = ?1 AND parent_id = ?2 AND level = 2 AND active = 1
         ORDER BY name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_and_then(
        params![org_id.to_string(), parent_id.to_string()],
        category_from_row,
    )?;
    rows.collect()
}

/// Active model descriptors in configured (position) order.
pub fn get_active_models_sync(conn: &Connection) -> Result<Vec<ModelDescriptor>> {
    let mut stmt = conn.prepare(
        "SELECT id, backend, model, vision, timeout_secs, active FROM llm_models
         WHERE active = 1
         ORDER BY position, created_at",
    )?;
    let rows = stmt.query_and_then([], |row| {
        let id: String = row.get("id")?;
        let backend: String = row.get("backend")?;
        let timeout_secs: i64 = row.get("timeout_secs")?;
        Ok(ModelDescriptor {
            id: parse_uuid(&id, "id")?,
            backend: Backend::from_str(&backend)
                .ok_or_else(|| anyhow!("unknown backend '{backend}' for model {id}"))?,
            model: row.get("model")?,
            vision: row.get("vision")?,
            timeout_secs: u64::try_from(timeout_secs)
                .map_err(|_| anyhow!("negative timeout for model {id}"))?,
            active: row.get("active")?,
        })
    })?;
    rows.collect()
}

/// Insert an organization row (admin/test seeding).
pub fn insert_organization_sync(conn: &Connection, id: Uuid, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO organizations (id, name) VALUES (?1, ?2)",
        params![id.to_string(), name],
    )?;
    Ok(())
}

/// Insert a validated category row (admin/test seeding).
pub fn insert_category_sync(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories
         (id, org_id, parent_id, name, description, keywords,
          level, use_keywords, high_threshold, medium_threshold, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            category.id.to_string(),
            category.org_id.to_string(),
            category.parent_id.map(|p| p.to_string()),
            category.name,
            category.description,
            serde_json::to_string(&category.keywords)?,
            category.level as i64,
            category.use_keywords,
            category.high_threshold,
            category.medium_threshold,
            category.active,
        ],
    )?;
    Ok(())
}

/// Insert a model descriptor row at the given iteration position.
pub fn insert_model_sync(
    conn: &Connection,
    descriptor: &ModelDescriptor,
    position: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO llm_models (id, backend, model, vision, timeout_secs, active, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            descriptor.id.to_string(),
            descriptor.backend.to_string(),
            descriptor.model,
            descriptor.vision,
            descriptor.timeout_secs as i64,
            descriptor.active,
            position,
        ],
    )?;
    Ok(())
}

/// Pooled SQLite store implementing both read-only views the pipeline needs.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<DatabasePool>,
}

impl SqliteStore {
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<DatabasePool> {
        &self.pool
    }
}

#[async_trait]
impl TaxonomyStore for SqliteStore {
    async fn level1_categories(&self, org_id: Uuid) -> MailroomResult<Vec<Category>> {
        let categories = self
            .pool
            .interact(move |conn| get_level1_categories_sync(conn, org_id))
            .await?;
        Ok(categories)
    }

    async fn level2_categories(
        &self,
        org_id: Uuid,
        parent_id: Uuid,
    ) -> MailroomResult<Vec<Category>> {
        let categories = self
            .pool
            .interact(move |conn| get_level2_categories_sync(conn, org_id, parent_id))
            .await?;
        Ok(categories)
    }
}

#[async_trait]
impl ModelRegistry for SqliteStore {
    async fn active_models(&self) -> MailroomResult<Vec<ModelDescriptor>> {
        let models = self.pool.interact(get_active_models_sync).await?;
        Ok(models)
    }
}
