// src/db/mod.rs
// SQLite-backed taxonomy and model-registry storage

pub mod pool;
pub mod schema;
pub mod taxonomy;

pub use pool::DatabasePool;
pub use taxonomy::{
    SqliteStore, get_active_models_sync, get_level1_categories_sync, get_level2_categories_sync,
    insert_category_sync, insert_model_sync, insert_organization_sync,
};
