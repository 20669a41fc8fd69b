//! Trait and types for the hosted reference tables.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Table holding one row per plate: plate, group, optional model and category.
pub const PLATES_TABLE: &str = "grupos";

/// Table holding one row per category name.
pub const CATEGORIES_TABLE: &str = "categorias";

/// Body written to the plates table on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateRow {
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "grupo")]
    pub group: String,
    #[serde(rename = "modelo")]
    pub model: String,
}

/// Abstraction over the reference store (e.g., a Supabase project).
///
/// Every method is a single table operation. Callers that need several
/// writes issue them in sequence; nothing here is transactional.
#[async_trait::async_trait]
pub trait ReferenceApi: Send + Sync {
    /// Returns every plate row, ordered by group then plate, with the
    /// store's column order preserved.
    async fn fetch_plate_rows(&self) -> Result<Vec<Map<String, Value>>>;

    /// Returns every category name, ordered by name.
    async fn fetch_categories(&self) -> Result<Vec<String>>;

    async fn insert_plate(&self, row: &PlateRow) -> Result<()>;

    /// Rewrites the row currently keyed by `plate`.
    async fn update_plate(&self, plate: &str, row: &PlateRow) -> Result<()>;

    async fn delete_plate(&self, plate: &str) -> Result<()>;

    /// Sets the category of every row belonging to `group`.
    async fn set_group_category(&self, group: &str, category: Option<&str>) -> Result<()>;

    /// Replaces `from` with `to` in the category field of every plate row.
    async fn replace_row_category(&self, from: &str, to: Option<&str>) -> Result<()>;

    async fn insert_category(&self, name: &str) -> Result<()>;

    async fn rename_category(&self, from: &str, to: &str) -> Result<()>;

    async fn delete_category(&self, name: &str) -> Result<()>;
}
