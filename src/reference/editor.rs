//! Create, update and delete operations over the reference tables.
//!
//! Every mutation is followed by a full reload of both tables; the local
//! snapshot is never patched incrementally. When a write fails the snapshot
//! is re-fetched as well, so optimistic local state never outlives an error.
//!
//! Category rename and delete touch both tables in two separate writes. A
//! failure between them leaves the store partially updated and is surfaced
//! only as the returned error.

use anyhow::Result;
use tracing::{info, warn};

use super::data::ReferenceData;
use crate::error::EditorError;
use crate::services::reference_api::{PlateRow, ReferenceApi};

pub struct ReferenceEditor<A> {
    api: A,
    data: ReferenceData,
}

impl<A: ReferenceApi> ReferenceEditor<A> {
    /// Creates an editor with an empty snapshot. Call [`Self::reload`] to fill it.
    pub fn new(api: A) -> Self {
        Self {
            api,
            data: ReferenceData::empty(),
        }
    }

    /// Creates an editor and loads the first snapshot.
    pub async fn connect(api: A) -> Result<Self> {
        let mut editor = Self::new(api);
        editor.reload().await?;
        Ok(editor)
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn into_data(self) -> ReferenceData {
        self.data
    }

    /// Fetches both tables and replaces the snapshot. On failure the
    /// previous snapshot is kept.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&mut self) -> Result<&ReferenceData> {
        let (rows, categories) =
            tokio::try_join!(self.api.fetch_plate_rows(), self.api.fetch_categories())?;

        self.data = ReferenceData::from_rows(rows, categories);
        info!(
            groups = self.data.groups().len(),
            plates = self.data.plate_count(),
            categories = self.data.categories().len(),
            "Reference data loaded"
        );
        Ok(&self.data)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_plate(
        &mut self,
        plate: &str,
        group: &str,
        model: &str,
    ) -> Result<(), EditorError> {
        let row = plate_row(plate, group, model)?;
        let result = self.api.insert_plate(&row).await;
        self.settle(result).await
    }

    /// Rewrites the row stored under `original_plate`.
    #[tracing::instrument(skip(self))]
    pub async fn update_plate(
        &mut self,
        original_plate: &str,
        plate: &str,
        group: &str,
        model: &str,
    ) -> Result<(), EditorError> {
        let row = plate_row(plate, group, model)?;
        let result = self.api.update_plate(original_plate, &row).await;
        self.settle(result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_plate(&mut self, plate: &str) -> Result<(), EditorError> {
        let result = self.api.delete_plate(plate).await;
        self.settle(result).await
    }

    /// Creates a category. Names are compared case-insensitively against
    /// the current snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(&mut self, name: &str) -> Result<(), EditorError> {
        let name = required(name, "category name")?;
        if self
            .data
            .categories()
            .iter()
            .any(|c| c.to_lowercase() == name.to_lowercase())
        {
            return Err(EditorError::DuplicateCategory(name));
        }

        let result = self.api.insert_category(&name).await;
        self.settle(result).await
    }

    /// Renames the category record, then every plate row pointing at it.
    ///
    /// `from` must be a stored category. `to` may not collide,
    /// case-insensitively, with any other stored category.
    #[tracing::instrument(skip(self))]
    pub async fn rename_category(&mut self, from: &str, to: &str) -> Result<(), EditorError> {
        let to = required(to, "category name")?;
        if !self.data.has_category(from) {
            return Err(EditorError::UnknownCategory(from.to_string()));
        }
        if self
            .data
            .categories()
            .iter()
            .any(|c| c != from && c.to_lowercase() == to.to_lowercase())
        {
            return Err(EditorError::DuplicateCategory(to));
        }

        let result = async {
            self.api.rename_category(from, &to).await?;
            self.api.replace_row_category(from, Some(&to)).await
        }
        .await;
        self.settle(result).await
    }

    /// Clears the category on every plate row pointing at it, then deletes
    /// the category record. Its groups fall back to "no category".
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&mut self, name: &str) -> Result<(), EditorError> {
        let result = async {
            self.api.replace_row_category(name, None).await?;
            self.api.delete_category(name).await
        }
        .await;
        self.settle(result).await
    }

    /// Moves `group` to `category` (`None` for "no category").
    ///
    /// The snapshot is updated before the store write resolves. If the write
    /// fails the snapshot is re-fetched, discarding the optimistic change.
    #[tracing::instrument(skip(self))]
    pub async fn move_group(
        &mut self,
        group: &str,
        category: Option<&str>,
    ) -> Result<(), EditorError> {
        if let Some(category) = category {
            if !self.data.has_category(category) {
                return Err(EditorError::UnknownCategory(category.to_string()));
            }
        }

        self.data.reassign_group(group, category);

        let result = self.api.set_group_category(group, category).await;
        self.settle(result).await
    }

    /// Reloads after a write, whatever its outcome, and reports the write's
    /// result.
    async fn settle(&mut self, result: Result<()>) -> Result<(), EditorError> {
        match result {
            Ok(()) => {
                self.reload().await?;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Reference store write failed, resyncing");
                if let Err(reload_err) = self.reload().await {
                    warn!(error = %reload_err, "Resync after failed write also failed");
                }
                Err(EditorError::Store(e))
            }
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, EditorError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EditorError::MissingField(field));
    }
    Ok(value.to_string())
}

fn plate_row(plate: &str, group: &str, model: &str) -> Result<PlateRow, EditorError> {
    Ok(PlateRow {
        plate: required(plate, "plate")?.to_uppercase(),
        group: required(group, "group")?,
        model: model.trim().to_string(),
    })
}
