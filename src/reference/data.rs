//! The reference-data context: one immutable view of the `grupos` and
//! `categorias` tables.
//!
//! A [`ReferenceData`] is built from a full fetch and replaced wholesale on
//! every reload. Aggregation and projection receive it by reference.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::columns::ColumnMapping;
use super::plate::normalize_plate;

/// Group assigned to plates with no entry in the reference table.
pub const NO_GROUP: &str = "No group";

/// Synthetic bucket for groups without a category. Never stored.
pub const NO_CATEGORY: &str = "No category";

/// One row of the `grupos` table after column resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateRecord {
    pub plate: String,
    pub group: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
}

/// A group chip on the category board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardGroup {
    pub name: String,
    pub plates: usize,
}

/// A column of the category board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub name: String,
    pub groups: Vec<BoardGroup>,
    /// `true` for the trailing "No category" column.
    pub synthetic: bool,
}

/// Choices offered by the report filter selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Categories in use, alphabetical, with the number of groups in each.
    pub categories: Vec<(String, usize)>,
    pub groups: Vec<String>,
}

/// Offline export of both tables, as written by `--reference`.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    grupos: Vec<Map<String, Value>>,
    #[serde(default)]
    categorias: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    columns: ColumnMapping,
    records: Vec<PlateRecord>,
    categories: Vec<String>,
    plate_groups: HashMap<String, String>,
    group_categories: HashMap<String, String>,
    groups: Vec<String>,
}

impl ReferenceData {
    /// A context with no plates: every vehicle resolves to [`NO_GROUP`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the context from raw `grupos` rows and category names.
    ///
    /// Column names are resolved once from the first row. Rows without a
    /// plate are dropped. Records are kept ordered by group then plate and
    /// categories by name, the order the store returns them in.
    pub fn from_rows(rows: Vec<Map<String, Value>>, categories: Vec<String>) -> Self {
        let columns = rows
            .first()
            .map(|first| ColumnMapping::resolve(first.keys().map(String::as_str)))
            .unwrap_or_default();

        let mut records: Vec<PlateRecord> = rows
            .iter()
            .filter_map(|row| {
                Some(PlateRecord {
                    plate: columns.plate_of(row)?,
                    group: columns.group_of(row),
                    model: columns.model_of(row),
                    category: columns.category_of(row),
                })
            })
            .collect();
        records.sort_by(|a, b| {
            (a.group.is_none(), &a.group, &a.plate).cmp(&(b.group.is_none(), &b.group, &b.plate))
        });

        let mut categories = categories;
        categories.sort();
        categories.dedup();

        let mut data = ReferenceData {
            columns,
            records,
            categories,
            ..Default::default()
        };
        data.rebuild_maps();
        data
    }

    /// Parses an offline snapshot file: `{"grupos": [...], "categorias": [...]}`.
    pub fn from_snapshot_json(content: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(content).context("Invalid reference snapshot JSON")?;
        let categories = file.categorias.iter().filter_map(category_name_of).collect();
        Ok(Self::from_rows(file.grupos, categories))
    }

    fn rebuild_maps(&mut self) {
        let mut plate_groups = HashMap::new();
        let mut group_categories = HashMap::new();
        let mut groups = BTreeSet::new();

        for record in &self.records {
            let Some(group) = &record.group else {
                continue;
            };
            plate_groups.insert(normalize_plate(&record.plate), group.clone());
            groups.insert(group.clone());
            if let Some(category) = &record.category {
                group_categories
                    .entry(group.clone())
                    .or_insert_with(|| category.clone());
            }
        }

        self.plate_groups = plate_groups;
        self.group_categories = group_categories;
        self.groups = groups.into_iter().collect();
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn records(&self) -> &[PlateRecord] {
        &self.records
    }

    /// Stored category names, alphabetical.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Distinct group names, alphabetical.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn plate_count(&self) -> usize {
        self.plate_groups.len()
    }

    /// Resolves the group of a vehicle, or [`NO_GROUP`].
    pub fn group_for_plate(&self, plate: &str) -> &str {
        self.plate_groups
            .get(&normalize_plate(plate))
            .map(String::as_str)
            .unwrap_or(NO_GROUP)
    }

    pub fn category_for_group(&self, group: &str) -> Option<&str> {
        self.group_categories.get(group).map(String::as_str)
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Groups currently assigned to `category`.
    pub fn groups_in_category(&self, category: &str) -> BTreeSet<&str> {
        self.group_categories
            .iter()
            .filter(|(_, c)| c.as_str() == category)
            .map(|(g, _)| g.as_str())
            .collect()
    }

    pub fn filter_options(&self) -> FilterOptions {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for category in self.group_categories.values() {
            *counts.entry(category.as_str()).or_default() += 1;
        }

        FilterOptions {
            categories: counts
                .into_iter()
                .map(|(name, n)| (name.to_string(), n))
                .collect(),
            groups: self.groups.clone(),
        }
    }

    /// Case-insensitive substring search over plate, group and model.
    /// An empty query returns every record.
    pub fn search(&self, query: &str) -> Vec<&PlateRecord> {
        let needle = query.trim().to_lowercase();
        let hit = |field: Option<&str>| {
            field.is_some_and(|f| f.to_lowercase().contains(&needle))
        };
        self.records
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || hit(Some(r.plate.as_str()))
                    || hit(r.group.as_deref())
                    || hit(r.model.as_deref())
            })
            .collect()
    }

    /// Number of plate rows per group.
    pub fn vehicle_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for group in self.records.iter().filter_map(|r| r.group.as_deref()) {
            *counts.entry(group).or_default() += 1;
        }
        counts
    }

    /// The category board: one column per stored category, then the
    /// synthetic [`NO_CATEGORY`] column.
    ///
    /// A group whose category is not a stored category lands in the
    /// synthetic column.
    pub fn board(&self) -> Vec<BoardColumn> {
        let counts = self.vehicle_counts();
        let chip = |name: &str| BoardGroup {
            name: name.to_string(),
            plates: counts.get(name).copied().unwrap_or(0),
        };

        let mut columns: Vec<BoardColumn> = self
            .categories
            .iter()
            .map(|category| BoardColumn {
                name: category.clone(),
                groups: self
                    .groups
                    .iter()
                    .filter(|g| self.category_for_group(g) == Some(category.as_str()))
                    .map(|g| chip(g))
                    .collect(),
                synthetic: false,
            })
            .collect();

        let unassigned = self
            .groups
            .iter()
            .filter(|g| !self.category_for_group(g).is_some_and(|c| self.has_category(c)))
            .map(|g| chip(g))
            .collect();
        columns.push(BoardColumn {
            name: NO_CATEGORY.to_string(),
            groups: unassigned,
            synthetic: true,
        });

        columns
    }

    /// Moves every row of `group` to `category` locally, ahead of the store
    /// write. The result may be stale until the next reload.
    pub fn reassign_group(&mut self, group: &str, category: Option<&str>) {
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.group.as_deref() == Some(group))
        {
            record.category = category.map(str::to_string);
        }
        self.rebuild_maps();
    }
}

/// Extracts a category name from a `categorias` row, or a bare string.
pub fn category_name_of(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s.as_str(),
        Value::Object(row) => row
            .get("nome")
            .or_else(|| row.get("name"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
