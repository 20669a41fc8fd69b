//! Plate, group and category reference data.
//!
//! [`ReferenceData`] is the read-only context handed to aggregation and
//! projection. [`ReferenceEditor`] wraps a [`ReferenceApi`] store and keeps a
//! fresh [`ReferenceData`] after every mutation.
//!
//! [`ReferenceApi`]: crate::services::reference_api::ReferenceApi

pub mod columns;
pub mod data;
pub mod editor;
pub mod plate;

pub use columns::ColumnMapping;
pub use data::{
    BoardColumn, BoardGroup, FilterOptions, NO_CATEGORY, NO_GROUP, PlateRecord, ReferenceData,
};
pub use editor::ReferenceEditor;
pub use plate::normalize_plate;
