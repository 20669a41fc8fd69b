//! Error taxonomy for ingestion and reference editing.
//!
//! Store and I/O failures travel as [`anyhow::Error`]; the enums here cover
//! the cases the CLI reports to the user as a blocking notice.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unreadable spreadsheet: {0}")]
    Unreadable(String),

    #[error("The spreadsheet is empty or has no data rows")]
    EmptySheet,

    #[error("No speed violation data found in the spreadsheet")]
    NoViolations,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Reference store error: {0:#}")]
    Store(#[from] anyhow::Error),
}
