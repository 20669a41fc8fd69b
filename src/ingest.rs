//! Spreadsheet reader for speed-violation exports.
//!
//! Only the first sheet is read. Columns are positional; the header row is
//! skipped whatever its labels say.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::Serialize;
use tracing::debug;

use crate::error::IngestError;

/// One spreadsheet row as text cells. Empty cells are empty strings.
pub type RawRow = Vec<String>;

/// A single violation event, mapped positionally from a [`RawRow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViolationRecord {
    pub date: String,
    pub vehicle: String,
    pub driver: String,
    pub odometer: String,
    pub duration: String,
    pub speed: f64,
    pub max_rpm: String,
    pub event_type: String,
    pub event_description: String,
    pub limit: f64,
}

impl ViolationRecord {
    /// Maps cells 1 through 10 onto the record fields. Missing cells are
    /// treated as empty.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");

        ViolationRecord {
            date: cell(0).to_string(),
            vehicle: cell(1).trim().to_string(),
            driver: cell(2).to_string(),
            odometer: cell(3).to_string(),
            duration: cell(4).to_string(),
            speed: parse_decimal(cell(5)),
            max_rpm: cell(6).to_string(),
            event_type: cell(7).to_string(),
            event_description: cell(8).to_string(),
            limit: parse_decimal(cell(9)),
        }
    }

    /// Rows without a vehicle or with a zero speed never count as violations.
    pub fn is_violation(&self) -> bool {
        !self.vehicle.is_empty() && self.speed != 0.0
    }
}

/// Parses a decimal that may use a comma separator (`"95,5"`).
///
/// Only the first comma is replaced. The longest leading numeric prefix is
/// used, exponent included, so `"80 km/h"` parses as `80` and `"1e3"` as
/// `1000`. Anything else yields `0.0`.
pub fn parse_decimal(raw: &str) -> f64 {
    let normalized = raw.trim().replacen(',', ".", 1);
    let bytes = normalized.as_bytes();

    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let mut seen_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return 0.0;
    }
    end += exponent_len(&bytes[end..]);

    match normalized[..end].parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Length of a complete `e[+-]digits` suffix at the start of `bytes`, or 0.
fn exponent_len(bytes: &[u8]) -> usize {
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'-' | b'+')) {
        i += 1;
    }
    let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 { 0 } else { i + digits }
}

/// Reads the data rows of a spreadsheet held in memory.
///
/// `name` selects the format: a `.csv` extension goes through the CSV
/// reader, anything else is opened as a workbook (xlsx, xls, xlsb, ods).
///
/// # Errors
///
/// Returns [`IngestError::EmptySheet`] when there is no data row after the
/// header, and a format error when the bytes cannot be read.
pub fn load_rows(name: &str, bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let is_csv = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let rows = if is_csv {
        read_csv_rows(bytes)?
    } else {
        read_workbook_rows(bytes)?
    };

    debug!(name, rows = rows.len(), is_csv, "Spreadsheet rows read");

    if rows.is_empty() {
        return Err(IngestError::EmptySheet);
    }
    Ok(rows)
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    // Exports are often Windows-1252; invalid UTF-8 is replaced, not rejected.
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let row: RawRow = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        if !is_blank(&row) {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn read_workbook_rows(bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Unreadable("workbook has no sheets".to_string()))??;

    let rows = range
        .rows()
        .skip(1)
        .map(|cells| cells.iter().map(cell_text).collect::<RawRow>())
        .filter(|row| !is_blank(row))
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
