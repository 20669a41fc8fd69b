//! The report session: one loaded spreadsheet, the reference snapshot and the
//! current view settings.
//!
//! Changing the filter or the layout re-projects the stored summaries; only
//! [`Dashboard::load`] reads a spreadsheet.

use chrono::Local;
use tracing::{info, warn};

use crate::analyzers::aggregate::{aggregate, regroup};
use crate::analyzers::projection::{DisplayMode, Filter, project};
use crate::analyzers::types::VehicleSummary;
use crate::error::IngestError;
use crate::ingest::{ViolationRecord, load_rows};
use crate::output::{DEFAULT_WATERMARK, Report};
use crate::reference::ReferenceData;

pub struct Dashboard {
    reference: ReferenceData,
    source_name: Option<String>,
    total_rows: usize,
    vehicles: Vec<VehicleSummary>,
    filter: Filter,
    mode: DisplayMode,
    watermark: String,
}

impl Dashboard {
    pub fn new(reference: ReferenceData) -> Self {
        Self {
            reference,
            source_name: None,
            total_rows: 0,
            vehicles: Vec::new(),
            filter: Filter::All,
            mode: DisplayMode::Flat,
            watermark: DEFAULT_WATERMARK.to_string(),
        }
    }

    /// Reads and aggregates a spreadsheet, replacing whatever was loaded.
    ///
    /// Returns the number of vehicles with violations. On error the session
    /// keeps its previous state.
    #[tracing::instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<usize, IngestError> {
        let rows = load_rows(name, bytes)?;
        let records: Vec<ViolationRecord> =
            rows.iter().map(|row| ViolationRecord::from_cells(row)).collect();

        let vehicles = aggregate(&records, &self.reference);
        if vehicles.is_empty() {
            warn!(name, rows = rows.len(), "No violation rows in spreadsheet");
            return Err(IngestError::NoViolations);
        }

        info!(name, rows = rows.len(), vehicles = vehicles.len(), "Spreadsheet loaded");
        self.source_name = Some(name.to_string());
        self.total_rows = rows.len();
        self.vehicles = vehicles;
        Ok(self.vehicles.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.source_name.is_some()
    }

    pub fn vehicles(&self) -> &[VehicleSummary] {
        &self.vehicles
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn set_watermark(&mut self, text: impl Into<String>) {
        self.watermark = text.into();
    }

    /// Swaps in a fresh reference snapshot and re-resolves vehicle groups.
    /// Counts and speeds are kept.
    pub fn replace_reference(&mut self, reference: ReferenceData) {
        self.reference = reference;
        regroup(&mut self.vehicles, &self.reference);
    }

    /// Projects the loaded summaries with the current settings. `None` until
    /// a spreadsheet is loaded.
    pub fn report(&self) -> Option<Report> {
        let source_name = self.source_name.clone()?;
        Some(Report {
            source_name,
            total_rows: self.total_rows,
            filter: self.filter.clone(),
            mode: self.mode,
            generated_at: Local::now(),
            watermark: self.watermark.clone(),
            projection: project(&self.vehicles, &self.filter, self.mode, &self.reference),
        })
    }
}
