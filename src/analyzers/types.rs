//! Data types shared by aggregation, projection and rendering.

use serde::Serialize;

/// Violation summary for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle: String,
    pub violation_count: usize,
    pub top_speed: f64,
    /// Posted limit on the event that produced `top_speed`.
    pub limit_at_top_speed: f64,
    pub group: String,
}

impl VehicleSummary {
    /// How far the top speed was above its own limit.
    pub fn excess(&self) -> f64 {
        self.top_speed - self.limit_at_top_speed
    }
}

/// Totals over the filtered vehicle set, shown as the summary cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_violations: usize,
    pub vehicle_count: usize,
    pub max_top_speed: f64,
    /// First vehicle in sorted order, `None` when nothing passed the filter.
    pub fastest_vehicle: Option<String>,
    /// Mean of `top_speed - limit_at_top_speed`, one decimal.
    pub mean_excess: f64,
}

/// A category heading in the by-category layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryHeading {
    pub name: String,
    pub group_count: usize,
    pub vehicle_count: usize,
    pub violation_count: usize,
    pub synthetic: bool,
}

/// One rendered table: a titled run of vehicles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Titles from the outermost level inward, e.g. `["Carga Seca", "Graneleiro"]`.
    pub path: Vec<String>,
    pub vehicles: Vec<VehicleSummary>,
    /// Zero-based running index of the first vehicle.
    pub start_index: usize,
    /// Set on the first bucket of each category in the by-category layout.
    pub category: Option<CategoryHeading>,
}

impl Bucket {
    pub fn title(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    pub fn violation_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.violation_count).sum()
    }
}

/// Output of the projector, ready for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub buckets: Vec<Bucket>,
    pub stats: ReportStats,
}
