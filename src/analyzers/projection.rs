//! Filtering and grouping of vehicle summaries for display.
//!
//! The projector never re-reads the spreadsheet: it works on the sorted
//! summaries from [`aggregate`](crate::analyzers::aggregate::aggregate) and
//! the current [`ReferenceData`].

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::analyzers::types::{Bucket, CategoryHeading, Projection, ReportStats, VehicleSummary};
use crate::analyzers::utility::{mean, round1};
use crate::reference::{NO_CATEGORY, NO_GROUP, ReferenceData};

/// Vehicles on the first page of the flat layout.
pub const TOP_N: usize = 10;

pub const TOP_TITLE: &str = "Top 10 - Highest speeds";
pub const OTHERS_TITLE: &str = "Other vehicles";

/// Which vehicles the report includes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    /// Exact group name.
    Group(String),
    /// Every group currently assigned to the category.
    Category(String),
}

impl FromStr for Filter {
    type Err = Infallible;

    /// `all` (or empty) selects everything, `cat:<name>` a category,
    /// `group:<name>` or any other text a group.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "" | "all" | "__all" => Filter::All,
            _ => match s.strip_prefix("cat:") {
                Some(category) => Filter::Category(category.trim().to_string()),
                None => Filter::Group(s.strip_prefix("group:").unwrap_or(s).trim().to_string()),
            },
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "All"),
            Filter::Group(g) => write!(f, "Group: {g}"),
            Filter::Category(c) => write!(f, "Category: {c}"),
        }
    }
}

impl Filter {
    /// Returns the matching summaries in their original order.
    pub fn apply(&self, summaries: &[VehicleSummary], reference: &ReferenceData) -> Vec<VehicleSummary> {
        match self {
            Filter::All => summaries.to_vec(),
            Filter::Group(group) => summaries
                .iter()
                .filter(|v| &v.group == group)
                .cloned()
                .collect(),
            Filter::Category(category) => {
                let groups = reference.groups_in_category(category);
                summaries
                    .iter()
                    .filter(|v| groups.contains(v.group.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }
}

/// How the filtered vehicles are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Top 10, then everyone else.
    #[default]
    Flat,
    /// One table per group, alphabetical.
    ByGroup,
    /// Categories alphabetical ("no category" last), groups within them.
    ByCategory,
}

/// Applies `filter`, computes the summary statistics and lays out the
/// buckets for `mode`. The running index is contiguous across buckets.
pub fn project(
    summaries: &[VehicleSummary],
    filter: &Filter,
    mode: DisplayMode,
    reference: &ReferenceData,
) -> Projection {
    let filtered = filter.apply(summaries, reference);
    let stats = compute_stats(&filtered);

    let buckets = match mode {
        DisplayMode::Flat => flat_buckets(filtered),
        DisplayMode::ByGroup => group_buckets(filtered),
        DisplayMode::ByCategory => category_buckets(filtered, reference),
    };

    Projection { buckets, stats }
}

/// Summary statistics over an already-filtered, sorted set.
pub fn compute_stats(filtered: &[VehicleSummary]) -> ReportStats {
    let excesses: Vec<f64> = filtered.iter().map(VehicleSummary::excess).collect();

    ReportStats {
        total_violations: filtered.iter().map(|v| v.violation_count).sum(),
        vehicle_count: filtered.len(),
        // Input is sorted by top speed, descending.
        max_top_speed: filtered.first().map_or(0.0, |v| v.top_speed),
        fastest_vehicle: filtered.first().map(|v| v.vehicle.clone()),
        mean_excess: round1(mean(&excesses)),
    }
}

fn flat_buckets(mut filtered: Vec<VehicleSummary>) -> Vec<Bucket> {
    if filtered.is_empty() {
        return Vec::new();
    }

    let rest = filtered.split_off(filtered.len().min(TOP_N));
    let mut buckets = vec![Bucket {
        path: vec![TOP_TITLE.to_string()],
        vehicles: filtered,
        start_index: 0,
        category: None,
    }];
    if !rest.is_empty() {
        buckets.push(Bucket {
            path: vec![OTHERS_TITLE.to_string()],
            vehicles: rest,
            start_index: TOP_N,
            category: None,
        });
    }
    buckets
}

fn partition_by_group(vehicles: Vec<VehicleSummary>) -> BTreeMap<String, Vec<VehicleSummary>> {
    let mut groups: BTreeMap<String, Vec<VehicleSummary>> = BTreeMap::new();
    for v in vehicles {
        let key = if v.group.is_empty() {
            NO_GROUP.to_string()
        } else {
            v.group.clone()
        };
        groups.entry(key).or_default().push(v);
    }
    groups
}

fn group_buckets(filtered: Vec<VehicleSummary>) -> Vec<Bucket> {
    let mut index = 0;
    partition_by_group(filtered)
        .into_iter()
        .map(|(group, vehicles)| {
            let bucket = Bucket {
                path: vec![group],
                start_index: index,
                vehicles,
                category: None,
            };
            index += bucket.vehicles.len();
            bucket
        })
        .collect()
}

fn category_buckets(filtered: Vec<VehicleSummary>, reference: &ReferenceData) -> Vec<Bucket> {
    // Keyed by (is synthetic, name) so the "no category" bucket sorts last.
    let mut categories: BTreeMap<(bool, String), Vec<VehicleSummary>> = BTreeMap::new();
    for v in filtered {
        let key = match reference.category_for_group(&v.group) {
            Some(category) => (false, category.to_string()),
            None => (true, NO_CATEGORY.to_string()),
        };
        categories.entry(key).or_default().push(v);
    }

    let mut buckets = Vec::new();
    let mut index = 0;

    for ((synthetic, category), vehicles) in categories {
        let vehicle_count = vehicles.len();
        let violation_count = vehicles.iter().map(|v| v.violation_count).sum();
        let groups = partition_by_group(vehicles);

        let mut heading = Some(CategoryHeading {
            name: category.clone(),
            group_count: groups.len(),
            vehicle_count,
            violation_count,
            synthetic,
        });

        for (group, vehicles) in groups {
            let len = vehicles.len();
            buckets.push(Bucket {
                path: vec![category.clone(), group],
                vehicles,
                start_index: index,
                category: heading.take(),
            });
            index += len;
        }
    }

    buckets
}
