//! Violation aggregation and report projection.
//!
//! This module folds violation records into per-vehicle summaries, filters
//! and groups them for display, computes the summary cards and grades top
//! speeds for the report badges.

pub mod aggregate;
pub mod grade;
pub mod projection;
pub mod types;
pub mod utility;
