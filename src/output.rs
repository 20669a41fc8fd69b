//! Report rendering and persistence.
//!
//! Produces a self-contained, printable HTML document (print or "save as
//! PDF" from the browser), plus CSV and JSON exports of the same rows.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::grade::grade;
use crate::analyzers::projection::{DisplayMode, Filter};
use crate::analyzers::types::{Bucket, Projection, VehicleSummary};
use crate::analyzers::utility::format_speed;

pub const DEFAULT_WATERMARK: &str = "TELEMETRY SPEED REPORT";

/// Vertical distance between watermark rows, in pixels.
const WATERMARK_SPACING_Y: usize = 200;
const WATERMARK_COLS: usize = 3;
const WATERMARK_OFFSET_Y: usize = 60;

// Layout estimates used to size the watermark layer.
const HEADER_HEIGHT: usize = 280;
const SECTION_HEIGHT: usize = 130;
const ROW_HEIGHT: usize = 45;
const HEADING_HEIGHT: usize = 55;
const FOOTER_HEIGHT: usize = 90;

/// Everything the renderer needs: the projection plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source_name: String,
    /// Data rows read from the spreadsheet, valid or not.
    pub total_rows: usize,
    pub filter: Filter,
    pub mode: DisplayMode,
    pub generated_at: DateTime<Local>,
    pub watermark: String,
    pub projection: Projection,
}

/// One exported table row.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    position: usize,
    section: String,
    vehicle: &'a str,
    group: &'a str,
    violations: usize,
    top_speed: f64,
    limit: f64,
    excess: f64,
}

/// File name stamped with the report date, e.g. `speed-report-2025-03-01.html`.
pub fn default_report_name(date: NaiveDate) -> String {
    format!("speed-report-{}.html", date.format("%Y-%m-%d"))
}

/// Logs the summary cards.
pub fn print_summary(report: &Report) {
    let stats = &report.projection.stats;
    info!(
        source = %report.source_name,
        rows = report.total_rows,
        filter = %report.filter,
        total_violations = stats.total_violations,
        vehicles = stats.vehicle_count,
        max_top_speed = stats.max_top_speed,
        fastest_vehicle = stats.fastest_vehicle.as_deref().unwrap_or("-"),
        mean_excess = stats.mean_excess,
        "Report summary"
    );
}

/// Writes the HTML report to `path`.
pub fn write_html(path: &Path, report: &Report) -> Result<()> {
    let html = render_html(report);
    fs::write(path, &html).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = html.len(), "HTML report written");
    Ok(())
}

/// Writes every table row to a CSV file, with headers, replacing it if present.
pub fn write_csv(path: &Path, report: &Report) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for bucket in &report.projection.buckets {
        for (offset, v) in bucket.vehicles.iter().enumerate() {
            writer.serialize(ReportRow {
                position: bucket.start_index + offset + 1,
                section: bucket.path.join(" / "),
                vehicle: &v.vehicle,
                group: &v.group,
                violations: v.violation_count,
                top_speed: v.top_speed,
                limit: v.limit_at_top_speed,
                excess: v.excess(),
            })?;
        }
    }
    writer.flush()?;

    debug!(path = %path.display(), "CSV report written");
    Ok(())
}

/// Writes the whole report as pretty-printed JSON.
pub fn write_json(path: &Path, report: &Report) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Renders the report as a standalone HTML document.
pub fn render_html(report: &Report) -> String {
    let title = format!("Speed violations - {}", report.source_name);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="report-content">
        {watermark}
        <div class="report-page">
            {meta}
            {summary}
            {tables}
            {footer}
        </div>
    </div>
</body>
</html>"#,
        title = html_escape(&title),
        css = inline_css(),
        watermark = render_watermark(&report.watermark, estimate_height(&report.projection)),
        meta = render_meta(report),
        summary = render_summary(report),
        tables = render_tables(&report.projection, report.mode),
        footer = render_footer(report),
    )
}

fn render_meta(report: &Report) -> String {
    let filter = match &report.filter {
        Filter::All => String::new(),
        other => format!(" &middot; {}", html_escape(&other.to_string())),
    };

    format!(
        r#"<div class="report-meta-bar">
    <div class="meta-item">File: <strong>{source}</strong></div>
    <div class="meta-item">Generated: <strong>{generated}</strong></div>
    <div class="meta-item">Rows: <strong>{rows}</strong>{filter}</div>
</div>"#,
        source = html_escape(&report.source_name),
        generated = report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        rows = report.total_rows,
        filter = filter,
    )
}

fn render_summary(report: &Report) -> String {
    let stats = &report.projection.stats;
    let fastest = stats.fastest_vehicle.as_deref().unwrap_or("-");

    format!(
        r#"<div class="summary-grid">
    <div class="stat-card red"><span class="stat-label">Total violations</span><span class="stat-value">{total}</span><span class="stat-sub">{vehicles} vehicles involved</span></div>
    <div class="stat-card amber"><span class="stat-label">Highest speed</span><span class="stat-value">{max}</span><span class="stat-sub">km/h recorded</span></div>
    <div class="stat-card blue"><span class="stat-label">Fastest vehicle</span><span class="stat-value small">{fastest}</span><span class="stat-sub">highest recorded speed</span></div>
    <div class="stat-card green"><span class="stat-label">Mean excess</span><span class="stat-value">{excess:.1}</span><span class="stat-sub">km/h above the limit</span></div>
</div>"#,
        total = stats.total_violations,
        vehicles = stats.vehicle_count,
        max = format_speed(stats.max_top_speed),
        fastest = html_escape(fastest),
        excess = stats.mean_excess,
    )
}

fn render_tables(projection: &Projection, mode: DisplayMode) -> String {
    let mut html = String::new();
    let total = projection.stats.vehicle_count;

    for (i, bucket) in projection.buckets.iter().enumerate() {
        if let Some(heading) = &bucket.category {
            let _ = write!(
                html,
                r#"<div class="category-heading{synthetic}"><span>{name}</span><span class="category-stats">{groups} &middot; {vehicles} &middot; {violations}</span></div>"#,
                synthetic = if heading.synthetic { " synthetic" } else { "" },
                name = html_escape(&heading.name),
                groups = plural(heading.group_count, "group", "groups"),
                vehicles = plural(heading.vehicle_count, "vehicle", "vehicles"),
                violations = plural(heading.violation_count, "violation", "violations"),
            );
        }

        // The flat layout prints the top ten on the first page.
        let (subtitle, page_break) = match (mode, i) {
            (DisplayMode::Flat, 0) => ("Sorted by highest recorded speed (descending)".to_string(), false),
            (DisplayMode::Flat, _) => (
                format!("Positions {}-{} of {} vehicles", bucket.start_index + 1, total, total),
                true,
            ),
            _ => (
                format!(
                    "{}, {}",
                    plural(bucket.vehicles.len(), "vehicle", "vehicles"),
                    plural(bucket.violation_count(), "violation", "violations")
                ),
                false,
            ),
        };

        if page_break {
            html.push_str(r#"<div class="page-marker">Page 1 of 2</div>"#);
        }
        html.push_str(&render_section(bucket, &subtitle, page_break));
    }

    if projection.buckets.is_empty() {
        html.push_str(r#"<div class="empty">No vehicles match the current filter.</div>"#);
    }

    html
}

fn render_section(bucket: &Bucket, subtitle: &str, page_break: bool) -> String {
    let rows: String = bucket
        .vehicles
        .iter()
        .enumerate()
        .map(|(offset, v)| render_row(bucket.start_index + offset + 1, v))
        .collect();

    format!(
        r#"<div class="section-card{page_break}">
    <div class="section-card-header">
        <div class="section-card-title">{title}</div>
        <div class="section-card-subtitle">{subtitle}</div>
    </div>
    <table class="data-table">
        <thead>
            <tr><th>#</th><th>Vehicle</th><th>Violations</th><th>Top speed</th><th>Limit</th><th>Excess</th></tr>
        </thead>
        <tbody>{rows}</tbody>
    </table>
</div>"#,
        page_break = if page_break { " page-break" } else { "" },
        title = html_escape(bucket.title()),
        subtitle = html_escape(subtitle),
        rows = rows,
    )
}

fn render_row(position: usize, v: &VehicleSummary) -> String {
    format!(
        r#"<tr><td>{position}</td><td class="cell-vehicle"><div>{vehicle}</div><div class="vehicle-group-tag">{group}</div></td><td>{count}</td><td><span class="badge {badge}">{top} km/h</span></td><td>{limit} km/h</td><td><span class="badge badge-danger">+{excess} km/h</span></td></tr>"#,
        vehicle = html_escape(&v.vehicle),
        group = html_escape(&v.group),
        count = v.violation_count,
        badge = grade(v.top_speed).css_class(),
        top = format_speed(v.top_speed),
        limit = format_speed(v.limit_at_top_speed),
        excess = format_speed(v.excess()),
    )
}

fn render_footer(report: &Report) -> String {
    format!(
        r#"<div class="report-footer">
    <p>Report generated automatically from telemetry data</p>
    <p>{}</p>
</div>"#,
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Approximate rendered height of the report, in pixels.
fn estimate_height(projection: &Projection) -> usize {
    let tables: usize = projection
        .buckets
        .iter()
        .map(|b| {
            let heading = if b.category.is_some() { HEADING_HEIGHT } else { 0 };
            heading + SECTION_HEIGHT + b.vehicles.len() * ROW_HEIGHT
        })
        .sum();
    HEADER_HEIGHT + tables + FOOTER_HEIGHT
}

/// Number of watermark rows covering `height` pixels.
fn watermark_rows(height: usize) -> usize {
    height.div_ceil(WATERMARK_SPACING_Y)
}

/// A layer of repeated text tiles spanning the whole content height.
fn render_watermark(text: &str, height: usize) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = html_escape(text);
    let mut html = format!(r#"<div class="watermark-layer" style="height:{height}px">"#);
    for row in 0..watermark_rows(height) {
        for col in 0..WATERMARK_COLS {
            let left = (col as f64 + 0.5) / WATERMARK_COLS as f64 * 100.0;
            let top = row * WATERMARK_SPACING_Y + WATERMARK_OFFSET_Y;
            let _ = write!(
                html,
                r#"<div class="watermark-item" style="top:{top}px;left:{left:.4}%">{text}</div>"#
            );
        }
    }
    html.push_str("</div>");
    html
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, "Segoe UI", sans-serif; color: #0f172a; background: #f1f5f9; }
.report-content { position: relative; max-width: 1100px; margin: 0 auto; background: #fff; overflow: hidden; }
.report-page { position: relative; z-index: 1; padding: 2rem; }
.watermark-layer { position: absolute; top: 0; left: 0; width: 100%; pointer-events: none; z-index: 0; }
.watermark-item { position: absolute; transform: translateX(-50%) rotate(-30deg); white-space: nowrap; font-size: 1.1rem; font-weight: 700; letter-spacing: 0.2em; color: rgba(15, 23, 42, 0.06); }
.report-meta-bar { display: flex; flex-wrap: wrap; gap: 1.5rem; padding: 0.75rem 1rem; border: 1px solid #e2e8f0; border-radius: 8px; font-size: 0.85rem; margin-bottom: 1.5rem; }
.summary-grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; margin-bottom: 1.5rem; }
.stat-card { display: flex; flex-direction: column; padding: 1rem; border: 1px solid #e2e8f0; border-radius: 8px; border-top-width: 4px; }
.stat-card.red { border-top-color: #dc2626; }
.stat-card.amber { border-top-color: #d97706; }
.stat-card.blue { border-top-color: #2563eb; }
.stat-card.green { border-top-color: #16a34a; }
.stat-label { font-size: 0.75rem; text-transform: uppercase; color: #64748b; }
.stat-value { font-size: 1.75rem; font-weight: 700; }
.stat-value.small { font-size: 1.1rem; }
.stat-sub { font-size: 0.75rem; color: #64748b; }
.category-heading { display: flex; justify-content: space-between; margin: 1.5rem 0 0.75rem; padding: 0.5rem 0.75rem; background: #0f172a; color: #fff; border-radius: 6px; font-weight: 600; }
.category-heading.synthetic { background: #475569; }
.category-stats { font-weight: 400; font-size: 0.85rem; }
.section-card { border: 1px solid #e2e8f0; border-radius: 8px; margin-bottom: 1.5rem; break-inside: avoid-page; }
.section-card-header { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; }
.section-card-title { font-weight: 600; }
.section-card-subtitle { font-size: 0.8rem; color: #64748b; }
.data-table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
.data-table th, .data-table td { padding: 0.5rem 0.75rem; text-align: left; border-bottom: 1px solid #f1f5f9; }
.data-table tr { break-inside: avoid; }
.vehicle-group-tag { font-size: 0.7rem; color: #64748b; }
.badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 999px; font-weight: 600; font-size: 0.8rem; }
.badge-success { background: #dcfce7; color: #166534; }
.badge-warning { background: #fef3c7; color: #92400e; }
.badge-danger { background: #fee2e2; color: #991b1b; }
.page-marker { text-align: center; font-size: 0.75rem; color: #94a3b8; margin-bottom: 1.5rem; }
.empty { padding: 2rem; text-align: center; color: #64748b; }
.report-footer { text-align: center; font-size: 0.75rem; color: #94a3b8; padding-top: 1rem; }
@media print {
    body { background: #fff; }
    .report-content { max-width: none; }
    .page-break { break-before: page; }
    .page-marker { display: none; }
}
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::projection::project;
    use crate::reference::ReferenceData;
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn summary(vehicle: &str, group: &str, count: usize, top: f64, limit: f64) -> VehicleSummary {
        VehicleSummary {
            vehicle: vehicle.to_string(),
            violation_count: count,
            top_speed: top,
            limit_at_top_speed: limit,
            group: group.to_string(),
        }
    }

    fn report(vehicles: &[VehicleSummary], mode: DisplayMode) -> Report {
        Report {
            source_name: "march<export>.xlsx".to_string(),
            total_rows: 42,
            filter: Filter::All,
            mode,
            generated_at: Local::now(),
            watermark: DEFAULT_WATERMARK.to_string(),
            projection: project(vehicles, &Filter::All, mode, &ReferenceData::empty()),
        }
    }

    fn many(n: usize) -> Vec<VehicleSummary> {
        (0..n)
            .map(|i| summary(&format!("V{i:02}"), "Frota", 1, 130.0 - i as f64, 80.0))
            .collect()
    }

    #[test]
    fn test_default_report_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(default_report_name(date), "speed-report-2025-03-01.html");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_watermark_rows() {
        assert_eq!(watermark_rows(0), 0);
        assert_eq!(watermark_rows(1), 1);
        assert_eq!(watermark_rows(200), 1);
        assert_eq!(watermark_rows(201), 2);
    }

    #[test]
    fn test_watermark_tiles() {
        let html = render_watermark("MARK", 401);
        assert_eq!(html.matches("watermark-item").count(), 9);
        assert!(html.contains("top:460px;left:50.0000%"));
        assert!(render_watermark("  ", 401).is_empty());
    }

    #[test]
    fn test_render_html_flat() {
        let html = render_html(&report(&many(12), DisplayMode::Flat));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("march&lt;export&gt;.xlsx"));
        assert!(html.contains(crate::analyzers::projection::TOP_TITLE));
        assert!(html.contains("Positions 11-12 of 12 vehicles"));
        assert!(html.contains("page-break"));
        assert!(html.contains("badge-danger\">130 km/h"));
        assert!(html.contains("<td>12</td>"));
        assert_eq!(html.matches("<tr><td>").count(), 12);
    }

    #[test]
    fn test_render_html_by_category_headings() {
        let vehicles = vec![summary("A", "G1", 2, 95.5, 80.0)];
        let html = render_html(&report(&vehicles, DisplayMode::ByCategory));

        assert!(html.contains("category-heading synthetic"));
        assert!(html.contains("1 group &middot; 1 vehicle &middot; 2 violations"));
        assert!(html.contains("+15.5 km/h"));
        assert!(html.contains("1 vehicle, 2 violations"));
        assert!(html.contains("badge-success"));
    }

    #[test]
    fn test_render_html_empty() {
        let html = render_html(&report(&[], DisplayMode::Flat));
        assert!(html.contains("No vehicles match the current filter."));
        assert!(html.contains("<span class=\"stat-value small\">-</span>"));
    }

    #[test]
    fn test_write_csv_rows() {
        let path = temp_path("speed_report_test_rows.csv");
        let _ = fs::remove_file(&path);

        write_csv(&path, &report(&many(12), DisplayMode::Flat)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // 1 header + 12 data rows
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("position,section,vehicle"));
        assert!(lines[11].starts_with("11,Other vehicles,V10"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let path = temp_path("speed_report_test.json");
        write_json(&path, &report(&many(3), DisplayMode::ByGroup)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "by-group");
        assert_eq!(value["projection"]["stats"]["vehicle_count"], 3);
        assert_eq!(value["filter"]["kind"], "all");

        fs::remove_file(&path).unwrap();
    }
}
