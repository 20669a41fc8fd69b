use speed_report::analyzers::aggregate::aggregate;
use speed_report::analyzers::projection::{DisplayMode, Filter, project};
use speed_report::dashboard::Dashboard;
use speed_report::ingest::{ViolationRecord, load_rows};
use speed_report::output::{render_html, write_csv};
use speed_report::reference::{NO_CATEGORY, NO_GROUP, ReferenceData};

const SAMPLE: &[u8] = include_bytes!("fixtures/sample_violations.csv");
const WORKBOOK: &[u8] = include_bytes!("fixtures/sample_violations.xlsx");
const REFERENCE: &str = include_str!("fixtures/reference.json");

fn reference() -> ReferenceData {
    ReferenceData::from_snapshot_json(REFERENCE).expect("Failed to parse reference snapshot")
}

#[test]
fn test_full_pipeline() {
    let rows = load_rows("sample_violations.csv", SAMPLE).expect("Failed to read sample");
    // The all-empty row is dropped.
    assert_eq!(rows.len(), 9);

    let records: Vec<ViolationRecord> = rows.iter().map(|r| ViolationRecord::from_cells(r)).collect();
    let summaries = aggregate(&records, &reference());

    let order: Vec<_> = summaries.iter().map(|s| s.vehicle.as_str()).collect();
    assert_eq!(order, ["XYZ9K88", "ABC1D23", "MNO2P34", "ABC1D23-2", "QWE4R56"]);

    let abc = &summaries[1];
    assert_eq!(abc.violation_count, 2);
    assert_eq!(abc.top_speed, 118.0);
    assert_eq!(abc.limit_at_top_speed, 90.0);
    assert_eq!(abc.group, "Graneleiro");

    // Suffixed plates resolve through the base plate.
    assert_eq!(summaries[3].group, "Graneleiro");
    assert_eq!(summaries[2].group, NO_GROUP);

    let projection = project(&summaries, &Filter::All, DisplayMode::Flat, &reference());
    assert_eq!(projection.stats.total_violations, 7);
    assert_eq!(projection.stats.vehicle_count, 5);
    assert_eq!(projection.stats.max_top_speed, 125.3);
    assert_eq!(projection.stats.fastest_vehicle.as_deref(), Some("XYZ9K88"));
    assert_eq!(projection.stats.mean_excess, 29.6);
}

#[test]
fn test_by_category_layout() {
    let mut dashboard = Dashboard::new(reference());
    dashboard
        .load("sample_violations.csv", SAMPLE)
        .expect("Failed to load sample");
    dashboard.set_mode(DisplayMode::ByCategory);

    let report = dashboard.report().expect("Report should exist after load");
    let unassigned = format!("{NO_CATEGORY}/{NO_GROUP}");
    let paths: Vec<_> = report
        .projection
        .buckets
        .iter()
        .map(|b| b.path.join("/"))
        .collect();
    assert_eq!(
        paths,
        [
            "Carga Seca/Bau",
            "Carga Seca/Graneleiro",
            "Liquidos/Tanque",
            unassigned.as_str(),
        ]
    );

    let starts: Vec<_> = report
        .projection
        .buckets
        .iter()
        .map(|b| b.start_index)
        .collect();
    assert_eq!(starts, [0, 1, 3, 4]);

    let html = render_html(&report);
    assert!(html.contains("Carga Seca"));
    assert!(html.contains("2 groups &middot; 3 vehicles &middot; 4 violations"));
}

#[test]
fn test_category_filter_report() {
    let mut dashboard = Dashboard::new(reference());
    dashboard
        .load("sample_violations.csv", SAMPLE)
        .expect("Failed to load sample");
    dashboard.set_filter("cat:Carga Seca".parse().unwrap());

    let report = dashboard.report().unwrap();
    assert_eq!(report.projection.stats.vehicle_count, 3);
    assert_eq!(report.projection.stats.total_violations, 4);
    assert_eq!(report.projection.stats.fastest_vehicle.as_deref(), Some("ABC1D23"));
    assert_eq!(report.total_rows, 9);

    let path = std::env::temp_dir().join("speed_report_integration.csv");
    write_csv(&path, &report).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 4);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_filter_options_from_snapshot() {
    let options = reference().filter_options();
    assert_eq!(
        options.categories,
        [("Carga Seca".to_string(), 2), ("Liquidos".to_string(), 1)]
    );
    assert_eq!(options.groups, ["Bau", "Graneleiro", "Sider", "Tanque"]);
}

#[test]
fn test_category_board_from_snapshot() {
    let board = reference().board();
    let names: Vec<_> = board.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Carga Seca", "Liquidos", NO_CATEGORY]);

    let unassigned: Vec<_> = board[2].groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(unassigned, ["Sider"]);
    assert!(board[2].synthetic);
}

#[test]
fn test_workbook_first_sheet_only() {
    let rows = load_rows("sample_violations.xlsx", WORKBOOK).expect("Failed to read workbook");

    // Header skipped, empty row dropped, second sheet ignored.
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r[1] != "SHEET2X"));

    let first = &rows[0];
    assert_eq!(first[1], "ABC1D23");
    // Missing driver cell reads as empty text.
    assert_eq!(first[2], "");
    assert_eq!(first[3], "120345");

    let record = ViolationRecord::from_cells(first);
    assert_eq!(record.speed, 95.5);
    assert_eq!(record.limit, 80.0);

    // Text cell with a comma decimal.
    let record = ViolationRecord::from_cells(&rows[1]);
    assert_eq!(record.vehicle, "XYZ9K88");
    assert_eq!(record.speed, 101.5);
    assert_eq!(record.limit, 90.0);
}

#[test]
fn test_workbook_report() {
    let mut dashboard = Dashboard::new(reference());
    let vehicles = dashboard
        .load("sample_violations.xlsx", WORKBOOK)
        .expect("Failed to load workbook");
    assert_eq!(vehicles, 2);

    let report = dashboard.report().unwrap();
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.projection.stats.max_top_speed, 118.0);
    assert_eq!(report.projection.stats.fastest_vehicle.as_deref(), Some("ABC1D23"));

    let abc = &dashboard.vehicles()[0];
    assert_eq!(abc.violation_count, 2);
    assert_eq!(abc.limit_at_top_speed, 90.0);
    assert_eq!(abc.group, "Graneleiro");
}
