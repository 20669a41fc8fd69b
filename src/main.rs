//! CLI entry point for the speed violation report tool.
//!
//! Renders printable reports from telemetry spreadsheets and manages the
//! plate, group and category reference tables they are grouped by.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use speed_report::analyzers::projection::{DisplayMode, Filter};
use speed_report::dashboard::Dashboard;
use speed_report::fetch::{BasicClient, fetch_bytes};
use speed_report::infra::supabase::{StoreConfig, SupabaseClient};
use speed_report::output::{
    default_report_name, print_summary, write_csv, write_html, write_json,
};
use speed_report::reference::{ReferenceData, ReferenceEditor};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "speed_report")]
#[command(about = "Speed violation reports from telemetry spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report from a spreadsheet file or URL
    Report {
        /// Path to an .xlsx/.xls/.csv file, or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// `all`, `cat:<category>`, `group:<group>` or a bare group name
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Table layout
        #[arg(short, long, value_enum, default_value_t = DisplayMode::Flat)]
        mode: DisplayMode,

        /// HTML file to write (default: speed-report-<today>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also export the table rows as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Also export the whole report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Read reference data from a JSON export instead of the store
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Text repeated across the report background
        #[arg(long)]
        watermark: Option<String>,
    },
    /// List the filter choices offered by the current reference data
    Filters {
        #[arg(short, long)]
        reference: Option<PathBuf>,
    },
    /// List plates, optionally searching plate, group and model
    Plates {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        reference: Option<PathBuf>,
    },
    /// Show the category board: categories and the groups assigned to them
    Categories {
        #[arg(short, long)]
        reference: Option<PathBuf>,
    },
    /// Add a plate to a group
    AddPlate {
        plate: String,
        group: String,
        #[arg(short, long, default_value = "")]
        model: String,
    },
    /// Replace the row stored under PLATE
    UpdatePlate {
        plate: String,
        /// New plate, defaults to PLATE
        #[arg(long)]
        new_plate: Option<String>,
        #[arg(short, long)]
        group: String,
        #[arg(short, long, default_value = "")]
        model: String,
    },
    /// Delete a plate row
    DeletePlate { plate: String },
    /// Create a category
    AddCategory { name: String },
    /// Rename a category and every group assigned to it
    RenameCategory { from: String, to: String },
    /// Delete a category; its groups become uncategorized
    DeleteCategory { name: String },
    /// Assign a group to a category, or clear it when --to is omitted
    MoveGroup {
        group: String,
        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/speed_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("speed_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            source,
            filter,
            mode,
            output,
            csv,
            json,
            reference,
            watermark,
        } => {
            let reference = load_reference(reference.as_deref()).await?;
            let bytes = fetcher(&source).await?;

            let mut dashboard = Dashboard::new(reference);
            dashboard.load(source_name(&source), &bytes)?;

            let filter: Filter = filter.parse()?;
            warn_unknown_filter(&filter, dashboard.reference());
            dashboard.set_filter(filter);
            dashboard.set_mode(mode);
            if let Some(text) = watermark {
                dashboard.set_watermark(text);
            }

            let report = dashboard
                .report()
                .context("No spreadsheet loaded")?;
            print_summary(&report);

            let output = output
                .unwrap_or_else(|| PathBuf::from(default_report_name(Local::now().date_naive())));
            write_html(&output, &report)?;
            info!(path = %output.display(), "Report written");

            if let Some(path) = csv {
                write_csv(&path, &report)?;
                info!(path = %path.display(), "CSV export written");
            }
            if let Some(path) = json {
                write_json(&path, &report)?;
                info!(path = %path.display(), "JSON export written");
            }
        }
        Commands::Filters { reference } => {
            let reference = load_reference(reference.as_deref()).await?;
            let options = reference.filter_options();

            for (category, groups) in &options.categories {
                info!(filter = %format!("cat:{category}"), groups, "Category");
            }
            for group in &options.groups {
                info!(filter = %group, "Group");
            }
            info!(
                categories = options.categories.len(),
                groups = options.groups.len(),
                "Filter options"
            );
        }
        Commands::Plates { search, reference } => {
            let reference = load_reference(reference.as_deref()).await?;
            let records = reference.search(search.as_deref().unwrap_or(""));

            for record in &records {
                info!(
                    plate = %record.plate,
                    group = record.group.as_deref().unwrap_or("-"),
                    model = record.model.as_deref().unwrap_or("-"),
                    category = record.category.as_deref().unwrap_or("-"),
                    "Plate"
                );
            }
            info!(
                shown = records.len(),
                total = reference.plate_count(),
                "Plate list"
            );
        }
        Commands::Categories { reference } => {
            let reference = load_reference(reference.as_deref()).await?;
            for column in reference.board() {
                let groups: Vec<String> = column
                    .groups
                    .iter()
                    .map(|g| format!("{} ({})", g.name, g.plates))
                    .collect();
                info!(
                    category = %column.name,
                    synthetic = column.synthetic,
                    count = column.groups.len(),
                    groups = %groups.join(", "),
                    "Category"
                );
            }
        }
        Commands::AddPlate {
            plate,
            group,
            model,
        } => {
            let mut editor = editor().await?;
            editor.add_plate(&plate, &group, &model).await?;
            info!(plate = %plate, group = %group, "Plate added");
        }
        Commands::UpdatePlate {
            plate,
            new_plate,
            group,
            model,
        } => {
            let mut editor = editor().await?;
            let new_plate = new_plate.unwrap_or_else(|| plate.clone());
            editor
                .update_plate(&plate, &new_plate, &group, &model)
                .await?;
            info!(plate = %plate, new_plate = %new_plate, group = %group, "Plate updated");
        }
        Commands::DeletePlate { plate } => {
            let mut editor = editor().await?;
            editor.delete_plate(&plate).await?;
            info!(plate = %plate, "Plate deleted");
        }
        Commands::AddCategory { name } => {
            let mut editor = editor().await?;
            editor.create_category(&name).await?;
            info!(category = %name, "Category created");
        }
        Commands::RenameCategory { from, to } => {
            let mut editor = editor().await?;
            editor.rename_category(&from, &to).await?;
            info!(from = %from, to = %to, "Category renamed");
        }
        Commands::DeleteCategory { name } => {
            let mut editor = editor().await?;
            editor.delete_category(&name).await?;
            info!(category = %name, "Category deleted");
        }
        Commands::MoveGroup { group, to } => {
            let mut editor = editor().await?;
            editor.move_group(&group, to.as_deref()).await?;
            info!(
                group = %group,
                category = to.as_deref().unwrap_or("-"),
                "Group moved"
            );
        }
    }

    Ok(())
}

/// Loads spreadsheet data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %url))]
async fn fetcher(url: &str) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url).with_context(|| format!("Failed to read {url}"))?
    };
    Ok(bytes)
}

/// File name used for format detection and the report header. URLs keep
/// their last path segment, query string dropped.
fn source_name(source: &str) -> &str {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Reference data from a JSON export, else from the configured store.
/// Without either, or when the store is unreachable, every vehicle lands in
/// "No group".
async fn load_reference(snapshot: Option<&Path>) -> Result<ReferenceData> {
    if let Some(path) = snapshot {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return ReferenceData::from_snapshot_json(&content);
    }

    if !StoreConfig::is_configured() {
        warn!("Reference store not configured, vehicles will not be grouped");
        return Ok(ReferenceData::empty());
    }

    match editor().await {
        Ok(editor) => Ok(editor.into_data()),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Failed to load reference data, continuing without groups");
            Ok(ReferenceData::empty())
        }
    }
}

async fn editor() -> Result<ReferenceEditor<SupabaseClient>> {
    let config = StoreConfig::from_env()?;
    let client = SupabaseClient::new(&config)?;
    ReferenceEditor::connect(client).await
}

fn warn_unknown_filter(filter: &Filter, reference: &ReferenceData) {
    let known = match filter {
        Filter::All => true,
        Filter::Group(group) => {
            reference.groups().iter().any(|g| g == group)
                || group == speed_report::reference::NO_GROUP
        }
        Filter::Category(category) => reference.has_category(category),
    };
    if !known {
        warn!(filter = %filter, "Filter matches nothing in the reference data");
    }
}
