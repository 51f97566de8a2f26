//! Sitebook budget recalculation CLI.
//!
//! Applies one edit to a location's budget, exactly as the inline editor
//! would, and prints the resulting writes as JSON. Works either on a JSON
//! sheet file or against the budget REST API.

mod sheet_file;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sitebook_shared::AppConfig;
use sitebook_shared::types::{LineItemId, LocationId};
use sitebook_store::{
    BudgetEditor, EditReport, HttpStore, ItemStore, MemoryStore, WriteMode, WriteScheduler,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use sheet_file::{SheetFile, load_import_rows};

#[derive(Parser, Debug)]
#[command(
    name = "recalc",
    version,
    about = "Recalculate budget line items",
    long_about = None
)]
struct Cli {
    /// Work on a JSON sheet file instead of the REST API.
    #[arg(long, conflicts_with = "location")]
    sheet: Option<PathBuf>,

    /// Location to edit through the REST API.
    #[arg(long, required_unless_present = "sheet")]
    location: Option<Uuid>,

    /// Write the updated sheet back to the sheet file.
    #[arg(long, requires = "sheet")]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the raw quantity of a line.
    Quantity {
        /// Line item number, e.g. 26.1
        line: String,
        /// New value as typed; invalid input counts as zero.
        value: String,
    },
    /// Set the production rate of a line.
    Rate {
        /// Line item number
        line: String,
        /// New value as typed
        value: String,
    },
    /// Set the hours of a line.
    Hours {
        /// Line item number
        line: String,
        /// New value as typed
        value: String,
    },
    /// Import rows from a JSON file of raw cell text.
    Import {
        /// Path to the rows file
        rows: PathBuf,
    },
    /// Print hours and costs per cost code.
    Summary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditOutput<'a> {
    writes: Vec<&'a sitebook_core::budget::LineItemWrite>,
    failed: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitebook=info,recalc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let (store, memory, location_id): (Arc<dyn ItemStore>, Option<Arc<MemoryStore>>, LocationId) =
        match (&cli.sheet, cli.location) {
            (Some(path), _) => {
                let file = SheetFile::load(path)?;
                let memory = Arc::new(MemoryStore::with_items(file.items));
                let store: Arc<dyn ItemStore> = memory.clone();
                info!(path = %path.display(), "Working on sheet file");
                (store, Some(memory), file.location_id)
            }
            (None, Some(location)) => {
                let store: Arc<dyn ItemStore> = Arc::new(HttpStore::from_config(&config.store)?);
                info!(base_url = %config.store.base_url, "Working against item store");
                (store, None, LocationId::from_uuid(location))
            }
            (None, None) => bail!("either --sheet or --location is required"),
        };

    let (scheduler, _failures) = WriteScheduler::from_config(store, &config.editing);
    let mut editor = BudgetEditor::load(scheduler, location_id).await?;

    let outcome = run(&mut editor, cli.command).await;
    editor.shutdown();

    if let (Some(path), Some(memory)) = (cli.sheet.as_deref().filter(|_| cli.save), memory) {
        let file = SheetFile {
            location_id,
            items: memory.read(location_id).await?,
        };
        file.save(path)?;
        info!(path = %path.display(), items = file.items.len(), "Sheet file saved");
    }

    outcome
}

async fn run(editor: &mut BudgetEditor, command: Command) -> Result<()> {
    let report = match command {
        Command::Quantity { line, value } => {
            let id = line_id(editor, &line)?;
            editor.edit_quantity(id, &value, WriteMode::Immediate).await?
        }
        Command::Rate { line, value } => {
            let id = line_id(editor, &line)?;
            editor
                .edit_production_rate(id, &value, WriteMode::Immediate)
                .await?
        }
        Command::Hours { line, value } => {
            let id = line_id(editor, &line)?;
            editor.edit_hours(id, &value, WriteMode::Immediate).await?
        }
        Command::Import { rows } => {
            let rows = load_import_rows(&rows)?;
            let report = editor.import(&rows).await?;
            print_json(&serde_json::json!({
                "created": report.created,
                "skipped": report.skipped,
                "updated": report.updated,
            }))?;
            for failure in &report.failures {
                warn!(line = %failure.line_item_number, error = %failure.error, "Write not persisted");
            }
            if !report.failures.is_empty() {
                bail!("{} import follow-up writes failed", report.failures.len());
            }
            return Ok(());
        }
        Command::Summary => {
            print_json(&editor.summary())?;
            return Ok(());
        }
    };

    print_edit(&report)
}

fn line_id(editor: &BudgetEditor, line: &str) -> Result<LineItemId> {
    editor
        .sheet()
        .get_by_number(line.trim())
        .map(|item| item.id)
        .ok_or_else(|| anyhow!("no line item numbered '{line}'"))
}

fn print_edit(report: &EditReport) -> Result<()> {
    let output = EditOutput {
        writes: report.recalculation.writes.iter().collect(),
        failed: report
            .failures
            .iter()
            .map(|failure| failure.line_item_number.clone())
            .collect(),
    };
    print_json(&output)?;

    for failure in &report.failures {
        warn!(line = %failure.line_item_number, error = %failure.error, "Write not persisted");
    }
    if !report.is_persisted() {
        bail!(
            "{} of {} writes failed",
            report.failures.len(),
            report.recalculation.len()
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
