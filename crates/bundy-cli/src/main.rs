// crates/bundy-cli/src/main.rs

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use bundy_core::config::PolicyConfig;
use bundy_core::import::{import_export, ImportRequest};
use bundy_core::payroll::run_payroll;
use bundy_core::store::{PgStore, WeekdayCalendar};
use bundy_core::timeclock::record_punch;
use bundy_core::types::PunchDirection;

/// Attendance and payroll engine CLI.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Policy configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Creates the database schema if it does not exist yet.
    Init,
    /// Imports a biometric device export file.
    Import {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long, default_value = "cli")]
        uploaded_by: String,
    },
    /// Computes payroll for every active employee over a period.
    Payroll {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Records a live punch for one employee.
    Punch {
        #[arg(long)]
        employee_id: i64,
        /// "in" or "out".
        #[arg(long)]
        direction: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let policy = match &cli.config {
        Some(path) => PolicyConfig::load(path)
            .with_context(|| format!("failed to load policy config from {}", path.display()))?,
        None => PolicyConfig::default(),
    };

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set (see .env)")?;
    let store = PgStore::connect(&database_url, 5).await?;
    let calendar = WeekdayCalendar {
        non_working: policy.holidays.iter().map(|holiday| holiday.day).collect(),
    };

    match cli.command {
        Commands::Init => {
            store.ensure_schema().await?;
            println!("✅ Schema ready.");
        }
        Commands::Import { file, uploaded_by } => {
            let contents = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let receipt = import_export(
                &store,
                &calendar,
                &policy,
                ImportRequest {
                    source_file_name: file
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display().to_string()),
                    uploaded_by,
                    contents: &contents,
                },
            )
            .await?;

            println!("\n--- Import Summary ---");
            println!("  Batch:    {}", receipt.batch_id);
            println!("  Checksum: {}", receipt.checksum);
            if let Some(previous) = receipt.duplicate_of {
                println!("  ⚠️  Identical content was already imported as batch {previous}");
            }
            println!("  Rows:     {}", receipt.summary.total_rows);
            println!("  Imported: {}", receipt.summary.imported);
            println!("  Updated:  {}", receipt.summary.updated);
            println!("  Skipped:  {}", receipt.summary.skipped);
            println!("  Absences: {}", receipt.summary.absences_created);
            for diagnostic in &receipt.errors {
                match diagnostic.line_index {
                    Some(line) => eprintln!("  ERROR line {line}: {}", diagnostic.message),
                    None => eprintln!("  ERROR: {}", diagnostic.message),
                }
            }
            for diagnostic in &receipt.warnings {
                match diagnostic.line_index {
                    Some(line) => eprintln!("  WARNING line {line}: {}", diagnostic.message),
                    None => eprintln!("  WARNING: {}", diagnostic.message),
                }
            }
        }
        Commands::Payroll { start, end } => {
            let results = run_payroll(&store, &policy, start, end).await?;

            println!("\n--- Payroll {start} .. {end} ---");
            for result in &results {
                println!(
                    "  employee {:>6}  gross {:>12.2}  deductions {:>12.2}  net {:>12.2}",
                    result.employee_id, result.gross_pay, result.total_deductions, result.net_pay
                );
                if result.net_pay < 0.0 {
                    println!("    ⚠️  negative net pay, review this employee's deductions");
                }
            }
            println!("  {} employees computed", results.len());
        }
        Commands::Punch {
            employee_id,
            direction,
        } => {
            let direction = PunchDirection::try_from(direction.as_str())
                .map_err(|message| anyhow!(message))?;
            let outcome = record_punch(&store, &policy, employee_id, direction, Utc::now()).await?;

            if outcome.accepted {
                let record = outcome.record.expect("accepted punch carries a record");
                println!(
                    "✅ Recorded {} for employee {employee_id} on {}",
                    direction.as_str(),
                    record.day
                );
            } else {
                println!(
                    "❌ Rejected: {}",
                    outcome.reason.unwrap_or_else(|| "unknown reason".to_string())
                );
            }
        }
    }

    Ok(())
}
