use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voter_rolls::commands::reports;
use voter_rolls::database;
use voter_rolls::models::Config;
use voter_rolls::tools::workbook_importer::{import_workbook, ImportReport, RelationOutcome};

#[derive(Parser)]
#[command(
    name = "voter-rolls",
    about = "Quarterly voter roll ingestion and reporting",
    version
)]
struct Cli {
    /// Path to the SQLite database (defaults to DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one quarterly workbook into the database
    Import {
        /// Path to the .xlsx workbook
        workbook: PathBuf,
    },
    /// List stored reporting periods
    Periods {
        /// Emit JSON instead of the human-readable listing
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate statistics for one stored period
    Summary {
        /// Period identifier (see `periods`)
        #[arg(long)]
        period: i64,
        /// Emit JSON instead of the human-readable summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voter_rolls=warn"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    let db_path = cli.db.unwrap_or(config.database_path);

    let pool = database::connect(&db_path).await?;
    database::init_schema(&pool).await?;

    match cli.command {
        Commands::Import { workbook } => {
            println!("🚀 Workbook import started");
            println!("📄 Workbook: {}", workbook.display());
            println!("💾 Database: {}", db_path);
            println!("{}", "=".repeat(60));

            match import_workbook(&pool, &workbook).await {
                Ok(report) => {
                    print_import_report(&report);
                    if report.failures() > 0 {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("❌ Import aborted: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Periods { json } => {
            let periods = reports::list_periods(&pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&periods)?);
            } else if periods.is_empty() {
                println!("No reporting periods stored yet.");
            } else {
                println!("📅 Stored reporting periods:");
                for period in periods {
                    println!(
                        "  [{}] T{} {} - {}",
                        period.id, period.quarter, period.year, period.title
                    );
                }
            }
        }
        Commands::Summary { period, json } => {
            let summary = reports::dashboard_summary(&pool, period).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
    }

    pool.close().await;
    Ok(())
}

fn print_import_report(report: &ImportReport) {
    println!(
        "🗓️  Period: {} (T{} {}, id {})",
        report.period.title, report.period.quarter, report.period.year, report.period.id
    );
    for relation in &report.relations {
        match &relation.outcome {
            RelationOutcome::Inserted(n) => {
                println!("  ✅ {}: {} rows saved", relation.relation, n);
            }
            RelationOutcome::SkippedExisting => {
                println!(
                    "  ⚠️  {}: skipped — already present for this period",
                    relation.relation
                );
            }
            RelationOutcome::NoUsableRows => {
                println!("  ⚠️  {}: no usable rows, nothing saved", relation.relation);
            }
            RelationOutcome::Failed(message) => {
                println!("  ❌ {}: {}", relation.relation, message);
            }
        }
    }
    println!("{}", "=".repeat(60));
    if report.failures() == 0 {
        println!("🎉 Import complete");
    } else {
        println!("⚠️  Import finished with {} failed relation(s)", report.failures());
    }
}

fn print_summary(summary: &reports::DashboardSummary) {
    let period = &summary.period;
    println!("📊 {} (T{} {})", period.title, period.quarter, period.year);
    println!("{}", "=".repeat(60));
    println!("  Districts: {}", summary.districts);
    println!("  Villages: {}", summary.villages);
    println!("  Polling stations (prior quarter): {}", summary.polling_stations);
    println!(
        "  Voters: {} ({} male / {} female)",
        summary.total_voters, summary.male_voters, summary.female_voters
    );
    println!(
        "  Change vs. prior quarter: {:+} ({:+} male / {:+} female)",
        summary.total_delta, summary.male_delta, summary.female_delta
    );
    println!("  New voters: {}", summary.new_voters);
    println!("  Corrected records: {}", summary.corrected_records);
    let d = &summary.disqualified;
    println!("  Disqualified: {} total", d.total);
    println!(
        "    deceased {}, underage {}, duplicate {}, moved away {}, military {}",
        d.deceased, d.underage, d.duplicate, d.moved_away, d.military
    );
}
