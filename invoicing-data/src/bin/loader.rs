use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use invoicing_data::InvoiceLoader;
use invoicing_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Import month-level invoices from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - client_code: company code of an existing client
/// - invoice_number: the invoice number as issued
/// - month: billing month as YYYY-MM
/// - total_amount: invoice total in euros
/// - series: optional, AA (default) or VSP
#[derive(Parser, Debug)]
#[command(name = "invoice-import")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing invoices
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database file, created if missing
    #[arg(short, long, default_value = "invoices.db")]
    database: String,

    /// Issuer the invoices belong to
    #[arg(short, long, default_value_t = 1)]
    issuer: i64,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Importing invoices from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = InvoiceLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let summary = InvoiceLoader::load(&repo, args.issuer, &records)
        .await
        .context("Failed to import invoices into database")?;

    println!(
        "Imported {} invoices ({} already present, skipped).",
        summary.inserted, summary.skipped
    );

    Ok(())
}
