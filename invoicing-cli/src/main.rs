use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use tracing::debug;

use invoicing_cli::app::{self, InvoiceDraft};
use invoicing_cli::config::load_config;
use invoicing_cli::logging;
use invoicing_cli::recalculate::{RecalculationRequest, STATUS_OK};
use invoicing_core::NewClient;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Tax estimates and invoices for Lithuanian individual activity.
///
/// Settings come from `invoicing.toml` in the working directory unless
/// `--config` names another file; `--db` and `--backend` override it.
#[derive(Debug, Parser)]
#[command(name = "invoicing", version)]
struct Cli {
    /// Config file to read.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `invoices.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Issuer to act for.
    #[arg(long, global = true)]
    issuer: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recalculate taxes from form values and print the JSON result.
    Calculate {
        #[arg(long)]
        income: Option<String>,
        /// `true` for the 30% expense rule, anything else for actual expenses.
        #[arg(long = "use-30-percent")]
        use_30_percent: Option<String>,
        #[arg(long)]
        expenses: Option<String>,
        /// Evaluate PSD month by month from this year's invoices.
        #[arg(long)]
        year: Option<String>,
    },
    /// Print the yearly overview as JSON.
    Summary {
        /// Defaults to the current year.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show the number the next invoice will get.
    NextNumber,
    /// Issue an invoice; its number is allocated when it is stored.
    CreateInvoice {
        /// Company code of the client.
        #[arg(long)]
        client: String,
        #[arg(long, default_value = "AA")]
        series: String,
        /// Line item as `name;quantity;unit;price`; repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        /// Issue date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// Payment deadline (YYYY-MM-DD); defaults to 14 days after the issue date.
        #[arg(long)]
        pay_until: Option<String>,
    },
    /// Register a client.
    AddClient {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        pvm_code: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: String,
    },
    /// Spell out an amount in Lithuanian.
    Words { amount: String },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_default_logging();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;
    logging::apply_config(&config.logging).context("Failed to apply [logging] settings")?;

    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    if let Some(issuer) = cli.issuer {
        config.issuer_id = issuer;
    }
    debug!(?config, "Configuration loaded");

    if let Command::Words { amount } = &cli.command {
        println!("{}", app::words(amount)?);
        return Ok(ExitCode::SUCCESS);
    }

    let db_config = config.database.to_db_config();
    let repo = app::open_repository(&db_config)
        .await
        .with_context(|| format!("Failed to open database: {}", db_config.connection_string))?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Calculate {
            income,
            use_30_percent,
            expenses,
            year,
        } => {
            let request = RecalculationRequest {
                income,
                use_30_percent,
                expenses,
                year,
            };
            let response = app::calculate(&*repo, &config, &request, today).await?;
            println!("{}", response.to_json()?);
            if response.status != STATUS_OK {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Summary { year } => {
            let year = year.unwrap_or_else(|| today.year());
            let overview = app::summary(&*repo, &config, year, today).await?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        Command::NextNumber => {
            let next = app::next_number(&*repo, config.issuer_id).await?;
            println!("{}", next.number);
            println!("{}", serde_json::to_string(&next.origin)?);
        }
        Command::CreateInvoice {
            client,
            series,
            items,
            date,
            pay_until,
        } => {
            let draft = InvoiceDraft {
                client_code: client,
                series,
                items,
                date,
                pay_until,
            };
            let created = app::create_invoice(&*repo, config.issuer_id, &draft, today).await?;
            let invoice = &created.invoice;
            println!(
                "{} {} for {}",
                invoice.series.as_str(),
                invoice.invoice_number,
                created.client
            );
            println!("Date:      {}", invoice.date);
            println!("Pay until: {}", invoice.pay_until);
            println!("Total:     {} EUR", invoice.total_amount);
            println!("In words:  {}", created.total_in_words);
        }
        Command::AddClient {
            name,
            code,
            pvm_code,
            address,
            first_name,
            last_name,
            phone,
        } => {
            let client = app::add_client(
                &*repo,
                NewClient {
                    company_name: name,
                    company_code: code,
                    pvm_code,
                    address,
                    first_name,
                    last_name,
                    phone,
                },
            )
            .await?;
            println!("Added client #{}: {client}", client.id);
        }
        Command::Words { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
