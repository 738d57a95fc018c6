//! Command handlers behind the `invoicing` binary.
//!
//! Each handler takes an open repository and returns a value the binary
//! renders; nothing here prints.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use invoicing_core::aggregation::{AggregationError, YearOverview, year_overview};
use invoicing_core::calculations::common::{parse_date, parse_money};
use invoicing_core::db::{DbConfig, RepositoryRegistry};
use invoicing_core::numbering::{NextInvoiceNumber, next_invoice_number};
use invoicing_core::words::amount_to_words;
use invoicing_core::{
    Client, Invoice, InvoiceDates, InvoiceRepository, InvoiceSeries, NewClient,
    NewInvoice, NewLineItem, RepositoryError, TaxCalculationError, UnitType,
};
use invoicing_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AppConfig, resolve_tax_rules};
use crate::recalculate::{RecalculationRequest, RecalculationResponse, recalculate};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Calculation(#[from] TaxCalculationError),

    #[error("no client with company code '{0}'")]
    UnknownClient(String),

    #[error("unknown invoice series '{0}' (expected AA or VSP)")]
    UnknownSeries(String),

    #[error("invalid line item '{input}': {reason}")]
    InvalidLineItem { input: String, reason: String },

    #[error("an invoice needs at least one line item")]
    NoLineItems,

    #[error("amount {0} is too large to spell out")]
    AmountTooLarge(Decimal),
}

/// Registry with every backend this binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(
    db_config: &DbConfig,
) -> Result<Box<dyn InvoiceRepository>, RepositoryError> {
    debug!(
        backend = %db_config.backend,
        connection = %db_config.connection_string,
        "Opening repository"
    );
    build_registry().create(db_config).await
}

// ─── calculate / summary ─────────────────────────────────────────────────────

/// Runs the recalculation endpoint with rules resolved for the requested
/// year, or for `today`'s year when none is given.
pub async fn calculate<R: InvoiceRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    request: &RecalculationRequest,
    today: NaiveDate,
) -> Result<RecalculationResponse, AppError> {
    let year = request
        .year
        .as_deref()
        .and_then(|y| y.trim().parse().ok())
        .unwrap_or_else(|| today.year());
    let rules = resolve_tax_rules(config, repo, year).await?;

    Ok(recalculate(repo, config.issuer_id, request, &rules, today).await)
}

pub async fn summary<R: InvoiceRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    year: i32,
    today: NaiveDate,
) -> Result<YearOverview, AppError> {
    let rules = resolve_tax_rules(config, repo, year).await?;
    Ok(year_overview(repo, config.issuer_id, year, &rules, today).await?)
}

// ─── invoices ────────────────────────────────────────────────────────────────

/// The number the next invoice would get. Nothing is reserved.
pub async fn next_number<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
) -> Result<NextInvoiceNumber, AppError> {
    let last = repo.last_invoice_number(issuer_id).await?;
    Ok(next_invoice_number(last.as_deref()))
}

/// An invoice as entered on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub client_code: String,
    pub series: String,
    /// Each `name;quantity;unit;price`.
    pub items: Vec<String>,
    pub date: Option<String>,
    pub pay_until: Option<String>,
}

/// A created invoice together with its total spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvoice {
    pub invoice: Invoice,
    pub client: Client,
    pub total_in_words: String,
}

/// Parses one `name;quantity;unit;price` line item.
///
/// ```
/// use invoicing_cli::app::parse_line_item;
/// use invoicing_core::UnitType;
///
/// let item = parse_line_item("Konsultacija;2;val;45.50").unwrap();
/// assert_eq!(item.unit, UnitType::Val);
/// assert_eq!(item.total_amount().to_string(), "91.00");
/// ```
pub fn parse_line_item(input: &str) -> Result<NewLineItem, AppError> {
    let invalid = |reason: &str| AppError::InvalidLineItem {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = input.split(';').map(str::trim).collect();
    let [name, quantity, unit, price] = parts[..] else {
        return Err(invalid("expected name;quantity;unit;price"));
    };
    if name.is_empty() {
        return Err(invalid("service name is empty"));
    }
    let quantity = Decimal::from_str(quantity).map_err(|_| invalid("quantity is not a number"))?;
    if quantity <= Decimal::ZERO {
        return Err(invalid("quantity must be positive"));
    }
    let unit = UnitType::parse(unit).ok_or_else(|| invalid("unit must be 'val' or 'vnt'"))?;
    let price = parse_money("price", price)?;

    Ok(NewLineItem {
        service_name: name.to_string(),
        quantity,
        unit,
        price,
    })
}

/// Creates an invoice for the client with `draft.client_code`, letting the
/// repository allocate the number in the same transaction as the insert.
pub async fn create_invoice<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    draft: &InvoiceDraft,
    today: NaiveDate,
) -> Result<CreatedInvoice, AppError> {
    let series = InvoiceSeries::parse(&draft.series.to_ascii_uppercase())
        .ok_or_else(|| AppError::UnknownSeries(draft.series.clone()))?;
    let items = draft
        .items
        .iter()
        .map(|item| parse_line_item(item))
        .collect::<Result<Vec<_>, _>>()?;
    if items.is_empty() {
        return Err(AppError::NoLineItems);
    }

    let mut dates = match &draft.date {
        Some(date) => InvoiceDates::default_for(parse_date("date", date)?),
        None => InvoiceDates::default_for(today),
    };
    if let Some(pay_until) = &draft.pay_until {
        dates.pay_until = parse_date("pay_until", pay_until)?;
    }

    let client = match repo.get_client_by_code(&draft.client_code).await {
        Ok(client) => client,
        Err(RepositoryError::NotFound) => {
            return Err(AppError::UnknownClient(draft.client_code.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    let invoice = repo
        .create_invoice(NewInvoice::from_line_items(
            series, issuer_id, client.id, None, dates, items,
        ))
        .await?;
    let total_in_words =
        amount_to_words(invoice.total_amount).ok_or(AppError::AmountTooLarge(invoice.total_amount))?;

    info!(
        number = %invoice.invoice_number,
        client = %client.company_code,
        total = %invoice.total_amount,
        "Invoice created"
    );
    Ok(CreatedInvoice {
        invoice,
        client,
        total_in_words,
    })
}

pub async fn add_client<R: InvoiceRepository + ?Sized>(
    repo: &R,
    client: NewClient,
) -> Result<Client, AppError> {
    Ok(repo.create_client(client).await?)
}

/// Spells out a typed amount.
pub fn words(amount: &str) -> Result<String, AppError> {
    let amount = parse_money("amount", amount)?;
    amount_to_words(amount).ok_or(AppError::AmountTooLarge(amount))
}
