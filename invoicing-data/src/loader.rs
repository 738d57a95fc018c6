use std::collections::HashMap;
use std::io::Read;

use invoicing_core::calculations::common::parse_money;
use invoicing_core::{
    InvoiceRepository, InvoiceSeries, NewInvoice, RepositoryError, TaxCalculationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when importing month-level invoices.
#[derive(Debug, Error)]
pub enum InvoiceLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid invoice series '{0}', expected AA or VSP")]
    InvalidSeries(String),

    #[error("Client with company code '{0}' not found (create the client first)")]
    ClientNotFound(String),

    #[error(transparent)]
    Calculation(#[from] TaxCalculationError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for InvoiceLoaderError {
    fn from(err: csv::Error) -> Self {
        InvoiceLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of an invoice upload.
///
/// - `client_code`: the client's company code
/// - `invoice_number`: stored as written, prefixes included
/// - `month`: billing month as `YYYY-MM`; the invoice is dated on its first day
/// - `total_amount`: invoice total with a `.` decimal point
/// - `series`: optional, `AA` when empty or missing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InvoiceRecord {
    pub client_code: String,
    pub invoice_number: String,
    pub month: String,
    #[serde(deserialize_with = "deserialize_money")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub series: Option<String>,
}

impl InvoiceRecord {
    /// `(year, month)` parsed from the `YYYY-MM` column.
    pub fn period(&self) -> Result<(i32, u32), InvoiceLoaderError> {
        let invalid = || InvoiceLoaderError::InvalidMonth(self.month.clone());
        let (year, month) = self.month.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok((year, month))
    }

    pub fn invoice_series(&self) -> Result<InvoiceSeries, InvoiceLoaderError> {
        match &self.series {
            None => Ok(InvoiceSeries::default()),
            Some(s) => InvoiceSeries::parse(&s.to_uppercase())
                .ok_or_else(|| InvoiceLoaderError::InvalidSeries(s.clone())),
        }
    }
}

fn deserialize_money<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_money("total_amount", &s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Outcome of [`InvoiceLoader::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: usize,
    /// Rows whose invoice number the issuer already has.
    pub skipped: usize,
}

/// Imports month-level invoices from CSV through any [`InvoiceRepository`].
///
/// Every record becomes an invoice dated on the first day of its month and
/// payable within 30 days, with no line items. Loading is idempotent: rows
/// whose number already exists for the issuer are skipped.
pub struct InvoiceLoader;

impl InvoiceLoader {
    /// Parse invoice records from a CSV reader with a header row.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<InvoiceRecord>, InvoiceLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: InvoiceRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Insert `records` as invoices of `issuer_id`.
    ///
    /// Every record is validated before anything is written, so a bad row
    /// leaves the store untouched.
    pub async fn load<R: InvoiceRepository + ?Sized>(
        repo: &R,
        issuer_id: i64,
        records: &[InvoiceRecord],
    ) -> Result<LoadSummary, InvoiceLoaderError> {
        let mut client_ids: HashMap<&str, i64> = HashMap::new();
        let mut invoices = Vec::with_capacity(records.len());

        for record in records {
            let client_id = match client_ids.get(record.client_code.as_str()) {
                Some(id) => *id,
                None => {
                    let client = repo
                        .get_client_by_code(&record.client_code)
                        .await
                        .map_err(|e| match e {
                            RepositoryError::NotFound => {
                                InvoiceLoaderError::ClientNotFound(record.client_code.clone())
                            }
                            other => InvoiceLoaderError::Repository(other),
                        })?;
                    client_ids.insert(&record.client_code, client.id);
                    client.id
                }
            };

            let (year, month) = record.period()?;
            let mut invoice = NewInvoice::monthly_upload(
                issuer_id,
                client_id,
                record.invoice_number.clone(),
                year,
                month,
                record.total_amount,
            )?;
            invoice.series = record.invoice_series()?;
            invoices.push(invoice);
        }

        let mut summary = LoadSummary::default();
        for invoice in invoices {
            let number = invoice.invoice_number.clone().unwrap_or_default();
            match repo.create_invoice(invoice).await {
                Ok(created) => {
                    debug!(id = created.id, number = %created.invoice_number, "Imported invoice");
                    summary.inserted += 1;
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(number = %number, "Invoice number already exists; skipping row");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }
}
