use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    Client, Invoice, IssuerProfile, MonthlyIncomeEntry, NewClient, NewInvoice, TaxRuleConstants,
    TaxSettings,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write (e.g. a duplicate invoice number).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage contract for the invoicing system.
///
/// Amounts come back as exact decimals; summing happens in the backend so
/// callers never add up rows themselves.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    // Tax rules
    async fn get_tax_rules(&self, year: i32) -> Result<TaxRuleConstants, RepositoryError>;
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Issuer
    async fn get_issuer_profile(&self, issuer_id: i64) -> Result<IssuerProfile, RepositoryError>;
    async fn save_issuer_profile(&self, profile: &IssuerProfile) -> Result<(), RepositoryError>;
    async fn get_tax_settings(&self, issuer_id: i64) -> Result<TaxSettings, RepositoryError>;
    async fn save_tax_settings(&self, settings: &TaxSettings) -> Result<(), RepositoryError>;

    // Clients
    async fn create_client(&self, client: NewClient) -> Result<Client, RepositoryError>;
    async fn get_client(&self, id: i64) -> Result<Client, RepositoryError>;
    async fn get_client_by_code(&self, company_code: &str) -> Result<Client, RepositoryError>;
    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError>;

    // Invoices

    /// Stores an invoice with its line items.
    ///
    /// When `invoice.invoice_number` is `None` the next number for the
    /// issuer is allocated atomically with the insert.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the issuer already has an invoice
    /// with the same number.
    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError>;
    async fn get_invoice(&self, id: i64) -> Result<Invoice, RepositoryError>;
    async fn list_invoices(
        &self,
        issuer_id: i64,
        year: Option<i32>,
    ) -> Result<Vec<Invoice>, RepositoryError>;

    /// Number of the issuer's most recently created invoice.
    async fn last_invoice_number(&self, issuer_id: i64) -> Result<Option<String>, RepositoryError>;
    async fn count_invoices(&self, issuer_id: i64, year: i32) -> Result<u64, RepositoryError>;

    // Income

    /// Sum of invoice totals dated within `year`; zero when there are none.
    async fn income_for_year(&self, issuer_id: i64, year: i32) -> Result<Decimal, RepositoryError>;

    /// Per-month sums for `year`, ascending, omitting months without invoices.
    async fn income_by_month(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<Vec<MonthlyIncomeEntry>, RepositoryError>;
}
