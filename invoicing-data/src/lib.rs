//! Bulk import of month-level invoices from CSV.

mod loader;

pub use loader::{InvoiceLoader, InvoiceLoaderError, InvoiceRecord, LoadSummary};
