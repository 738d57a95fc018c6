pub mod aggregation;
pub mod calculations;
pub mod db;
pub mod models;
pub mod numbering;
pub mod words;

#[cfg(test)]
pub(crate) mod test_support;

pub use calculations::{AnnualTaxCalculator, MonthlyPsdCalculator, TaxCalculationError};
pub use db::repository::{InvoiceRepository, RepositoryError};
pub use models::*;
