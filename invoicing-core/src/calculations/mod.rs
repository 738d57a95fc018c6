//! Tax calculators for Lithuanian individual activity.
//!
//! Both calculators are pure: they take a [`TaxRuleConstants`](crate::TaxRuleConstants)
//! value at construction and never touch storage.

pub mod annual;
pub mod common;
pub mod error;
pub mod monthly_psd;

pub use annual::AnnualTaxCalculator;
pub use error::TaxCalculationError;
pub use monthly_psd::MonthlyPsdCalculator;
