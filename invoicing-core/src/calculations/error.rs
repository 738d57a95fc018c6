use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the tax calculators and their input parsers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaxCalculationError {
    #[error("{field}: '{input}' is not a valid amount")]
    InvalidAmount { field: &'static str, input: String },

    #[error("{field}: '{input}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, input: String },

    #[error("income must not be negative, got {0}")]
    NegativeIncome(Decimal),

    #[error("expenses must not be negative, got {0}")]
    NegativeExpenses(Decimal),

    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    /// A rate in the rule set lies outside `[0, 1]`.
    #[error("{name} must be between 0 and 1, got {value}")]
    InvalidRate { name: &'static str, value: Decimal },

    /// A limit or floor in the rule set is negative.
    #[error("{name} must be non-negative, got {value}")]
    InvalidAmountLimit { name: &'static str, value: Decimal },
}
