use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::TaxCalculationError;

/// Income invoiced in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyIncomeEntry {
    /// Calendar month, 1 through 12.
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
}

impl MonthlyIncomeEntry {
    /// # Errors
    ///
    /// [`TaxCalculationError::InvalidMonth`] when `month` is outside 1..=12.
    pub fn new(
        month: u32,
        income: Decimal,
    ) -> Result<Self, TaxCalculationError> {
        let entry = Self { month, income };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> Result<(), TaxCalculationError> {
        if !(1..=12).contains(&self.month) {
            return Err(TaxCalculationError::InvalidMonth(self.month));
        }
        if self.income < Decimal::ZERO {
            return Err(TaxCalculationError::NegativeIncome(self.income));
        }
        Ok(())
    }
}

/// How a month's PSD amount was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsdCalculationType {
    /// The statutory floor was paid.
    Minimal,
    /// The rate was applied to the month's contribution base.
    Calculated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPsdBreakdownEntry {
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psdi_base: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psd: Decimal,
    pub calculation_type: PsdCalculationType,
    pub above_mma: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPsdResult {
    /// One entry per input month, in input order.
    #[serde(rename = "monthly_breakdown")]
    pub breakdown: Vec<MonthlyPsdBreakdownEntry>,
    #[serde(with = "rust_decimal::serde::float")]
    pub annual_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mma_threshold: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_psd_monthly: Decimal,
}
