use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MonthlyPsdBreakdownEntry;

/// Annual income compared against the minimum monthly wage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeVsMma {
    Below,
    Above,
}

/// Which PSDI path produced the annual figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsdiMethod {
    /// Twelve monthly minimum payments.
    Minimal,
    /// The PSDI rate applied to the declared base.
    Standard,
    /// Sum of independently evaluated months.
    Monthly,
}

/// Each tax as a percentage of income, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxPercentages {
    #[serde(rename = "gpm_percent", with = "rust_decimal::serde::float")]
    pub gpm: Decimal,
    #[serde(rename = "vsdi_percent", with = "rust_decimal::serde::float")]
    pub vsdi: Decimal,
    #[serde(rename = "psdi_percent", with = "rust_decimal::serde::float")]
    pub psdi: Decimal,
    #[serde(rename = "total_percent", with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Full annual tax breakdown.
///
/// Serializes to a flat map whose keys match what the invoicing front end
/// renders; money is emitted as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses: Decimal,
    /// `income - expenses`; negative when actual expenses exceed income.
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vsdi_base: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psdi_base: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vsdi: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psdi: Decimal,
    pub psdi_is_self_paid: bool,
    pub psdi_note: String,
    pub psdi_method: PsdiMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psdi_monthly_breakdown: Option<Vec<MonthlyPsdBreakdownEntry>>,
    #[serde(with = "rust_decimal::serde::float")]
    pub gpm_base: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gpm_taxable: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gpm: Decimal,
    /// VSDI + PSDI + GPM, shown to the user even when PSD is paid separately.
    #[serde(rename = "total_taxes", with = "rust_decimal::serde::float")]
    pub total_taxes_display: Decimal,
    /// What is actually subtracted from income to get `net_income`.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_taxes_to_deduct: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_income: Decimal,
    pub vsdi_exempt: bool,
    pub income_vs_mma: IncomeVsMma,
    #[serde(with = "rust_decimal::serde::float")]
    pub mma_threshold: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_psd_monthly: Decimal,
    #[serde(flatten)]
    pub percentages: TaxPercentages,
}
