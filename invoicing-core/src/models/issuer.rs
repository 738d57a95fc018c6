use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ExpenseMode;

/// The self-employed person issuing invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerProfile {
    pub issuer_id: i64,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Personal identification code printed on invoices.
    pub individual_code: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: String,
    pub bank_account: String,
    /// Start of individual activity, used for the first-year VSDI exemption.
    pub activity_start_date: Option<NaiveDate>,
}

/// How an issuer's expenses are determined for tax purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSettings {
    pub issuer_id: i64,
    pub use_30_percent_rule: bool,
    /// Only meaningful when `use_30_percent_rule` is false.
    pub actual_expenses: Decimal,
}

impl TaxSettings {
    /// Settings for an issuer who never saved any: 30% rule, no expenses.
    pub fn default_for(issuer_id: i64) -> Self {
        Self {
            issuer_id,
            use_30_percent_rule: true,
            actual_expenses: Decimal::ZERO,
        }
    }

    pub fn expense_mode(&self) -> ExpenseMode {
        ExpenseMode::from_settings(self.use_30_percent_rule, Some(self.actual_expenses))
    }
}
