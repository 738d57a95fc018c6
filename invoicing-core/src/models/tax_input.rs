use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::TaxCalculationError;

/// How deductible expenses are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "amount", rename_all = "snake_case")]
pub enum ExpenseMode {
    /// A flat share of income (the "30% rule").
    Fixed30Percent,
    /// Substantiated expenses, used as-is.
    ActualExpenses(Decimal),
}

impl ExpenseMode {
    /// Maps the issuer's stored settings onto an expense mode.
    ///
    /// Missing actual expenses count as zero.
    pub fn from_settings(
        use_30_percent_rule: bool,
        actual_expenses: Option<Decimal>,
    ) -> Self {
        if use_30_percent_rule {
            Self::Fixed30Percent
        } else {
            Self::ActualExpenses(actual_expenses.unwrap_or(Decimal::ZERO))
        }
    }

    pub fn uses_30_percent_rule(&self) -> bool {
        matches!(self, Self::Fixed30Percent)
    }
}

/// Everything the annual calculator needs to know about one issuer-year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    pub income: Decimal,
    pub expense_mode: ExpenseMode,
    /// Start of individual activity; drives the first-year VSDI exemption.
    pub activity_start_date: Option<NaiveDate>,
    /// The date the calculation is made for ("today" in the UI).
    pub evaluation_date: NaiveDate,
    /// Whether the issuer pays PSD monthly on their own.
    pub psd_self_paid: bool,
}

impl TaxInput {
    /// Income under the 30% rule, no activity start date, PSD self-paid.
    pub fn new(
        income: Decimal,
        evaluation_date: NaiveDate,
    ) -> Self {
        Self {
            income,
            expense_mode: ExpenseMode::Fixed30Percent,
            activity_start_date: None,
            evaluation_date,
            psd_self_paid: true,
        }
    }

    pub fn with_expense_mode(
        mut self,
        expense_mode: ExpenseMode,
    ) -> Self {
        self.expense_mode = expense_mode;
        self
    }

    pub fn with_activity_start_date(
        mut self,
        activity_start_date: Option<NaiveDate>,
    ) -> Self {
        self.activity_start_date = activity_start_date;
        self
    }

    pub fn with_psd_self_paid(
        mut self,
        psd_self_paid: bool,
    ) -> Self {
        self.psd_self_paid = psd_self_paid;
        self
    }

    /// Rejects negative income and negative actual expenses.
    pub fn validate(&self) -> Result<(), TaxCalculationError> {
        if self.income < Decimal::ZERO {
            return Err(TaxCalculationError::NegativeIncome(self.income));
        }
        if let ExpenseMode::ActualExpenses(amount) = self.expense_mode {
            if amount < Decimal::ZERO {
                return Err(TaxCalculationError::NegativeExpenses(amount));
            }
        }
        Ok(())
    }

    /// Whole calendar months between activity start and the evaluation date.
    ///
    /// Only year and month take part; the day of month is ignored, so
    /// 2024-01-31 → 2025-01-01 counts as 12 months.
    pub fn months_since_activity_start(&self) -> Option<i32> {
        self.activity_start_date.map(|start| {
            (self.evaluation_date.year() - start.year()) * 12
                + (self.evaluation_date.month() as i32 - start.month() as i32)
        })
    }
}
