//! Month-by-month PSD (health insurance) evaluation.
//!
//! Each month is compared against the minimum monthly wage on its own, so a
//! single busy month is charged at the full rate even when the yearly
//! average stays below the wage. The annual calculator's estimate treats the
//! year as twelve average months instead; the two can legitimately differ.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::TaxCalculationError;
use super::common::round_half_up;
use crate::models::{
    MonthlyIncomeEntry, MonthlyPsdBreakdownEntry, MonthlyPsdResult, PsdCalculationType,
    TaxRuleConstants,
};

/// Calculator for per-month PSD amounts.
#[derive(Debug, Clone)]
pub struct MonthlyPsdCalculator {
    rules: TaxRuleConstants,
}

impl MonthlyPsdCalculator {
    pub fn new(rules: TaxRuleConstants) -> Self {
        Self { rules }
    }

    /// Evaluates every entry independently and sums the monthly amounts.
    ///
    /// The breakdown keeps the order of `months`. With the 30% rule off no
    /// expenses are deducted at all.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError`] if the rule set is invalid or any entry
    /// has a month outside 1..=12 or negative income.
    pub fn calculate(
        &self,
        months: &[MonthlyIncomeEntry],
        use_30_percent_rule: bool,
    ) -> Result<MonthlyPsdResult, TaxCalculationError> {
        self.rules.validate()?;

        let mut breakdown = Vec::with_capacity(months.len());
        let mut annual_total = round_half_up(Decimal::ZERO);

        for entry in months {
            entry.validate()?;
            let row = self.month(entry, use_30_percent_rule);
            annual_total += row.psd;
            breakdown.push(row);
        }

        debug!(
            months = breakdown.len(),
            annual_total = %annual_total,
            "Calculated monthly PSD"
        );

        Ok(MonthlyPsdResult {
            breakdown,
            annual_total,
            mma_threshold: self.rules.minimum_monthly_wage,
            min_psd_monthly: self.rules.min_psd_monthly,
        })
    }

    fn month(
        &self,
        entry: &MonthlyIncomeEntry,
        use_30_percent_rule: bool,
    ) -> MonthlyPsdBreakdownEntry {
        let income = entry.income;
        let expenses = if use_30_percent_rule {
            round_half_up(income * self.rules.flat_expense_rate)
        } else {
            round_half_up(Decimal::ZERO)
        };
        let profit = round_half_up(income - expenses);
        let psdi_base = round_half_up(profit * self.rules.contribution_base_rate);
        let above_mma = income > self.rules.minimum_monthly_wage;

        let (psd, calculation_type) = if !above_mma {
            (self.rules.min_psd_monthly, PsdCalculationType::Minimal)
        } else {
            let calculated = round_half_up(psdi_base * self.rules.psdi_rate);
            if calculated < self.rules.min_psd_monthly {
                warn!(
                    month = entry.month,
                    calculated = %calculated,
                    minimum = %self.rules.min_psd_monthly,
                    "Monthly PSD below minimum; raising to minimum"
                );
                (self.rules.min_psd_monthly, PsdCalculationType::Minimal)
            } else {
                (calculated, PsdCalculationType::Calculated)
            }
        };

        MonthlyPsdBreakdownEntry {
            month: entry.month,
            income,
            profit,
            psdi_base,
            psd: round_half_up(psd),
            calculation_type,
            above_mma,
        }
    }
}
