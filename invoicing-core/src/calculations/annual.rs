//! Annual tax estimate for Lithuanian individual activity.
//!
//! Turns a year's income into the three liabilities an individual-activity
//! taxpayer faces:
//!
//! | Tax  | Base                                   | Notes                                   |
//! |------|----------------------------------------|-----------------------------------------|
//! | VSDI | profit × contribution base rate        | waived during the first 12 months       |
//! | PSDI | profit × contribution base rate        | floored at the monthly minimum × 12     |
//! | GPM  | profit − VSDI (− PSDI if not self-paid) | only the part up to the limit is taxed |
//!
//! Every intermediate amount is rounded to cents before the next step uses
//! it, so results match what the tax office's own worksheets produce.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use invoicing_core::calculations::AnnualTaxCalculator;
//! use invoicing_core::{TaxInput, TaxRuleConstants};
//!
//! let calculator = AnnualTaxCalculator::new(TaxRuleConstants::lithuania_2025());
//! let input = TaxInput::new(dec!(1000.00), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
//!
//! let result = calculator.calculate(&input).unwrap();
//!
//! assert_eq!(result.expenses, dec!(300.00));
//! assert_eq!(result.psdi, dec!(869.40));
//! assert_eq!(result.net_income, dec!(623.37));
//! ```

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::TaxCalculationError;
use super::common::{MONTHS_PER_YEAR, percent_of, round_half_up};
use crate::models::{
    ExpenseMode, IncomeVsMma, MonthlyPsdBreakdownEntry, MonthlyPsdResult, PsdiMethod, TaxInput,
    TaxPercentages, TaxResult, TaxRuleConstants,
};

/// Months of activity after which the VSDI exemption ends.
const VSDI_EXEMPTION_MONTHS: i32 = 12;

/// PSDI figure together with how it was obtained.
struct PsdiOutcome {
    amount: Decimal,
    method: PsdiMethod,
    note: String,
    breakdown: Option<Vec<MonthlyPsdBreakdownEntry>>,
}

/// Calculator for the annual tax estimate.
///
/// Holds one year's [`TaxRuleConstants`]; the same calculator can be reused
/// for any number of inputs.
#[derive(Debug, Clone)]
pub struct AnnualTaxCalculator {
    rules: TaxRuleConstants,
}

impl AnnualTaxCalculator {
    pub fn new(rules: TaxRuleConstants) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TaxRuleConstants {
        &self.rules
    }

    /// Calculates the full breakdown for one year of income.
    ///
    /// PSDI is estimated from the average month: the whole year is treated
    /// as twelve identical months of `income / 12`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError`] if the rule set is invalid, income is
    /// negative, or actual expenses are negative.
    pub fn calculate(
        &self,
        input: &TaxInput,
    ) -> Result<TaxResult, TaxCalculationError> {
        self.run(input, None)
    }

    /// Same as [`calculate`](Self::calculate), but PSDI is the annual total
    /// of a month-by-month evaluation.
    ///
    /// GPM, the totals, net income and percentages are all derived from the
    /// substituted PSDI, and the monthly breakdown is attached to the result.
    pub fn calculate_with_monthly_psd(
        &self,
        input: &TaxInput,
        monthly: MonthlyPsdResult,
    ) -> Result<TaxResult, TaxCalculationError> {
        self.run(input, Some(monthly))
    }

    fn run(
        &self,
        input: &TaxInput,
        monthly: Option<MonthlyPsdResult>,
    ) -> Result<TaxResult, TaxCalculationError> {
        self.rules.validate()?;
        input.validate()?;

        let income = input.income;
        let expenses = self.expenses(income, input.expense_mode);
        let profit = self.profit(income, expenses);
        let vsdi_base = self.contribution_base(profit);
        let psdi_base = self.contribution_base(profit);

        let vsdi_exempt = self.is_vsdi_exempt(input);
        let vsdi = self.vsdi(vsdi_base, vsdi_exempt);

        let psdi = match monthly {
            Some(monthly) => Self::monthly_psdi(monthly),
            None => self.psdi(income, psdi_base, input.psd_self_paid),
        };

        let gpm_base = self.gpm_base(profit, vsdi, psdi.amount, input.psd_self_paid);
        let gpm_taxable = self.gpm_taxable(gpm_base);
        let gpm = self.gpm(gpm_taxable);

        let total_taxes_display = round_half_up(vsdi + psdi.amount + gpm);
        let total_taxes_to_deduct = if input.psd_self_paid {
            round_half_up(vsdi + gpm)
        } else {
            total_taxes_display
        };
        let net_income = round_half_up(income - expenses - total_taxes_to_deduct);

        let percentages = TaxPercentages {
            gpm: percent_of(gpm, income),
            vsdi: percent_of(vsdi, income),
            psdi: percent_of(psdi.amount, income),
            total: percent_of(total_taxes_display, income),
        };

        let income_vs_mma = if income <= self.rules.minimum_monthly_wage {
            IncomeVsMma::Below
        } else {
            IncomeVsMma::Above
        };

        Ok(TaxResult {
            income,
            expenses,
            profit,
            vsdi_base,
            psdi_base,
            vsdi,
            psdi: psdi.amount,
            psdi_is_self_paid: input.psd_self_paid,
            psdi_note: psdi.note,
            psdi_method: psdi.method,
            psdi_monthly_breakdown: psdi.breakdown,
            gpm_base,
            gpm_taxable,
            gpm,
            total_taxes_display,
            total_taxes_to_deduct,
            net_income,
            vsdi_exempt,
            income_vs_mma,
            mma_threshold: self.rules.minimum_monthly_wage,
            min_psd_monthly: self.rules.min_psd_monthly,
            percentages,
        })
    }

    fn expenses(
        &self,
        income: Decimal,
        mode: ExpenseMode,
    ) -> Decimal {
        match mode {
            ExpenseMode::Fixed30Percent => round_half_up(income * self.rules.flat_expense_rate),
            ExpenseMode::ActualExpenses(amount) => amount,
        }
    }

    fn profit(
        &self,
        income: Decimal,
        expenses: Decimal,
    ) -> Decimal {
        let profit = round_half_up(income - expenses);
        if profit < Decimal::ZERO {
            warn!(
                income = %income,
                expenses = %expenses,
                profit = %profit,
                "Expenses exceed income; profit is negative"
            );
        }
        profit
    }

    /// Declared base shared by VSDI and PSDI.
    fn contribution_base(
        &self,
        profit: Decimal,
    ) -> Decimal {
        round_half_up(profit * self.rules.contribution_base_rate)
    }

    fn is_vsdi_exempt(
        &self,
        input: &TaxInput,
    ) -> bool {
        match input.months_since_activity_start() {
            Some(months) => {
                let exempt = months < VSDI_EXEMPTION_MONTHS;
                debug!(months, exempt, "Evaluated first-year VSDI exemption");
                exempt
            }
            None => false,
        }
    }

    fn vsdi(
        &self,
        vsdi_base: Decimal,
        exempt: bool,
    ) -> Decimal {
        if exempt {
            return round_half_up(Decimal::ZERO);
        }
        round_half_up(vsdi_base * self.rules.vsdi_rate)
    }

    fn psdi(
        &self,
        income: Decimal,
        psdi_base: Decimal,
        self_paid: bool,
    ) -> PsdiOutcome {
        let min = self.rules.min_psd_monthly;
        let monthly_income = round_half_up(income / MONTHS_PER_YEAR);

        if monthly_income <= self.rules.minimum_monthly_wage {
            debug!(
                monthly_income = %monthly_income,
                mma = %self.rules.minimum_monthly_wage,
                "Average month at or below MMA; minimal PSD applies"
            );
            let note = if self_paid {
                format!(
                    "Minimalus savaimokestis {min}€/mėn × 12 mėn (vid. pajamos {monthly_income}€/mėn ≤ MMA)"
                )
            } else {
                format!("Minimalus PSD {min}€/mėn × 12 mėn")
            };
            return PsdiOutcome {
                amount: round_half_up(min * MONTHS_PER_YEAR),
                method: PsdiMethod::Minimal,
                note,
                breakdown: None,
            };
        }

        if self_paid {
            let monthly_base = round_half_up(psdi_base / MONTHS_PER_YEAR);
            let monthly_psdi = round_half_up(monthly_base * self.rules.psdi_rate);
            PsdiOutcome {
                amount: round_half_up(monthly_psdi * MONTHS_PER_YEAR),
                method: PsdiMethod::Standard,
                note: format!(
                    "Savaimokestis {monthly_psdi}€/mėn × 12 mėn (vid. pajamos {monthly_income}€/mėn > MMA)"
                ),
                breakdown: None,
            }
        } else {
            PsdiOutcome {
                amount: round_half_up(psdi_base * self.rules.psdi_rate),
                method: PsdiMethod::Standard,
                note: "Standartinis metinis skaičiavimas".to_string(),
                breakdown: None,
            }
        }
    }

    fn monthly_psdi(monthly: MonthlyPsdResult) -> PsdiOutcome {
        let total = round_half_up(monthly.annual_total);
        PsdiOutcome {
            amount: total,
            method: PsdiMethod::Monthly,
            note: format!(
                "Savaimokestis skaičiuojamas kiekvieną mėnesį pagal faktines pajamas (suma: {total}€/metus)"
            ),
            breakdown: Some(monthly.breakdown),
        }
    }

    /// Self-paid PSD is not deductible from the GPM base.
    fn gpm_base(
        &self,
        profit: Decimal,
        vsdi: Decimal,
        psdi: Decimal,
        self_paid: bool,
    ) -> Decimal {
        if self_paid {
            round_half_up(profit - vsdi)
        } else {
            round_half_up(profit - vsdi - psdi)
        }
    }

    fn gpm_taxable(
        &self,
        gpm_base: Decimal,
    ) -> Decimal {
        if gpm_base > self.rules.gpm_limit {
            debug!(
                gpm_base = %gpm_base,
                gpm_limit = %self.rules.gpm_limit,
                "GPM base above limit; taxing up to the limit only"
            );
            return self.rules.gpm_limit;
        }
        gpm_base
    }

    fn gpm(
        &self,
        gpm_taxable: Decimal,
    ) -> Decimal {
        round_half_up(gpm_taxable * self.rules.gpm_rate)
    }
}
