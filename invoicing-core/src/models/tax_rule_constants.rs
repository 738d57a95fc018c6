use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::TaxCalculationError;

/// Legal constants for one calendar year of Lithuanian self-employment taxes.
///
/// Every calculator receives these as a value; nothing in the calculation
/// logic embeds a rate or threshold of its own. A new tax year is supported
/// by supplying a new row (database seed, config file) rather than by
/// editing code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRuleConstants {
    pub tax_year: i32,

    /// State social insurance (VSDI) rate applied to the contribution base.
    pub vsdi_rate: Decimal,

    /// Health insurance (PSDI) rate applied to the contribution base.
    pub psdi_rate: Decimal,

    /// Personal income tax (GPM) rate for the first tier.
    pub gpm_rate: Decimal,

    /// Upper bound of the GPM base taxed at `gpm_rate`.
    ///
    /// Anything above it is not taxed further; no higher bracket is modelled.
    pub gpm_limit: Decimal,

    /// Statutory minimum monthly wage (MMA).
    pub minimum_monthly_wage: Decimal,

    /// PSD floor paid for every month at or below the MMA.
    pub min_psd_monthly: Decimal,

    /// Share of income deductible under the 30% expense rule.
    pub flat_expense_rate: Decimal,

    /// Share of profit declared as the VSDI/PSDI contribution base.
    pub contribution_base_rate: Decimal,
}

impl TaxRuleConstants {
    /// The 2025 rule set.
    pub fn lithuania_2025() -> Self {
        Self {
            tax_year: 2025,
            vsdi_rate: dec!(0.1252),
            psdi_rate: dec!(0.0698),
            gpm_rate: dec!(0.05),
            gpm_limit: dec!(11900.00),
            minimum_monthly_wage: dec!(1038.00),
            min_psd_monthly: dec!(72.45),
            flat_expense_rate: dec!(0.30),
            contribution_base_rate: dec!(0.50),
        }
    }

    /// Checks that every rate lies in `[0, 1]` and every amount is non-negative.
    ///
    /// # Errors
    ///
    /// Returns the first offending value as [`TaxCalculationError::InvalidRate`]
    /// or [`TaxCalculationError::InvalidAmountLimit`].
    pub fn validate(&self) -> Result<(), TaxCalculationError> {
        let rates = [
            ("vsdi_rate", self.vsdi_rate),
            ("psdi_rate", self.psdi_rate),
            ("gpm_rate", self.gpm_rate),
            ("flat_expense_rate", self.flat_expense_rate),
            ("contribution_base_rate", self.contribution_base_rate),
        ];
        for (name, value) in rates {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(TaxCalculationError::InvalidRate { name, value });
            }
        }

        let amounts = [
            ("gpm_limit", self.gpm_limit),
            ("minimum_monthly_wage", self.minimum_monthly_wage),
            ("min_psd_monthly", self.min_psd_monthly),
        ];
        for (name, value) in amounts {
            if value < Decimal::ZERO {
                return Err(TaxCalculationError::InvalidAmountLimit { name, value });
            }
        }

        Ok(())
    }
}

impl Default for TaxRuleConstants {
    fn default() -> Self {
        Self::lithuania_2025()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lithuania_2025_is_valid() {
        assert_eq!(TaxRuleConstants::lithuania_2025().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_rate_above_one() {
        let rules = TaxRuleConstants {
            psdi_rate: dec!(6.98),
            ..TaxRuleConstants::lithuania_2025()
        };

        assert_eq!(
            rules.validate(),
            Err(TaxCalculationError::InvalidRate {
                name: "psdi_rate",
                value: dec!(6.98),
            })
        );
    }

    #[test]
    fn validate_rejects_negative_rate() {
        let rules = TaxRuleConstants {
            flat_expense_rate: dec!(-0.30),
            ..TaxRuleConstants::lithuania_2025()
        };

        assert_eq!(
            rules.validate(),
            Err(TaxCalculationError::InvalidRate {
                name: "flat_expense_rate",
                value: dec!(-0.30),
            })
        );
    }

    #[test]
    fn validate_rejects_negative_minimum_wage() {
        let rules = TaxRuleConstants {
            minimum_monthly_wage: dec!(-1.00),
            ..TaxRuleConstants::lithuania_2025()
        };

        assert_eq!(
            rules.validate(),
            Err(TaxCalculationError::InvalidAmountLimit {
                name: "minimum_monthly_wage",
                value: dec!(-1.00),
            })
        );
    }

    #[test]
    fn validate_accepts_zero_rates() {
        let rules = TaxRuleConstants {
            gpm_rate: Decimal::ZERO,
            gpm_limit: Decimal::ZERO,
            ..TaxRuleConstants::lithuania_2025()
        };

        assert_eq!(rules.validate(), Ok(()));
    }
}
