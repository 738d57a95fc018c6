//! Yearly figures derived from stored invoices.
//!
//! These helpers sit between the repository and the calculators: they pull
//! invoice totals for an issuer and feed them through the annual and
//! monthly calculators. Income-based summaries always assume self-paid PSD
//! and the 30% expense rule.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{percent_of, round_half_up};
use crate::calculations::{AnnualTaxCalculator, MonthlyPsdCalculator, TaxCalculationError};
use crate::db::{InvoiceRepository, RepositoryError};
use crate::models::{MonthlyIncomeEntry, TaxInput, TaxResult, TaxRuleConstants};

/// Short Lithuanian month names used on the overview chart.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Sau", "Vas", "Kov", "Bal", "Geg", "Bir", "Lie", "Rgp", "Rgs", "Spa", "Lap", "Gru",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Calculation(#[from] TaxCalculationError),
}

/// The headline tax figures for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub gpm: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vsd: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psd: Decimal,
    /// VSDI + PSDI + GPM, including self-paid PSD.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gpm_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vsd_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub psd_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_percent: Decimal,
}

impl TaxSummary {
    pub fn zero() -> Self {
        let zero = round_half_up(Decimal::ZERO);
        Self {
            gpm: zero,
            vsd: zero,
            psd: zero,
            total: zero,
            gpm_percent: zero,
            vsd_percent: zero,
            psd_percent: zero,
            total_percent: zero,
        }
    }
}

impl From<&TaxResult> for TaxSummary {
    fn from(result: &TaxResult) -> Self {
        Self {
            gpm: result.gpm,
            vsd: result.vsdi,
            psd: result.psdi,
            total: result.total_taxes_display,
            gpm_percent: result.percentages.gpm,
            vsd_percent: result.percentages.vsdi,
            psd_percent: result.percentages.psdi,
            total_percent: result.percentages.total,
        }
    }
}

/// One bar of the monthly income chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyChartRow {
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    /// The year's total taxes, attributed in proportion to this month's income.
    #[serde(with = "rust_decimal::serde::float")]
    pub taxes: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOverview {
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_income: Decimal,
    pub taxes: TaxSummary,
    pub invoice_count: u64,
    /// Change against the previous year, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_income_growth: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_income_growth: Decimal,
    /// Total taxes as a percentage of gross income.
    #[serde(with = "rust_decimal::serde::float")]
    pub taxes_percent: Decimal,
    pub monthly: Vec<MonthlyChartRow>,
}

/// Sum of the issuer's invoice totals dated in `year`.
pub async fn gross_income<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
) -> Result<Decimal, AggregationError> {
    let total = repo.income_for_year(issuer_id, year).await?;
    Ok(round_half_up(total))
}

/// Tax summary for the year's gross income.
///
/// A year without income yields all zeros rather than the minimum PSD.
pub async fn tax_summary<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
    rules: &TaxRuleConstants,
    today: NaiveDate,
) -> Result<TaxSummary, AggregationError> {
    let gross = gross_income(repo, issuer_id, year).await?;
    if gross.is_zero() {
        debug!(issuer_id, year, "No income for year; tax summary is zero");
        return Ok(TaxSummary::zero());
    }

    let input = TaxInput::new(gross, today)
        .with_activity_start_date(activity_start_date(repo, issuer_id).await?);
    let result = AnnualTaxCalculator::new(rules.clone()).calculate(&input)?;
    Ok(TaxSummary::from(&result))
}

/// Gross income minus the summary's total taxes.
pub async fn net_income<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
    rules: &TaxRuleConstants,
    today: NaiveDate,
) -> Result<Decimal, AggregationError> {
    let gross = gross_income(repo, issuer_id, year).await?;
    let summary = tax_summary(repo, issuer_id, year, rules, today).await?;
    Ok(round_half_up(gross - summary.total))
}

/// Income for each of the twelve months, zero where nothing was invoiced.
pub async fn monthly_income<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
) -> Result<Vec<MonthlyIncomeEntry>, AggregationError> {
    let stored = repo.income_by_month(issuer_id, year).await?;
    let months = (1..=12)
        .map(|month| {
            let income = stored
                .iter()
                .find(|entry| entry.month == month)
                .map_or(Decimal::ZERO, |entry| entry.income);
            MonthlyIncomeEntry {
                month,
                income: round_half_up(income),
            }
        })
        .collect();
    Ok(months)
}

/// Annual calculation with PSDI taken from the year's actual monthly income.
pub async fn tax_result_with_monthly_psd<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
    input: &TaxInput,
    rules: &TaxRuleConstants,
) -> Result<TaxResult, AggregationError> {
    let months = monthly_income(repo, issuer_id, year).await?;
    let monthly = MonthlyPsdCalculator::new(rules.clone())
        .calculate(&months, input.expense_mode.uses_30_percent_rule())?;
    let result = AnnualTaxCalculator::new(rules.clone()).calculate_with_monthly_psd(input, monthly)?;
    Ok(result)
}

/// Everything the yearly overview shows, compared with the year before.
///
/// The previous year is evaluated with the same `rules`.
pub async fn year_overview<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    year: i32,
    rules: &TaxRuleConstants,
    today: NaiveDate,
) -> Result<YearOverview, AggregationError> {
    let gross = gross_income(repo, issuer_id, year).await?;
    let taxes = tax_summary(repo, issuer_id, year, rules, today).await?;
    let net = round_half_up(gross - taxes.total);

    let prev_gross = gross_income(repo, issuer_id, year - 1).await?;
    let prev_net = net_income(repo, issuer_id, year - 1, rules, today).await?;

    let monthly = monthly_income(repo, issuer_id, year)
        .await?
        .into_iter()
        .zip(MONTH_ABBREVIATIONS)
        .map(|(entry, name)| {
            let month_taxes = if gross > Decimal::ZERO {
                round_half_up(entry.income / gross * taxes.total)
            } else {
                round_half_up(Decimal::ZERO)
            };
            MonthlyChartRow {
                month: name.to_string(),
                income: entry.income,
                taxes: month_taxes,
                net: round_half_up(entry.income - month_taxes),
            }
        })
        .collect();

    Ok(YearOverview {
        year,
        gross_income: gross,
        net_income: net,
        invoice_count: repo.count_invoices(issuer_id, year).await?,
        gross_income_growth: growth(gross, prev_gross),
        net_income_growth: growth(net, prev_net),
        taxes_percent: percent_of(taxes.total, gross),
        taxes,
        monthly,
    })
}

/// Percentage change from `previous` to `current`.
///
/// Without a positive base, any positive `current` counts as 100% growth.
fn growth(
    current: Decimal,
    previous: Decimal,
) -> Decimal {
    if previous > Decimal::ZERO {
        round_half_up((current - previous) / previous * dec!(100))
    } else if current > Decimal::ZERO {
        round_half_up(dec!(100))
    } else {
        round_half_up(Decimal::ZERO)
    }
}

/// The issuer's activity start date; `None` when no profile is stored.
pub async fn activity_start_date<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
) -> Result<Option<NaiveDate>, AggregationError> {
    match repo.get_issuer_profile(issuer_id).await {
        Ok(profile) => Ok(profile.activity_start_date),
        Err(RepositoryError::NotFound) => {
            debug!(issuer_id, "No issuer profile; VSDI exemption not applied");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
