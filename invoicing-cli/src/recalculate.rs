//! Live tax recalculation from raw form fields.
//!
//! The invoicing UI posts the figures a user is typing and renders whatever
//! comes back: the full tax breakdown with status 200, or `{"error": ...}`
//! with status 400.

use chrono::NaiveDate;
use invoicing_core::aggregation::{activity_start_date, tax_result_with_monthly_psd};
use invoicing_core::calculations::common::parse_money;
use invoicing_core::{
    AnnualTaxCalculator, ExpenseMode, InvoiceRepository, TaxInput, TaxResult, TaxRuleConstants,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Form fields exactly as submitted; every field is optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecalculationRequest {
    /// Annual income; `"0"` when absent.
    pub income: Option<String>,
    /// `"true"` (the default) selects the 30% rule; anything else means
    /// actual expenses.
    pub use_30_percent: Option<String>,
    /// Actual expenses; read only when the 30% rule is off.
    pub expenses: Option<String>,
    /// When present, PSD is evaluated month by month from this year's invoices.
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Result(Box<TaxResult>),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalculationResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl RecalculationResponse {
    fn ok(result: TaxResult) -> Self {
        Self {
            status: STATUS_OK,
            body: ResponseBody::Result(Box::new(result)),
        }
    }

    fn bad_request(error: impl ToString) -> Self {
        Self {
            status: STATUS_BAD_REQUEST,
            body: ResponseBody::Error(ErrorResponse {
                error: error.to_string(),
            }),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body)
    }
}

impl RecalculationRequest {
    /// Builds the calculator input. PSD is always treated as self-paid.
    pub fn to_tax_input(
        &self,
        activity_start_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<TaxInput, invoicing_core::TaxCalculationError> {
        let income = parse_money("income", self.income.as_deref().unwrap_or("0"))?;
        let use_30_percent = self.use_30_percent.as_deref().unwrap_or("true") == "true";
        let expense_mode = if use_30_percent {
            ExpenseMode::Fixed30Percent
        } else {
            ExpenseMode::ActualExpenses(parse_money(
                "expenses",
                self.expenses.as_deref().unwrap_or("0"),
            )?)
        };

        Ok(TaxInput::new(income, today)
            .with_expense_mode(expense_mode)
            .with_activity_start_date(activity_start_date)
            .with_psd_self_paid(true))
    }

    /// The requested year, or `None` when absent, blank or not a number.
    fn monthly_year(&self) -> Option<i32> {
        let raw = self.year.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(year) => Some(year),
            Err(_) => {
                warn!(year = raw, "Ignoring unparseable year; using annual PSD estimate");
                None
            }
        }
    }
}

/// Handles one recalculation request for `issuer_id`.
///
/// A failing month-by-month PSD evaluation falls back to the annual
/// estimate; only input errors produce a 400.
pub async fn recalculate<R: InvoiceRepository + ?Sized>(
    repo: &R,
    issuer_id: i64,
    request: &RecalculationRequest,
    rules: &TaxRuleConstants,
    today: NaiveDate,
) -> RecalculationResponse {
    let start = match activity_start_date(repo, issuer_id).await {
        Ok(start) => start,
        Err(e) => return RecalculationResponse::bad_request(e),
    };
    let input = match request
        .to_tax_input(start, today)
        .and_then(|input| input.validate().map(|()| input))
    {
        Ok(input) => input,
        Err(e) => {
            debug!(error = %e, "Rejected recalculation request");
            return RecalculationResponse::bad_request(e);
        }
    };

    if let Some(year) = request.monthly_year() {
        match tax_result_with_monthly_psd(repo, issuer_id, year, &input, rules).await {
            Ok(result) => return RecalculationResponse::ok(result),
            Err(e) => {
                warn!(year, error = %e, "Monthly PSD unavailable; using annual estimate");
            }
        }
    }

    match AnnualTaxCalculator::new(rules.clone()).calculate(&input) {
        Ok(result) => RecalculationResponse::ok(result),
        Err(e) => RecalculationResponse::bad_request(e),
    }
}
