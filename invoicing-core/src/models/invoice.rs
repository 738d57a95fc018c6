use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::TaxCalculationError;
use crate::calculations::common::round_half_up;

/// Days between an invoice's date and its payment deadline when drafted by hand.
pub const DRAFT_PAYMENT_TERM_DAYS: u64 = 14;

/// Days between a month-level upload's date and its payment deadline.
pub const UPLOAD_PAYMENT_TERM_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvoiceSeries {
    #[default]
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "VSP")]
    Vsp,
}

impl InvoiceSeries {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aa => "AA",
            Self::Vsp => "VSP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AA" => Some(Self::Aa),
            "VSP" => Some(Self::Vsp),
            _ => None,
        }
    }
}

/// Unit a line item's quantity is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Hours ("val.").
    Val,
    /// Pieces ("vnt.").
    Vnt,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Val => "val",
            Self::Vnt => "vnt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "val" => Some(Self::Val),
            "vnt" => Some(Self::Vnt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub invoice_id: i64,
    pub service_name: String,
    pub quantity: Decimal,
    pub unit: UnitType,
    pub price: Decimal,
    pub total_amount: Decimal,
}

/// For creating new line items (no ids)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub service_name: String,
    pub quantity: Decimal,
    pub unit: UnitType,
    pub price: Decimal,
}

impl NewLineItem {
    /// `quantity × price`, rounded to cents.
    pub fn total_amount(&self) -> Decimal {
        round_half_up(self.quantity * self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub series: InvoiceSeries,
    pub issuer_id: i64,
    pub client_id: i64,
    pub date: NaiveDate,
    pub pay_until: NaiveDate,
    pub invoice_number: String,
    pub total_amount: Decimal,
    pub line_items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

/// Issue date and payment deadline of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDates {
    pub date: NaiveDate,
    pub pay_until: NaiveDate,
}

impl InvoiceDates {
    /// Dated `today`, payable within two weeks.
    pub fn default_for(today: NaiveDate) -> Self {
        Self {
            date: today,
            pay_until: today + Days::new(DRAFT_PAYMENT_TERM_DAYS),
        }
    }
}

/// For creating new invoices (no id or timestamps)
///
/// A `None` invoice number asks the repository to allocate the next one for
/// the issuer in the same transaction as the insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub series: InvoiceSeries,
    pub issuer_id: i64,
    pub client_id: i64,
    pub invoice_number: Option<String>,
    pub date: NaiveDate,
    pub pay_until: NaiveDate,
    pub total_amount: Decimal,
    pub line_items: Vec<NewLineItem>,
}

impl NewInvoice {
    /// Builds an invoice whose total is the sum of its line totals.
    pub fn from_line_items(
        series: InvoiceSeries,
        issuer_id: i64,
        client_id: i64,
        invoice_number: Option<String>,
        dates: InvoiceDates,
        line_items: Vec<NewLineItem>,
    ) -> Self {
        let total_amount = line_items.iter().map(NewLineItem::total_amount).sum();
        Self {
            series,
            issuer_id,
            client_id,
            invoice_number,
            date: dates.date,
            pay_until: dates.pay_until,
            total_amount,
            line_items,
        }
    }

    /// A month-level invoice recorded only by its total, dated on the first
    /// of the month and payable within 30 days.
    ///
    /// # Errors
    ///
    /// [`TaxCalculationError::InvalidMonth`] when `month` is outside 1..=12.
    pub fn monthly_upload(
        issuer_id: i64,
        client_id: i64,
        invoice_number: String,
        year: i32,
        month: u32,
        total_amount: Decimal,
    ) -> Result<Self, TaxCalculationError> {
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(TaxCalculationError::InvalidMonth(month))?;
        Ok(Self {
            series: InvoiceSeries::default(),
            issuer_id,
            client_id,
            invoice_number: Some(invoice_number),
            date,
            pay_until: date + Days::new(UPLOAD_PAYMENT_TERM_DAYS),
            total_amount,
            line_items: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(
        quantity: Decimal,
        price: Decimal,
    ) -> NewLineItem {
        NewLineItem {
            service_name: "Konsultacija".to_string(),
            quantity,
            unit: UnitType::Val,
            price,
        }
    }

    #[test]
    fn series_round_trips_through_str() {
        for series in [InvoiceSeries::Aa, InvoiceSeries::Vsp] {
            assert_eq!(InvoiceSeries::parse(series.as_str()), Some(series));
        }
        assert_eq!(InvoiceSeries::parse("XX"), None);
    }

    #[test]
    fn unit_type_parse_rejects_unknown() {
        assert_eq!(UnitType::parse("vnt"), Some(UnitType::Vnt));
        assert_eq!(UnitType::parse("kg"), None);
    }

    #[test]
    fn line_total_rounds_half_up() {
        let line = item(dec!(1.5), dec!(10.333));

        // 15.4995 -> 15.50
        assert_eq!(line.total_amount(), dec!(15.50));
    }

    #[test]
    fn invoice_total_sums_line_totals() {
        let invoice = NewInvoice::from_line_items(
            InvoiceSeries::Aa,
            1,
            2,
            None,
            InvoiceDates::default_for(date(2025, 3, 10)),
            vec![item(dec!(2), dec!(45.00)), item(dec!(0.5), dec!(60.00))],
        );

        assert_eq!(invoice.total_amount, dec!(120.00));
        assert_eq!(invoice.line_items.len(), 2);
    }

    #[test]
    fn default_dates_give_two_week_term() {
        let dates = InvoiceDates::default_for(date(2025, 12, 25));

        assert_eq!(dates.pay_until, date(2026, 1, 8));
    }

    #[test]
    fn monthly_upload_dates_first_of_month_with_30_day_term() {
        let invoice =
            NewInvoice::monthly_upload(1, 2, "00000007".to_string(), 2025, 2, dec!(1500.00))
                .expect("valid month");

        assert_eq!(invoice.date, date(2025, 2, 1));
        assert_eq!(invoice.pay_until, date(2025, 3, 3));
        assert_eq!(invoice.series, InvoiceSeries::Aa);
        assert!(invoice.line_items.is_empty());
    }

    #[test]
    fn monthly_upload_rejects_month_13() {
        let result = NewInvoice::monthly_upload(1, 2, "1".to_string(), 2025, 13, dec!(1));

        assert_eq!(result, Err(TaxCalculationError::InvalidMonth(13)));
    }
}
