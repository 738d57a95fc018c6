mod client;
mod invoice;
mod issuer;
mod monthly_psd;
mod tax_input;
mod tax_result;
mod tax_rule_constants;

pub use client::{Client, NewClient};
pub use invoice::{
    DRAFT_PAYMENT_TERM_DAYS, Invoice, InvoiceDates, InvoiceSeries, LineItem, NewInvoice,
    NewLineItem, UPLOAD_PAYMENT_TERM_DAYS, UnitType,
};
pub use issuer::{IssuerProfile, TaxSettings};
pub use monthly_psd::{
    MonthlyIncomeEntry, MonthlyPsdBreakdownEntry, MonthlyPsdResult, PsdCalculationType,
};
pub use tax_input::{ExpenseMode, TaxInput};
pub use tax_result::{IncomeVsMma, PsdiMethod, TaxPercentages, TaxResult};
pub use tax_rule_constants::TaxRuleConstants;
