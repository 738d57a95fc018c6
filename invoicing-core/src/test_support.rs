//! In-memory [`InvoiceRepository`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;

use crate::db::{InvoiceRepository, RepositoryError};
use crate::models::{
    Client, Invoice, IssuerProfile, LineItem, MonthlyIncomeEntry, NewClient, NewInvoice,
    TaxRuleConstants, TaxSettings,
};
use crate::numbering::next_invoice_number;

#[derive(Default)]
struct State {
    rules: HashMap<i32, TaxRuleConstants>,
    profiles: HashMap<i64, IssuerProfile>,
    settings: HashMap<i64, TaxSettings>,
    clients: Vec<Client>,
    invoices: Vec<Invoice>,
}

#[derive(Default)]
pub(crate) struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub(crate) fn with_rules(rules: TaxRuleConstants) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().rules.insert(rules.tax_year, rules);
        repo
    }

    fn year_invoices(
        state: &State,
        issuer_id: i64,
        year: i32,
    ) -> Vec<Invoice> {
        state
            .invoices
            .iter()
            .filter(|inv| inv.issuer_id == issuer_id && inv.date.year() == year)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryRepository {
    async fn get_tax_rules(&self, year: i32) -> Result<TaxRuleConstants, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.rules.get(&year).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut years: Vec<i32> = state.rules.keys().copied().collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        Ok(years)
    }

    async fn get_issuer_profile(&self, issuer_id: i64) -> Result<IssuerProfile, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.profiles.get(&issuer_id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn save_issuer_profile(&self, profile: &IssuerProfile) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.profiles.insert(profile.issuer_id, profile.clone());
        Ok(())
    }

    async fn get_tax_settings(&self, issuer_id: i64) -> Result<TaxSettings, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.settings.get(&issuer_id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn save_tax_settings(&self, settings: &TaxSettings) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.settings.insert(settings.issuer_id, settings.clone());
        Ok(())
    }

    async fn create_client(&self, client: NewClient) -> Result<Client, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let client = Client {
            id: state.clients.len() as i64 + 1,
            company_name: client.company_name,
            company_code: client.company_code,
            pvm_code: client.pvm_code,
            address: client.address,
            first_name: client.first_name,
            last_name: client.last_name,
            phone: client.phone,
        };
        state.clients.push(client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: i64) -> Result<Client, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.clients.iter().find(|c| c.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_client_by_code(&self, company_code: &str) -> Result<Client, RepositoryError> {
        let state = self.state.lock().unwrap();
        state
            .clients
            .iter()
            .find(|c| c.company_code == company_code)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        Ok(self.state.lock().unwrap().clients.clone())
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let invoice_number = match invoice.invoice_number {
            Some(number) => number,
            None => {
                let last = state
                    .invoices
                    .iter()
                    .rev()
                    .find(|inv| inv.issuer_id == invoice.issuer_id)
                    .map(|inv| inv.invoice_number.clone());
                next_invoice_number(last.as_deref()).number
            }
        };
        if state
            .invoices
            .iter()
            .any(|inv| inv.issuer_id == invoice.issuer_id && inv.invoice_number == invoice_number)
        {
            return Err(RepositoryError::Conflict(format!(
                "invoice number {invoice_number} already exists"
            )));
        }

        let id = state.invoices.len() as i64 + 1;
        let line_items = invoice
            .line_items
            .iter()
            .enumerate()
            .map(|(i, item)| LineItem {
                id: i as i64 + 1,
                invoice_id: id,
                service_name: item.service_name.clone(),
                quantity: item.quantity,
                unit: item.unit,
                price: item.price,
                total_amount: item.total_amount(),
            })
            .collect();
        let stored = Invoice {
            id,
            series: invoice.series,
            issuer_id: invoice.issuer_id,
            client_id: invoice.client_id,
            date: invoice.date,
            pay_until: invoice.pay_until,
            invoice_number,
            total_amount: invoice.total_amount,
            line_items,
            created_at: Utc::now(),
        };
        state.invoices.push(stored.clone());
        Ok(stored)
    }

    async fn get_invoice(&self, id: i64) -> Result<Invoice, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.invoices.iter().find(|inv| inv.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn list_invoices(
        &self,
        issuer_id: i64,
        year: Option<i32>,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoices
            .iter()
            .filter(|inv| inv.issuer_id == issuer_id)
            .filter(|inv| year.is_none_or(|y| inv.date.year() == y))
            .cloned()
            .collect())
    }

    async fn last_invoice_number(&self, issuer_id: i64) -> Result<Option<String>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoices
            .iter()
            .rev()
            .find(|inv| inv.issuer_id == issuer_id)
            .map(|inv| inv.invoice_number.clone()))
    }

    async fn count_invoices(&self, issuer_id: i64, year: i32) -> Result<u64, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(Self::year_invoices(&state, issuer_id, year).len() as u64)
    }

    async fn income_for_year(&self, issuer_id: i64, year: i32) -> Result<Decimal, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(Self::year_invoices(&state, issuer_id, year)
            .iter()
            .map(|inv| inv.total_amount)
            .sum())
    }

    async fn income_by_month(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<Vec<MonthlyIncomeEntry>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut totals = [Decimal::ZERO; 12];
        let mut seen = [false; 12];
        for inv in Self::year_invoices(&state, issuer_id, year) {
            let idx = inv.date.month0() as usize;
            totals[idx] += inv.total_amount;
            seen[idx] = true;
        }
        Ok((0..12)
            .filter(|&i| seen[i])
            .map(|i| MonthlyIncomeEntry {
                month: i as u32 + 1,
                income: totals[i],
            })
            .collect())
    }
}
