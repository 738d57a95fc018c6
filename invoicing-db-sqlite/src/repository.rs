use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use invoicing_core::numbering::next_invoice_number;
use invoicing_core::{
    Client, Invoice, InvoiceRepository, InvoiceSeries, IssuerProfile, LineItem,
    MonthlyIncomeEntry, NewClient, NewInvoice, RepositoryError, TaxRuleConstants, TaxSettings,
    UnitType,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

const IN_MEMORY: &str = ":memory:";

const INVOICE_COLUMNS: &str = "id, series, issuer_id, client_id, date, pay_until, invoice_number, \
                               total_amount, created_at";

const CLIENT_COLUMNS: &str =
    "id, company_name, company_code, pvm_code, address, first_name, last_name, phone";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens a database file, creating it when missing, or an in-memory
    /// database for `":memory:"`.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = if connection_string == IN_MEMORY {
            // Every connection to `sqlite::memory:` is its own database, so the
            // pool must hold exactly one and never recycle it.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await
        } else {
            let options = SqliteConnectOptions::new()
                .filename(connection_string)
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await
        }
        .with_context(|| format!("Failed to connect to database: {}", connection_string))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(seed = %path.display(), "Applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn line_items(
        &self,
        invoice_id: i64,
    ) -> Result<Vec<LineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, invoice_id, service_name, quantity, unit, price, total_amount
             FROM line_item WHERE invoice_id = ? ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_line_item).collect()
    }

    async fn with_line_items(
        &self,
        mut invoice: Invoice,
    ) -> Result<Invoice, RepositoryError> {
        invoice.line_items = self.line_items(invoice.id).await?;
        Ok(invoice)
    }

    async fn invoice_rows_for_year(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<Vec<SqliteRow>, RepositoryError> {
        let (start, end) = year_bounds(year)?;
        sqlx::query(
            "SELECT date, total_amount FROM invoice
             WHERE issuer_id = ? AND date >= ? AND date < ?",
        )
        .bind(issuer_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Maps unique-constraint failures to [`RepositoryError::Conflict`].
fn write_err(
    e: sqlx::Error,
    what: &str,
) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        _ => db_err(e),
    }
}

/// Half-open `[Jan 1, Jan 1 next year)` range for date filters.
fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), RepositoryError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = year
        .checked_add(1)
        .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
    start
        .zip(end)
        .ok_or_else(|| RepositoryError::Database(format!("Year {} is out of range", year)))
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn row_to_client(row: &SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: get(row, "id")?,
        company_name: get(row, "company_name")?,
        company_code: get(row, "company_code")?,
        pvm_code: get(row, "pvm_code")?,
        address: get(row, "address")?,
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        phone: get(row, "phone")?,
    })
}

fn row_to_line_item(row: &SqliteRow) -> Result<LineItem, RepositoryError> {
    let unit: String = get(row, "unit")?;
    Ok(LineItem {
        id: get(row, "id")?,
        invoice_id: get(row, "invoice_id")?,
        service_name: get(row, "service_name")?,
        quantity: get_decimal(row, "quantity")?,
        unit: UnitType::parse(&unit)
            .ok_or_else(|| RepositoryError::Database(format!("Invalid unit: {}", unit)))?,
        price: get_decimal(row, "price")?,
        total_amount: get_decimal(row, "total_amount")?,
    })
}

/// Invoice header only; line items are loaded separately.
fn row_to_invoice(row: &SqliteRow) -> Result<Invoice, RepositoryError> {
    let series: String = get(row, "series")?;
    Ok(Invoice {
        id: get(row, "id")?,
        series: InvoiceSeries::parse(&series)
            .ok_or_else(|| RepositoryError::Database(format!("Invalid series: {}", series)))?,
        issuer_id: get(row, "issuer_id")?,
        client_id: get(row, "client_id")?,
        date: get::<NaiveDate>(row, "date")?,
        pay_until: get::<NaiveDate>(row, "pay_until")?,
        invoice_number: get(row, "invoice_number")?,
        total_amount: get_decimal(row, "total_amount")?,
        line_items: Vec::new(),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

#[async_trait]
impl InvoiceRepository for SqliteRepository {
    async fn get_tax_rules(
        &self,
        year: i32,
    ) -> Result<TaxRuleConstants, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, vsdi_rate, psdi_rate, gpm_rate, gpm_limit,
                    minimum_monthly_wage, min_psd_monthly, flat_expense_rate,
                    contribution_base_rate
             FROM tax_rule_constants WHERE tax_year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxRuleConstants {
            tax_year: get(&row, "tax_year")?,
            vsdi_rate: get_decimal(&row, "vsdi_rate")?,
            psdi_rate: get_decimal(&row, "psdi_rate")?,
            gpm_rate: get_decimal(&row, "gpm_rate")?,
            gpm_limit: get_decimal(&row, "gpm_limit")?,
            minimum_monthly_wage: get_decimal(&row, "minimum_monthly_wage")?,
            min_psd_monthly: get_decimal(&row, "min_psd_monthly")?,
            flat_expense_rate: get_decimal(&row, "flat_expense_rate")?,
            contribution_base_rate: get_decimal(&row, "contribution_base_rate")?,
        })
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        sqlx::query_scalar("SELECT tax_year FROM tax_rule_constants ORDER BY tax_year DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn get_issuer_profile(
        &self,
        issuer_id: i64,
    ) -> Result<IssuerProfile, RepositoryError> {
        let row = sqlx::query(
            "SELECT issuer_id, title, first_name, last_name, individual_code, email,
                    address, phone, bank_account, activity_start_date
             FROM issuer_profile WHERE issuer_id = ?",
        )
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(IssuerProfile {
            issuer_id: get(&row, "issuer_id")?,
            title: get(&row, "title")?,
            first_name: get(&row, "first_name")?,
            last_name: get(&row, "last_name")?,
            individual_code: get(&row, "individual_code")?,
            email: get(&row, "email")?,
            address: get(&row, "address")?,
            phone: get(&row, "phone")?,
            bank_account: get(&row, "bank_account")?,
            activity_start_date: get::<Option<NaiveDate>>(&row, "activity_start_date")?,
        })
    }

    async fn save_issuer_profile(
        &self,
        profile: &IssuerProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO issuer_profile (
                issuer_id, title, first_name, last_name, individual_code, email,
                address, phone, bank_account, activity_start_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(issuer_id) DO UPDATE SET
                title = excluded.title,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                individual_code = excluded.individual_code,
                email = excluded.email,
                address = excluded.address,
                phone = excluded.phone,
                bank_account = excluded.bank_account,
                activity_start_date = excluded.activity_start_date",
        )
        .bind(profile.issuer_id)
        .bind(&profile.title)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.individual_code)
        .bind(&profile.email)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.bank_account)
        .bind(profile.activity_start_date)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_tax_settings(
        &self,
        issuer_id: i64,
    ) -> Result<TaxSettings, RepositoryError> {
        let row = sqlx::query(
            "SELECT issuer_id, use_30_percent_rule, actual_expenses
             FROM tax_settings WHERE issuer_id = ?",
        )
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxSettings {
            issuer_id: get(&row, "issuer_id")?,
            use_30_percent_rule: get(&row, "use_30_percent_rule")?,
            actual_expenses: get_decimal(&row, "actual_expenses")?,
        })
    }

    async fn save_tax_settings(
        &self,
        settings: &TaxSettings,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_settings (issuer_id, use_30_percent_rule, actual_expenses)
             VALUES (?, ?, ?)
             ON CONFLICT(issuer_id) DO UPDATE SET
                use_30_percent_rule = excluded.use_30_percent_rule,
                actual_expenses = excluded.actual_expenses",
        )
        .bind(settings.issuer_id)
        .bind(settings.use_30_percent_rule)
        .bind(decimal_to_text(settings.actual_expenses))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn create_client(
        &self,
        client: NewClient,
    ) -> Result<Client, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO client (
                company_name, company_code, pvm_code, address, first_name, last_name, phone
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&client.company_name)
        .bind(&client.company_code)
        .bind(&client.pvm_code)
        .bind(&client.address)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.phone)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err(e, &format!("client with code {}", client.company_code)))?;

        self.get_client(result.last_insert_rowid()).await
    }

    async fn get_client(
        &self,
        id: i64,
    ) -> Result<Client, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM client WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_client(&row)
    }

    async fn get_client_by_code(
        &self,
        company_code: &str,
    ) -> Result<Client, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE company_code = ?"
        ))
        .bind(company_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_client(&row)
    }

    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client ORDER BY company_name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_client).collect()
    }

    async fn create_invoice(
        &self,
        invoice: NewInvoice,
    ) -> Result<Invoice, RepositoryError> {
        // Reading the last number and inserting the next one share a
        // transaction so two writers cannot allocate the same number.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let invoice_number = match invoice.invoice_number {
            Some(number) => number,
            None => {
                let last: Option<String> = sqlx::query_scalar(
                    "SELECT invoice_number FROM invoice
                     WHERE issuer_id = ? ORDER BY id DESC LIMIT 1",
                )
                .bind(invoice.issuer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
                let next = next_invoice_number(last.as_deref());
                debug!(
                    issuer_id = invoice.issuer_id,
                    number = %next.number,
                    origin = ?next.origin,
                    "Allocated invoice number"
                );
                next.number
            }
        };

        let result = sqlx::query(
            "INSERT INTO invoice (
                series, issuer_id, client_id, date, pay_until, invoice_number,
                total_amount, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice.series.as_str())
        .bind(invoice.issuer_id)
        .bind(invoice.client_id)
        .bind(invoice.date)
        .bind(invoice.pay_until)
        .bind(&invoice_number)
        .bind(decimal_to_text(invoice.total_amount))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| write_err(e, &format!("invoice number {}", invoice_number)))?;

        let id = result.last_insert_rowid();

        for item in &invoice.line_items {
            sqlx::query(
                "INSERT INTO line_item (
                    invoice_id, service_name, quantity, unit, price, total_amount
                ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&item.service_name)
            .bind(decimal_to_text(item.quantity))
            .bind(item.unit.as_str())
            .bind(decimal_to_text(item.price))
            .bind(decimal_to_text(item.total_amount()))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        info!(id, invoice_number = %invoice_number, "Created invoice");

        self.get_invoice(id).await
    }

    async fn get_invoice(
        &self,
        id: i64,
    ) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoice WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        self.with_line_items(row_to_invoice(&row)?).await
    }

    async fn list_invoices(
        &self,
        issuer_id: i64,
        year: Option<i32>,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let rows = match year {
            Some(year) => {
                let (start, end) = year_bounds(year)?;
                sqlx::query(&format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoice
                     WHERE issuer_id = ? AND date >= ? AND date < ?
                     ORDER BY date, id"
                ))
                .bind(issuer_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoice
                     WHERE issuer_id = ?
                     ORDER BY date, id"
                ))
                .bind(issuer_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        let headers = rows
            .iter()
            .map(row_to_invoice)
            .collect::<Result<Vec<_>, _>>()?;
        let mut invoices = Vec::with_capacity(headers.len());
        for invoice in headers {
            invoices.push(self.with_line_items(invoice).await?);
        }
        Ok(invoices)
    }

    async fn last_invoice_number(
        &self,
        issuer_id: i64,
    ) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar(
            "SELECT invoice_number FROM invoice
             WHERE issuer_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_invoices(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<u64, RepositoryError> {
        let (start, end) = year_bounds(year)?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoice
             WHERE issuer_id = ? AND date >= ? AND date < ?",
        )
        .bind(issuer_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        u64::try_from(count)
            .map_err(|e| RepositoryError::Database(format!("Invalid count {}: {}", count, e)))
    }

    async fn income_for_year(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<Decimal, RepositoryError> {
        let rows = self.invoice_rows_for_year(issuer_id, year).await?;

        let mut total = Decimal::ZERO;
        for row in &rows {
            total += get_decimal(row, "total_amount")?;
        }
        Ok(total)
    }

    async fn income_by_month(
        &self,
        issuer_id: i64,
        year: i32,
    ) -> Result<Vec<MonthlyIncomeEntry>, RepositoryError> {
        let rows = self.invoice_rows_for_year(issuer_id, year).await?;

        let mut totals: [Option<Decimal>; 12] = [None; 12];
        for row in &rows {
            let date: NaiveDate = get(row, "date")?;
            let amount = get_decimal(row, "total_amount")?;
            let slot = &mut totals[date.month0() as usize];
            *slot = Some(slot.unwrap_or(Decimal::ZERO) + amount);
        }

        Ok(totals
            .iter()
            .zip(1u32..)
            .filter_map(|(total, month)| {
                total.map(|income| MonthlyIncomeEntry { month, income })
            })
            .collect())
    }
}
