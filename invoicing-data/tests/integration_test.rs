//! Integration tests for invoice import using the SQLite backend.

use chrono::NaiveDate;
use invoicing_core::{InvoiceRepository, InvoiceSeries, MonthlyIncomeEntry, NewClient};
use invoicing_data::{InvoiceLoader, InvoiceLoaderError, LoadSummary};
use invoicing_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_CSV_2025: &str = include_str!("../test-data/invoices_2025.csv");

const ISSUER: i64 = 1;

/// Migrated database with no clients.
async fn setup_test_db_without_clients() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

async fn setup_test_db() -> SqliteRepository {
    let repo = setup_test_db_without_clients().await;

    for code in ["300000001", "300000002"] {
        repo.create_client(NewClient {
            company_name: format!("UAB {code}"),
            company_code: code.to_string(),
            pvm_code: None,
            address: "Vilniaus g. 10, Vilnius".to_string(),
            first_name: "Rūta".to_string(),
            last_name: "Rutkauskienė".to_string(),
            phone: "+37062222222".to_string(),
        })
        .await
        .expect("Failed to create client");
    }

    repo
}

#[tokio::test]
async fn test_load_all_2025_invoices() {
    let repo = setup_test_db().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");

    let summary = InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("Failed to load invoices");

    assert_eq!(
        summary,
        LoadSummary {
            inserted: 5,
            skipped: 0,
        }
    );
    assert_eq!(repo.count_invoices(ISSUER, 2025).await, Ok(5));
}

#[tokio::test]
async fn test_loaded_invoices_feed_yearly_and_monthly_income() {
    let repo = setup_test_db().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");
    InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("Failed to load invoices");

    assert_eq!(repo.income_for_year(ISSUER, 2025).await, Ok(dec!(7600.00)));
    assert_eq!(
        repo.income_by_month(ISSUER, 2025).await.unwrap(),
        vec![
            MonthlyIncomeEntry {
                month: 1,
                income: dec!(600.00),
            },
            MonthlyIncomeEntry {
                month: 2,
                income: dec!(450.00),
            },
            MonthlyIncomeEntry {
                month: 3,
                income: dec!(1550.00),
            },
            MonthlyIncomeEntry {
                month: 7,
                income: dec!(5000.00),
            },
        ]
    );
}

#[tokio::test]
async fn test_uploaded_invoice_dates_and_series() {
    let repo = setup_test_db().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");
    InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("Failed to load invoices");

    let invoices = repo.list_invoices(ISSUER, Some(2025)).await.unwrap();
    let vsp = invoices
        .iter()
        .find(|inv| inv.invoice_number == "00000003")
        .expect("Should find VSP invoice");

    assert_eq!(vsp.series, InvoiceSeries::Vsp);
    assert_eq!(vsp.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!(vsp.pay_until, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    assert_eq!(vsp.total_amount, dec!(1200.00));
    assert!(vsp.line_items.is_empty());
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let repo = setup_test_db().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");

    InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("First load failed");
    let second = InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("Second load failed");

    assert_eq!(
        second,
        LoadSummary {
            inserted: 0,
            skipped: 5,
        }
    );
    assert_eq!(repo.income_for_year(ISSUER, 2025).await, Ok(dec!(7600.00)));
}

#[tokio::test]
async fn test_next_number_continues_after_import() {
    let repo = setup_test_db().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");
    InvoiceLoader::load(&repo, ISSUER, &records)
        .await
        .expect("Failed to load invoices");

    let last = repo.last_invoice_number(ISSUER).await.unwrap();

    assert_eq!(last.as_deref(), Some("00000005"));
    assert_eq!(
        invoicing_core::numbering::next_invoice_number(last.as_deref()).number,
        "00000006"
    );
}

#[tokio::test]
async fn test_load_fails_when_client_is_missing() {
    let repo = setup_test_db_without_clients().await;
    let records = InvoiceLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");

    let result = InvoiceLoader::load(&repo, ISSUER, &records).await;

    assert!(
        matches!(result, Err(InvoiceLoaderError::ClientNotFound(ref code)) if code == "300000001"),
        "Expected ClientNotFound, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_invalid_row_writes_nothing() {
    let repo = setup_test_db().await;
    let csv = "client_code,invoice_number,month,total_amount\n\
               300000001,00000001,2025-01,100.00\n\
               300000001,00000002,2025-13,100.00";
    let records = InvoiceLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = InvoiceLoader::load(&repo, ISSUER, &records).await;

    assert!(matches!(result, Err(InvoiceLoaderError::InvalidMonth(ref m)) if m == "2025-13"));
    assert_eq!(repo.count_invoices(ISSUER, 2025).await, Ok(0));
}
