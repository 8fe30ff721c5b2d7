// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use partita::application::{LedgerService, NoopInstrumentor};
use partita::domain::{Account, Entry, Operation};
use partita::storage::SqliteRepository;
use tempfile::TempDir;

pub type TestService = LedgerService<SqliteRepository, NoopInstrumentor>;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TestService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());
    let repository = SqliteRepository::init(&url).await?;
    Ok((LedgerService::new(repository, NoopInstrumentor), temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn debit(account: &str, amount: i64, date: DateTime<Utc>) -> Entry {
    Entry::new(
        Account::new_analytic(account).unwrap(),
        Operation::Debit,
        amount,
        1,
        date,
    )
}

pub fn credit(account: &str, amount: i64, date: DateTime<Utc>) -> Entry {
    Entry::new(
        Account::new_analytic(account).unwrap(),
        Operation::Credit,
        amount,
        1,
        date,
    )
}

/// Post a balanced two-entry movement: debit one account, credit another.
pub async fn post_movement(
    service: &TestService,
    debit_account: &str,
    credit_account: &str,
    amount: i64,
    date: DateTime<Utc>,
) -> Result<()> {
    service
        .create_transaction(vec![
            debit(debit_account, amount, date),
            credit(credit_account, amount, date),
        ])
        .await?;
    Ok(())
}
