use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::application::{LedgerError, Repository};
use crate::domain::{
    Account, AccountBalance, AccountEntry, AccountEntryList, AccountEntryRequest, Cursor,
    GroupBalance, Operation, SyntheticReport, Transaction, Version,
};

use super::MIGRATION_001_INITIAL;

/// Production repository backed by SQLite. One row per entry; versions are
/// assigned inside a single SQL transaction so a posting is all-or-nothing.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self, LedgerError> {
        let repository = Self::connect(database_url).await?;
        repository.migrate().await?;
        Ok(repository)
    }
}

impl Repository for SqliteRepository {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        // Tip version per account involved, advanced as entries are written.
        let mut tips: HashMap<String, u64> = HashMap::new();
        let recorded_at = ts(&Utc::now());

        for entry in transaction.entries() {
            let account = entry.account.value();

            let current = match tips.get(account) {
                Some(version) => *version,
                None => {
                    let version: i64 = sqlx::query_scalar(
                        "SELECT COALESCE(MAX(version), 0) FROM entries WHERE account = ?",
                    )
                    .bind(account)
                    .fetch_one(&mut *tx)
                    .await
                    .context("failed to read account version")?;
                    version as u64
                }
            };

            if let Version::Explicit(expected) = entry.version {
                if expected != current {
                    // Dropping the open transaction rolls everything back.
                    return Err(LedgerError::VersionConflict {
                        account: account.to_owned(),
                        expected,
                        current,
                    });
                }
            }

            let next = current + 1;
            tips.insert(account.to_owned(), next);

            let metadata = entry
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("failed to encode entry metadata")?;

            sqlx::query(
                r#"
                INSERT INTO entries
                    (id, transaction_id, account, version, operation, amount,
                     event, competence_date, metadata, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id.to_string())
            .bind(transaction.id().to_string())
            .bind(account)
            .bind(next as i64)
            .bind(entry.operation.as_str())
            .bind(entry.amount)
            .bind(entry.event)
            .bind(ts(&entry.competence_date))
            .bind(metadata)
            .bind(recorded_at.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                // A concurrent writer took this version between our read
                // and the insert; surface it as a retryable conflict.
                if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                    LedgerError::VersionConflict {
                        account: account.to_owned(),
                        expected: current,
                        current: next,
                    }
                } else {
                    LedgerError::Storage(
                        anyhow::Error::new(err).context("failed to insert entry"),
                    )
                }
            })?;
        }

        tx.commit().await.context("failed to commit transaction")?;
        Ok(())
    }

    async fn analytic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS entry_count,
                COALESCE(SUM(CASE WHEN operation = 'credit' THEN amount ELSE -amount END), 0)
                    AS balance,
                COALESCE(MAX(version), 0) AS version
            FROM entries
            WHERE account = ?
            "#,
        )
        .bind(account.value())
        .fetch_one(&self.pool)
        .await
        .context("failed to compute account balance")?;

        let entry_count: i64 = row.get("entry_count");
        if entry_count == 0 {
            return Err(LedgerError::AccountNotFound(account.value().to_owned()));
        }

        let balance: i64 = row.get("balance");
        let version: i64 = row.get("version");
        Ok(AccountBalance::analytic(
            account.clone(),
            version as u64,
            balance,
        ))
    }

    async fn synthetic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT
                account,
                COALESCE(SUM(CASE WHEN operation = 'credit' THEN amount ELSE -amount END), 0)
                    AS balance
            FROM entries
            WHERE account LIKE ?
            GROUP BY account
            "#,
        )
        .bind(like_pattern(account))
        .fetch_all(&self.pool)
        .await
        .context("failed to aggregate account balances")?;

        let mut total: i64 = 0;
        for row in rows {
            let candidate = stored_account(&row)?;
            if account.matches(&candidate) {
                let balance: i64 = row.get("balance");
                total += balance;
            }
        }

        Ok(AccountBalance::synthetic(account.clone(), total))
    }

    async fn synthetic_report(
        &self,
        account: &Account,
        group_depth: usize,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<SyntheticReport, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT account, operation, COALESCE(SUM(amount), 0) AS total
            FROM entries
            WHERE account LIKE ? AND competence_date >= ? AND competence_date <= ?
            GROUP BY account, operation
            "#,
        )
        .bind(like_pattern(account))
        .bind(ts(&start_date))
        .bind(ts(&end_date))
        .fetch_all(&self.pool)
        .await
        .context("failed to aggregate report balances")?;

        // BTreeMap keeps groups in path order.
        let mut groups: std::collections::BTreeMap<String, GroupBalance> =
            std::collections::BTreeMap::new();

        for row in rows {
            let candidate = stored_account(&row)?;
            if !account.matches(&candidate) {
                continue;
            }

            let operation = stored_operation(&row)?;
            let total: i64 = row.get("total");
            let prefix = candidate.prefix(group_depth);

            let group = groups.entry(prefix.clone()).or_insert(GroupBalance {
                account: prefix,
                credit: 0,
                debit: 0,
            });
            match operation {
                Operation::Credit => group.credit += total,
                Operation::Debit => group.debit += total,
            }
        }

        Ok(SyntheticReport {
            account: account.clone(),
            start_date,
            end_date,
            groups: groups.into_values().collect(),
        })
    }

    async fn list_account_entries(
        &self,
        request: &AccountEntryRequest,
    ) -> Result<AccountEntryList, LedgerError> {
        let after = request
            .page
            .cursor()
            .map(|cursor| cursor.version())
            .unwrap_or(0);
        let size = request.page.size();

        // Fetch one extra row to learn whether another page exists.
        let rows = sqlx::query(
            r#"
            SELECT id, version, operation, amount, event, competence_date, metadata
            FROM entries
            WHERE account = ?
              AND competence_date >= ? AND competence_date <= ?
              AND version > ?
            ORDER BY version ASC
            LIMIT ?
            "#,
        )
        .bind(request.account.value())
        .bind(ts(&request.start_date))
        .bind(ts(&request.end_date))
        .bind(after as i64)
        .bind((size + 1) as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to list account entries")?;

        let mut entries = rows
            .iter()
            .map(row_to_account_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let next_page = if entries.len() > size {
            entries.truncate(size);
            entries.last().map(|entry| Cursor::new(entry.version))
        } else {
            None
        };

        Ok(AccountEntryList { entries, next_page })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so that string comparison
/// in SQL agrees with chronological order.
fn ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Coarse SQL narrowing for a wildcard pattern: everything under the
/// pattern's literal leading labels. Exact matching happens in Rust via
/// [`Account::matches`].
fn like_pattern(account: &Account) -> String {
    let literal: Vec<&str> = account
        .labels()
        .take_while(|label| !label.contains('*'))
        .collect();
    if literal.is_empty() {
        "%".to_owned()
    } else {
        format!("{}.%", literal.join("."))
    }
}

fn stored_account(row: &SqliteRow) -> Result<Account, LedgerError> {
    let value: String = row.get("account");
    Account::new_analytic(&value)
        .map_err(|err| anyhow::anyhow!("corrupt account path {value:?} in storage: {err}").into())
}

fn stored_operation(row: &SqliteRow) -> Result<Operation, LedgerError> {
    let value: String = row.get("operation");
    Operation::from_str(&value)
        .ok_or_else(|| anyhow::anyhow!("unknown operation {value:?} in storage").into())
}

fn row_to_account_entry(row: &SqliteRow) -> Result<AccountEntry, LedgerError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id).context("failed to parse entry id")?;

    let version: i64 = row.get("version");
    let operation = stored_operation(row)?;

    let competence_date: String = row.get("competence_date");
    let competence_date = DateTime::parse_from_rfc3339(&competence_date)
        .context("failed to parse competence date")?
        .with_timezone(&Utc);

    let metadata = match row.get::<Option<String>, _>("metadata") {
        Some(raw) => {
            Some(serde_json::from_str(&raw).context("failed to decode entry metadata")?)
        }
        None => None,
    };

    Ok(AccountEntry {
        id,
        version: version as u64,
        operation,
        amount: row.get("amount"),
        event: row.get("event"),
        competence_date,
        metadata,
    })
}
