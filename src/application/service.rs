use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountBalance, AccountEntryList, AccountEntryRequest, AccountType, Entry,
    SyntheticReport, Transaction,
};

use super::{Instrumentor, LedgerError, Repository};

/// The ledger use case: transaction posting, balance computation and entry
/// listing over an abstract repository. This is the primary interface for
/// any client (CLI, API, tests).
///
/// The service holds no mutable state and no cache; every query re-derives
/// from the repository's current data, so it is safe to share and call
/// concurrently.
pub struct LedgerService<R, I> {
    repository: R,
    instrumentor: I,
}

impl<R, I> LedgerService<R, I>
where
    R: Repository,
    I: Instrumentor,
{
    pub fn new(repository: R, instrumentor: I) -> Self {
        Self {
            repository,
            instrumentor,
        }
    }

    /// Posts a balanced batch of entries atomically and returns the
    /// committed transaction.
    ///
    /// Entries with [`Version::Explicit`](crate::domain::Version::Explicit)
    /// make the posting conditional; a mismatch fails the whole batch with
    /// [`LedgerError::VersionConflict`] and persists nothing.
    pub async fn create_transaction(
        &self,
        entries: Vec<Entry>,
    ) -> Result<Transaction, LedgerError> {
        let _segment = self.instrumentor.segment("create_transaction");

        let transaction = Transaction::new(entries)?;

        {
            let _query =
                self.instrumentor
                    .data_segment("entries", "insert_transaction", "append entries");
            self.repository.create_transaction(&transaction).await?;
        }

        self.instrumentor.log(&format!(
            "transaction {} posted with {} entries",
            transaction.id(),
            transaction.entries().len()
        ));

        Ok(transaction)
    }

    /// Balance of one concrete account: the signed sum of its entries and
    /// its current version. Rejects synthetic input.
    pub async fn analytic_balance(&self, account: &Account) -> Result<AccountBalance, LedgerError> {
        if account.account_type() != AccountType::Analytic {
            return Err(LedgerError::NotAnalytic(account.value().to_owned()));
        }

        let _segment = self.instrumentor.segment("analytic_balance");
        let _query = self
            .instrumentor
            .data_segment("entries", "select_balance", account.value());

        self.repository.analytic_account_balance(account).await
    }

    /// Aggregate balance of every analytic account matching the wildcard
    /// pattern. Rejects analytic input.
    pub async fn synthetic_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError> {
        if account.account_type() != AccountType::Synthetic {
            return Err(LedgerError::NotSynthetic(account.value().to_owned()));
        }

        let _segment = self.instrumentor.segment("synthetic_balance");
        let _query = self
            .instrumentor
            .data_segment("entries", "select_aggregate", account.value());

        self.repository.synthetic_account_balance(account).await
    }

    /// Breaks a synthetic account's aggregate down by path prefix at
    /// `group_depth` labels, over the closed competence date range
    /// `[start_date, end_date]`.
    pub async fn synthetic_report(
        &self,
        account: &Account,
        group_depth: usize,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<SyntheticReport, LedgerError> {
        if account.account_type() != AccountType::Synthetic {
            return Err(LedgerError::NotSynthetic(account.value().to_owned()));
        }
        if group_depth == 0 {
            return Err(LedgerError::InvalidGroupDepth);
        }

        let _segment = self.instrumentor.segment("synthetic_report");
        let _query = self
            .instrumentor
            .data_segment("entries", "select_report", account.value());

        self.repository
            .synthetic_report(account, group_depth, start_date, end_date)
            .await
    }

    /// Lists an analytic account's entries within a competence date range,
    /// ordered by version ascending and bounded by the request's page. The
    /// returned cursor, when present, resumes exactly after the last entry
    /// of this page; an empty list with no cursor is a valid outcome.
    pub async fn list_entries(
        &self,
        request: AccountEntryRequest,
    ) -> Result<AccountEntryList, LedgerError> {
        if request.account.account_type() != AccountType::Analytic {
            return Err(LedgerError::NotAnalytic(request.account.value().to_owned()));
        }

        let _segment = self.instrumentor.segment("list_entries");
        let _query = self
            .instrumentor
            .data_segment("entries", "select_page", request.account.value());

        self.repository.list_account_entries(&request).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::application::NoopInstrumentor;
    use crate::domain::{Operation, Page, TransactionError, Version};
    use crate::storage::InMemoryRepository;

    fn service() -> LedgerService<InMemoryRepository, NoopInstrumentor> {
        LedgerService::new(InMemoryRepository::new(), NoopInstrumentor)
    }

    fn entry(account: &str, operation: Operation, amount: i64) -> Entry {
        Entry::new(
            Account::new_analytic(account).unwrap(),
            operation,
            amount,
            1,
            Utc::now(),
        )
    }

    fn movement(debit: &str, credit: &str, amount: i64) -> Vec<Entry> {
        vec![
            entry(debit, Operation::Debit, amount),
            entry(credit, Operation::Credit, amount),
        ]
    }

    #[tokio::test]
    async fn posts_a_balanced_transaction() {
        let service = service();

        let transaction = service
            .create_transaction(movement(
                "asset.account.treasury",
                "liability.clients.available",
                100,
            ))
            .await
            .unwrap();
        assert_eq!(transaction.entries().len(), 2);

        let account = Account::new_analytic("liability.clients.available").unwrap();
        let balance = service.analytic_balance(&account).await.unwrap();
        assert_eq!(balance.balance(), 100);
        assert_eq!(balance.version(), Some(1));
    }

    #[tokio::test]
    async fn rejects_an_unbalanced_transaction() {
        let service = service();

        let err = service
            .create_transaction(vec![
                entry("asset.account.treasury", Operation::Debit, 100),
                entry("liability.clients.available", Operation::Credit, 40),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Transaction(TransactionError::Unbalanced { .. })
        ));
    }

    #[tokio::test]
    async fn surfaces_version_conflicts_from_the_repository() {
        let service = service();

        service
            .create_transaction(movement(
                "asset.account.treasury",
                "liability.clients.available",
                100,
            ))
            .await
            .unwrap();

        let err = service
            .create_transaction(vec![
                entry("asset.account.treasury", Operation::Debit, 10)
                    .with_version(Version::Explicit(3)),
                entry("liability.clients.available", Operation::Credit, 10),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::VersionConflict {
                expected: 3,
                current: 1,
                ..
            }
        ));

        // The conflicting batch left no partial posting behind.
        let account = Account::new_analytic("liability.clients.available").unwrap();
        assert_eq!(
            service.analytic_balance(&account).await.unwrap().version(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn balance_accessors_check_the_account_type() {
        let service = service();

        let synthetic = Account::new("asset.*").unwrap();
        assert!(matches!(
            service.analytic_balance(&synthetic).await,
            Err(LedgerError::NotAnalytic(_))
        ));

        let analytic = Account::new_analytic("asset.account.treasury").unwrap();
        assert!(matches!(
            service.synthetic_balance(&analytic).await,
            Err(LedgerError::NotSynthetic(_))
        ));
        assert!(matches!(
            service
                .synthetic_report(&analytic, 2, Utc::now(), Utc::now())
                .await,
            Err(LedgerError::NotSynthetic(_))
        ));
    }

    #[tokio::test]
    async fn synthetic_balance_spans_matching_accounts() {
        let service = service();

        service
            .create_transaction(movement(
                "equity.opening.balance",
                "asset.main.treasury",
                70,
            ))
            .await
            .unwrap();
        service
            .create_transaction(movement(
                "equity.opening.balance",
                "asset.reserve.treasury",
                30,
            ))
            .await
            .unwrap();

        let pattern = Account::new("asset.*.treasury").unwrap();
        let aggregate = service.synthetic_balance(&pattern).await.unwrap();
        assert_eq!(aggregate.balance(), 100);
        assert_eq!(aggregate.version(), None);
    }

    #[tokio::test]
    async fn lists_entries_with_cursor_resumption() {
        let service = service();

        for amount in [10, 20, 30] {
            service
                .create_transaction(movement(
                    "equity.opening.balance",
                    "asset.main.treasury",
                    amount,
                ))
                .await
                .unwrap();
        }

        let account = Account::new_analytic("asset.main.treasury").unwrap();
        let request = AccountEntryRequest {
            account: account.clone(),
            start_date: Utc::now() - chrono::Duration::days(1),
            end_date: Utc::now() + chrono::Duration::days(1),
            page: Page::new(2, None).unwrap(),
        };

        let first = service.list_entries(request.clone()).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        let cursor = first.next_page.expect("a second page exists");

        let second = service
            .list_entries(AccountEntryRequest {
                page: Page::new(2, Some(cursor)).unwrap(),
                ..request
            })
            .await
            .unwrap();
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].version, 3);
        assert!(second.next_page.is_none());
    }

    #[tokio::test]
    async fn empty_listing_is_a_valid_result() {
        let service = service();

        let account = Account::new_analytic("asset.never.posted").unwrap();
        let list = service
            .list_entries(AccountEntryRequest {
                account,
                start_date: Utc::now(),
                end_date: Utc::now(),
                page: Page::default(),
            })
            .await
            .unwrap();

        assert!(list.entries.is_empty());
        assert!(list.next_page.is_none());
    }
}
