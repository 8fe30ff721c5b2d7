use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountBalance, AccountEntryList, AccountEntryRequest, SyntheticReport, Transaction,
};

use super::LedgerError;

/// Storage port of the ledger. The use case depends only on this contract;
/// adapters decide how entries are persisted and how versions are assigned.
///
/// Implementations must keep [`create_transaction`](Repository::create_transaction)
/// atomic: either every entry of the transaction commits or none does, and a
/// failed explicit-version precondition surfaces as
/// [`LedgerError::VersionConflict`] with nothing persisted.
#[allow(async_fn_in_trait)]
pub trait Repository {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError>;

    /// Signed sum of the entries of one analytic account, plus its current
    /// version. Unknown accounts are an error, not a zero balance.
    async fn analytic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError>;

    /// Aggregate signed sum over every analytic account matching the
    /// synthetic pattern. No matches is a valid zero aggregate.
    async fn synthetic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError>;

    /// Aggregate restricted to `[start_date, end_date]` by competence date,
    /// grouped by path prefix at `group_depth` labels.
    async fn synthetic_report(
        &self,
        account: &Account,
        group_depth: usize,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<SyntheticReport, LedgerError>;

    async fn list_account_entries(
        &self,
        request: &AccountEntryRequest,
    ) -> Result<AccountEntryList, LedgerError>;
}
