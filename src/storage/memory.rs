use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::{LedgerError, Repository};
use crate::domain::{
    Account, AccountBalance, AccountEntry, AccountEntryList, AccountEntryRequest, Cursor,
    GroupBalance, Metadata, Operation, SyntheticReport, Transaction, Version,
};

#[derive(Debug, Clone)]
struct StoredEntry {
    id: Uuid,
    version: u64,
    operation: Operation,
    amount: i64,
    event: i32,
    competence_date: DateTime<Utc>,
    metadata: Option<Metadata>,
}

impl StoredEntry {
    fn signed_amount(&self) -> i64 {
        match self.operation {
            Operation::Credit => self.amount,
            Operation::Debit => -self.amount,
        }
    }

    fn to_account_entry(&self) -> AccountEntry {
        AccountEntry {
            id: self.id,
            version: self.version,
            operation: self.operation,
            amount: self.amount,
            event: self.event,
            competence_date: self.competence_date,
            metadata: self.metadata.clone(),
        }
    }
}

/// In-memory repository with the same semantics as the SQLite adapter.
/// Entries per account are kept in version order, so an account's current
/// version is simply the length of its entry list.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    accounts: RwLock<HashMap<Account, Vec<StoredEntry>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryRepository {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);

        // Check every precondition before touching anything, so a conflict
        // anywhere leaves no partial posting behind.
        let mut tips: HashMap<&Account, u64> = HashMap::new();
        for entry in transaction.entries() {
            let current = match tips.get(&entry.account) {
                Some(version) => *version,
                None => accounts
                    .get(&entry.account)
                    .map(|entries| entries.len() as u64)
                    .unwrap_or(0),
            };

            if let Version::Explicit(expected) = entry.version {
                if expected != current {
                    return Err(LedgerError::VersionConflict {
                        account: entry.account.value().to_owned(),
                        expected,
                        current,
                    });
                }
            }

            tips.insert(&entry.account, current + 1);
        }

        for entry in transaction.entries() {
            let entries = accounts.entry(entry.account.clone()).or_default();
            entries.push(StoredEntry {
                id: entry.id,
                version: entries.len() as u64 + 1,
                operation: entry.operation,
                amount: entry.amount,
                event: entry.event,
                competence_date: entry.competence_date,
                metadata: entry.metadata.clone(),
            });
        }

        Ok(())
    }

    async fn analytic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);

        let entries = accounts
            .get(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.value().to_owned()))?;

        let balance = entries.iter().map(StoredEntry::signed_amount).sum();
        Ok(AccountBalance::analytic(
            account.clone(),
            entries.len() as u64,
            balance,
        ))
    }

    async fn synthetic_account_balance(
        &self,
        account: &Account,
    ) -> Result<AccountBalance, LedgerError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);

        let balance = accounts
            .iter()
            .filter(|(candidate, _)| account.matches(candidate))
            .flat_map(|(_, entries)| entries.iter())
            .map(StoredEntry::signed_amount)
            .sum();

        Ok(AccountBalance::synthetic(account.clone(), balance))
    }

    async fn synthetic_report(
        &self,
        account: &Account,
        group_depth: usize,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<SyntheticReport, LedgerError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);

        let mut groups: BTreeMap<String, GroupBalance> = BTreeMap::new();

        for (candidate, entries) in accounts.iter() {
            if !account.matches(candidate) {
                continue;
            }

            let prefix = candidate.prefix(group_depth);
            for entry in entries {
                if entry.competence_date < start_date || entry.competence_date > end_date {
                    continue;
                }

                let group = groups.entry(prefix.clone()).or_insert_with(|| GroupBalance {
                    account: prefix.clone(),
                    credit: 0,
                    debit: 0,
                });
                match entry.operation {
                    Operation::Credit => group.credit += entry.amount,
                    Operation::Debit => group.debit += entry.amount,
                }
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
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);

        let after = request
            .page
            .cursor()
            .map(|cursor| cursor.version())
            .unwrap_or(0);
        let size = request.page.size();

        let mut entries: Vec<AccountEntry> = accounts
            .get(&request.account)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.version > after)
                    .filter(|entry| {
                        entry.competence_date >= request.start_date
                            && entry.competence_date <= request.end_date
                    })
                    .take(size + 1)
                    .map(StoredEntry::to_account_entry)
                    .collect()
            })
            .unwrap_or_default();

        let next_page = if entries.len() > size {
            entries.truncate(size);
            entries.last().map(|entry| Cursor::new(entry.version))
        } else {
            None
        };

        Ok(AccountEntryList { entries, next_page })
    }
}
