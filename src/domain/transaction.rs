use thiserror::Error;
use uuid::Uuid;

use super::{AccountType, Entry, Operation};

/// Minimum number of entries in a transaction.
pub const MIN_ENTRIES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("a transaction needs at least {MIN_ENTRIES} entries, got {0}")]
    TooFewEntries(usize),
    #[error("cannot post to synthetic account {0}")]
    SyntheticAccount(String),
    #[error("entry amounts must not be negative")]
    NegativeAmount,
    #[error("transaction does not balance: debits {debits}, credits {credits}")]
    Unbalanced { debits: i128, credits: i128 },
}

/// A balanced batch of entries posted atomically. All entries share the
/// transaction id for audit purposes.
///
/// The invariants are enforced at construction: at least [`MIN_ENTRIES`]
/// entries, every account analytic, no negative amount, and the debit and
/// credit sides summing equally.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Transaction {
    id: Uuid,
    entries: Vec<Entry>,
}

impl Transaction {
    pub fn new(entries: Vec<Entry>) -> Result<Self, TransactionError> {
        if entries.len() < MIN_ENTRIES {
            return Err(TransactionError::TooFewEntries(entries.len()));
        }

        let mut debits: i128 = 0;
        let mut credits: i128 = 0;

        for entry in &entries {
            if entry.account.account_type() == AccountType::Synthetic {
                return Err(TransactionError::SyntheticAccount(
                    entry.account.value().to_owned(),
                ));
            }
            if entry.amount < 0 {
                return Err(TransactionError::NegativeAmount);
            }
            match entry.operation {
                Operation::Debit => debits += entry.amount as i128,
                Operation::Credit => credits += entry.amount as i128,
            }
        }

        if debits != credits {
            return Err(TransactionError::Unbalanced { debits, credits });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            entries,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
