use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Account, Cursor, Page};

/// Optional key/value annotations carried by an entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Which side of the double entry a movement sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Decreases the account balance.
    Debit,
    /// Increases the account balance.
    Credit,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Debit => "debit",
            Operation::Credit => "credit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(Operation::Debit),
            "credit" => Some(Operation::Credit),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Version requested for an entry at posting time.
///
/// Versions are per-account, sequential from 1, and assigned by the
/// repository. `Explicit(n)` makes the write conditional: the whole
/// transaction fails with a version conflict unless the account's current
/// version is exactly `n`, and the stored entry then gets `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    /// Append at the account's current tip, no precondition.
    Next,
    /// Conditional write against the given prior version.
    Explicit(u64),
}

/// One debit or credit movement to be posted against an analytic account.
/// Entries are append-only; once persisted they are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: Uuid,
    pub account: Account,
    pub version: Version,
    /// Amount in minor currency units, never negative.
    pub amount: i64,
    pub operation: Operation,
    /// Business event code (what kind of movement this is).
    pub event: i32,
    /// When the movement takes effect, as opposed to when it was recorded.
    pub competence_date: DateTime<Utc>,
    pub metadata: Option<Metadata>,
}

impl Entry {
    pub fn new(
        account: Account,
        operation: Operation,
        amount: i64,
        event: i32,
        competence_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account,
            version: Version::Next,
            amount,
            operation,
            event,
            competence_date,
            metadata: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A persisted entry as returned by history queries. The version here is
/// the concrete sequence number the repository assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub id: Uuid,
    pub version: u64,
    pub operation: Operation,
    pub amount: i64,
    pub event: i32,
    pub competence_date: DateTime<Utc>,
    pub metadata: Option<Metadata>,
}

impl AccountEntry {
    /// Signed effect of this entry on a balance.
    pub fn signed_amount(&self) -> i64 {
        match self.operation {
            Operation::Credit => self.amount,
            Operation::Debit => -self.amount,
        }
    }
}

/// Query for a page of an account's entries within a competence date range.
#[derive(Debug, Clone)]
pub struct AccountEntryRequest {
    pub account: Account,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub page: Page,
}

/// One page of entries, ordered by version ascending. `next_page` is set
/// only when more entries exist beyond this page.
#[derive(Debug, Clone, Default)]
pub struct AccountEntryList {
    pub entries: Vec<AccountEntry>,
    pub next_page: Option<Cursor>,
}
