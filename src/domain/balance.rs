use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Account;

/// Derived balance of an account: never stored, always recomputed from the
/// entries. For an analytic account this is the signed sum of its own
/// entries plus its current version; for a synthetic account it is the
/// aggregate over every matching analytic account, and there is no version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    account: Account,
    balance: i64,
    version: Option<u64>,
}

impl AccountBalance {
    pub fn analytic(account: Account, version: u64, balance: i64) -> Self {
        Self {
            account,
            balance,
            version: Some(version),
        }
    }

    pub fn synthetic(account: Account, balance: i64) -> Self {
        Self {
            account,
            balance,
            version: None,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }
}

/// Credit/debit totals for one group of accounts sharing a truncated path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupBalance {
    /// The truncated account path identifying the group.
    pub account: String,
    pub credit: i64,
    pub debit: i64,
}

impl GroupBalance {
    pub fn balance(&self) -> i64 {
        self.credit - self.debit
    }
}

/// Breakdown of a synthetic account's aggregate over a closed competence
/// date range, one group per distinct path prefix at the requested depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticReport {
    pub account: Account,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub groups: Vec<GroupBalance>,
}

impl SyntheticReport {
    pub fn total_credit(&self) -> i64 {
        self.groups.iter().map(|group| group.credit).sum()
    }

    pub fn total_debit(&self) -> i64 {
        self.groups.iter().map(|group| group.debit).sum()
    }

    pub fn balance(&self) -> i64 {
        self.total_credit() - self.total_debit()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn group_balance_is_credit_minus_debit() {
        let group = GroupBalance {
            account: "asset.clients".to_owned(),
            credit: 500,
            debit: 120,
        };
        assert_eq!(group.balance(), 380);
    }

    #[test]
    fn report_totals_sum_over_groups() {
        let report = SyntheticReport {
            account: Account::new("asset.*").unwrap(),
            start_date: Utc::now(),
            end_date: Utc::now(),
            groups: vec![
                GroupBalance {
                    account: "asset.clients".to_owned(),
                    credit: 500,
                    debit: 120,
                },
                GroupBalance {
                    account: "asset.treasury".to_owned(),
                    credit: 100,
                    debit: 300,
                },
            ],
        };

        assert_eq!(report.total_credit(), 600);
        assert_eq!(report.total_debit(), 420);
        assert_eq!(report.balance(), 180);
    }

    #[test]
    fn synthetic_balances_carry_no_version() {
        let balance = AccountBalance::synthetic(Account::new("asset.*").unwrap(), 42);
        assert_eq!(balance.version(), None);

        let balance = AccountBalance::analytic(
            Account::new_analytic("asset.account.treasury").unwrap(),
            3,
            42,
        );
        assert_eq!(balance.version(), Some(3));
    }
}
