use serde::Serialize;
use thiserror::Error;

/// Maximum size of a single label, in characters.
pub const MAX_LABEL_LEN: usize = 255;

/// Maximum number of labels in one account path.
pub const MAX_LABELS: usize = 65_535;

/// The fixed set of business classes a path may start with.
pub const CLASSES: [&str; 7] = [
    "asset",
    "conciliate_credit",
    "conciliate_debit",
    "equity",
    "expense",
    "liability",
    "revenue",
];

/// Whether an account names one concrete ledger line or a group of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Fully qualified, wildcard-free path: a single postable account.
    Analytic,
    /// Wildcard path naming a group of analytic accounts, query-only.
    Synthetic,
}

/// A validated account path.
///
/// The value is composed of dot-separated labels of `[a-z0-9_]` characters
/// (uppercase input is folded to lowercase). A label cannot be empty, so
/// `foo.`, `.foo` and `foo..bar` are all invalid. Each label holds at most
/// 255 characters and a path at most 65 535 labels.
///
/// The first label is the account's class and must be one of [`CLASSES`],
/// unless it contains a `*` wildcard. A wildcard may appear at most once per
/// label and turns the account [`Synthetic`](AccountType::Synthetic); a
/// wildcard-free account must have at least three labels.
///
/// Some examples:
///  - `asset.account.treasury`
///  - `liability.available.96a131a8_c4ac_495e_8971_fcecdbdd003a`
///  - `liability.clients.available.96a131a8.detail1.detail2`
///  - `asset.*.treasury`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Account {
    account_type: AccountType,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("account path is empty")]
    Empty,
    #[error("invalid character {0:?} in account path")]
    InvalidCharacter(char),
    #[error("wildcard not allowed in an analytic account path")]
    WildcardNotAllowed,
    #[error("account label is empty or longer than {MAX_LABEL_LEN} characters")]
    InvalidLabelLength,
    #[error("unknown account class {0:?}")]
    UnknownClass(String),
    #[error("account path exceeds {MAX_LABELS} labels")]
    TooManyLabels,
    #[error("malformed account path")]
    InvalidStructure,
}

/// Running state of the single left-to-right validation scan.
struct Scan {
    /// Completed labels so far.
    labels: usize,
    /// Length of the label currently being read, in characters.
    label_len: usize,
    /// Byte offset where the current label starts.
    label_start: usize,
    strategy: AccountType,
    needs_fold: bool,
    label_has_wildcard: bool,
}

impl Scan {
    fn new() -> Self {
        Self {
            labels: 0,
            label_len: 0,
            label_start: 0,
            strategy: AccountType::Analytic,
            needs_fold: false,
            label_has_wildcard: false,
        }
    }

    /// Validates the label ending at byte offset `end` and resets the
    /// per-label counters. Used at every dot and once more after the scan
    /// for the final, unterminated label.
    fn close_label(&mut self, input: &str, end: usize) -> Result<(), AccountError> {
        if self.label_len == 0 || self.label_len > MAX_LABEL_LEN {
            return Err(AccountError::InvalidLabelLength);
        }

        if self.labels == 0 && !self.label_has_wildcard {
            // The first label is the class. Folding happens at the end of
            // the scan, so compare ignoring case here.
            let class = &input[self.label_start..end];
            if !CLASSES.iter().any(|known| class.eq_ignore_ascii_case(known)) {
                return Err(AccountError::UnknownClass(class.to_ascii_lowercase()));
            }
        } else if self.labels >= MAX_LABELS {
            return Err(AccountError::TooManyLabels);
        }

        self.labels += 1;
        self.label_len = 0;
        self.label_start = end + 1;
        self.label_has_wildcard = false;

        Ok(())
    }

    fn accept_wildcard(&mut self) -> Result<(), AccountError> {
        // Only one wildcard per label.
        if self.label_has_wildcard {
            return Err(AccountError::InvalidStructure);
        }

        self.strategy = AccountType::Synthetic;
        self.label_len += 1;
        self.label_has_wildcard = true;

        Ok(())
    }
}

impl Account {
    /// Parses and validates an account path. Wildcards are allowed and make
    /// the account [`Synthetic`](AccountType::Synthetic).
    pub fn new(input: &str) -> Result<Self, AccountError> {
        Self::parse(input, false)
    }

    /// Parses and validates an account path, rejecting any wildcard.
    pub fn new_analytic(input: &str) -> Result<Self, AccountError> {
        Self::parse(input, true)
    }

    fn parse(input: &str, analytic_only: bool) -> Result<Self, AccountError> {
        if input.is_empty() {
            return Err(AccountError::Empty);
        }

        let mut scan = Scan::new();

        for (offset, ch) in input.char_indices() {
            match ch {
                'a'..='z' | '0'..='9' | '_' => scan.label_len += 1,
                'A'..='Z' => {
                    scan.label_len += 1;
                    scan.needs_fold = true;
                }
                '.' => scan.close_label(input, offset)?,
                '*' => {
                    if analytic_only {
                        return Err(AccountError::WildcardNotAllowed);
                    }
                    scan.accept_wildcard()?;
                }
                other => return Err(AccountError::InvalidCharacter(other)),
            }
        }

        // The final label gets the same validation as a dot boundary; a
        // trailing dot shows up here as an empty label.
        scan.close_label(input, input.len())?;

        if scan.labels < 3 && scan.strategy != AccountType::Synthetic {
            // Analytic accounts are fully qualified leaves.
            return Err(AccountError::InvalidStructure);
        }

        let value = if scan.needs_fold {
            input.to_ascii_lowercase()
        } else {
            input.to_owned()
        };

        Ok(Self {
            account_type: scan.strategy,
            value,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// The dot-separated labels of the path, in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.value.split('.')
    }

    /// Path truncated to its first `depth` labels.
    pub fn prefix(&self, depth: usize) -> String {
        self.labels().take(depth).collect::<Vec<_>>().join(".")
    }

    /// Whether `candidate`'s path matches this account used as a pattern.
    ///
    /// Each pattern label must match the candidate label at the same
    /// position; `*` consumes exactly one label, and a star embedded in a
    /// label (`cost*`) matches by prefix/suffix. The pattern may be a proper
    /// prefix of a deeper path, so `asset.*.treasury` matches both
    /// `asset.main.treasury` and `asset.main.treasury.detail`.
    pub fn matches(&self, candidate: &Account) -> bool {
        let pattern: Vec<&str> = self.labels().collect();
        let labels: Vec<&str> = candidate.labels().collect();

        if labels.len() < pattern.len() {
            return false;
        }

        pattern
            .iter()
            .zip(&labels)
            .all(|(pattern, label)| label_matches(pattern, label))
    }
}

fn label_matches(pattern: &str, label: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == label,
        Some((prefix, suffix)) => {
            label.len() >= prefix.len() + suffix.len()
                && label.starts_with(prefix)
                && label.ends_with(suffix)
        }
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
