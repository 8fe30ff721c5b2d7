use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("malformed cursor token")]
    InvalidCursor,
    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    InvalidSize(usize),
}

/// Position inside an account's entry sequence: the version of the last
/// entry already seen. Listing resumes strictly after it.
///
/// The token form is opaque to callers but fixed-width, so tokens sort in
/// the same order as the positions they encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor(u64);

impl Cursor {
    pub fn new(version: u64) -> Self {
        Self(version)
    }

    pub fn version(&self) -> u64 {
        self.0
    }

    pub fn encode(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn decode(token: &str) -> Result<Self, PageError> {
        if token.len() != 16 {
            return Err(PageError::InvalidCursor);
        }
        u64::from_str_radix(token, 16)
            .map(Cursor)
            .map_err(|_| PageError::InvalidCursor)
    }
}

/// A bounded window over an entry listing: how many entries, starting where.
/// No cursor means "from the beginning".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    size: usize,
    cursor: Option<Cursor>,
}

impl Page {
    pub fn new(size: usize, cursor: Option<Cursor>) -> Result<Self, PageError> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(PageError::InvalidSize(size));
        }
        Ok(Self { size, cursor })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}
