pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;

pub use application::{LedgerError, LedgerService, Repository};
pub use domain::*;
pub use storage::{InMemoryRepository, SqliteRepository};
