mod account;
mod balance;
mod entry;
mod pagination;
mod transaction;

pub use account::*;
pub use balance::*;
pub use entry::*;
pub use pagination::*;
pub use transaction::*;
