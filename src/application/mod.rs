pub mod error;
pub mod instrument;
pub mod repository;
pub mod service;

pub use error::*;
pub use instrument::*;
pub use repository::*;
pub use service::*;
