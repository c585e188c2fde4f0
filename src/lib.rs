pub mod catalog;
pub mod constraints;
pub mod display;
pub mod engine;
pub mod error;
pub mod execution;
pub mod planner;
pub mod sql;
pub mod storage;

pub use engine::Database;
pub use error::{DbError, DbResult, ErrorKind};
pub use execution::{QueryResult, ResultSet};
