pub mod eval;
pub mod result;
pub mod runtime;
pub mod select;

pub use result::{QueryResult, ResultSet};
pub use runtime::handle_statement;
