pub mod foreign_key;
pub mod not_null;
pub mod primary_key;

use crate::error::DbResult;
use crate::storage::row::Value;
use crate::storage::table::Table;

pub use foreign_key::ForeignKeyConstraint;
pub use not_null::NotNullConstraint;
pub use primary_key::PrimaryKeyConstraint;

/// A check that needs nothing beyond the table and the candidate row.
pub trait Constraint {
    fn validate_insert(&self, table: &Table, row: &[Value]) -> DbResult<()>;
}

/// Row-local constraints in evaluation order: primary key nullness first,
/// then NOT NULL.
pub fn local_constraints() -> [&'static dyn Constraint; 2] {
    [&PrimaryKeyConstraint, &NotNullConstraint]
}
