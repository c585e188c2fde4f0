use super::Constraint;
use crate::error::{DbError, DbResult};
use crate::storage::row::Value;
use crate::storage::table::Table;

/// Rejects a NULL primary key. Duplicate keys are left to the table's
/// unique index.
pub struct PrimaryKeyConstraint;

impl Constraint for PrimaryKeyConstraint {
    fn validate_insert(&self, table: &Table, row: &[Value]) -> DbResult<()> {
        let Some(pos) = table.columns().iter().position(|c| c.primary_key) else {
            return Ok(());
        };
        match row.get(pos) {
            Some(Value::Null) => Err(DbError::NullPrimaryKey(table.columns()[pos].name.clone())),
            _ => Ok(()),
        }
    }
}
