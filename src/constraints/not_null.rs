use log::debug;

use super::Constraint;
use crate::error::{DbError, DbResult};
use crate::storage::row::Value;
use crate::storage::table::Table;

pub struct NotNullConstraint;

impl Constraint for NotNullConstraint {
    fn validate_insert(&self, table: &Table, row: &[Value]) -> DbResult<()> {
        for (val, col) in row.iter().zip(table.columns()) {
            if col.not_null && val.is_null() {
                debug!("NOT NULL rejected row for {}.{}", table.name(), col.name);
                return Err(DbError::NullViolation(col.name.clone()));
            }
        }
        Ok(())
    }
}
