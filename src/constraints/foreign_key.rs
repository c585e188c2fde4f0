use std::cmp::Ordering;
use std::collections::BTreeSet;

use log::debug;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::storage::index::RowId;
use crate::storage::row::{RowData, Value};
use crate::storage::table::Table;

/// Cross-table checks for `REFERENCES` columns. Deletes and key changes on a
/// referenced row are restricted; there is no cascading.
pub struct ForeignKeyConstraint<'a> {
    pub catalog: &'a Catalog,
}

/// A child column pointing at a column of the table being checked.
struct Reference<'a> {
    child: &'a Table,
    child_pos: usize,
    parent_pos: usize,
}

fn holds_value(table: &Table, column: &str, value: &Value) -> bool {
    if let Some(index) = table.index_on(column) {
        return !index.find(value).is_empty();
    }
    let Some(pos) = table.column_index(column) else {
        return false;
    };
    table
        .rows()
        .any(|(_, row)| matches!(row[pos].compare(value), Ok(Some(Ordering::Equal))))
}

impl<'a> ForeignKeyConstraint<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        ForeignKeyConstraint { catalog }
    }

    /// Every non-NULL foreign key value of `row` must exist in the referenced
    /// column. A row may reference itself through a self-referencing key.
    pub fn validate_insert(&self, table: &Table, row: &[Value]) -> DbResult<()> {
        for (pos, col) in table.columns().iter().enumerate() {
            let Some(fk) = &col.references else {
                continue;
            };
            let value = &row[pos];
            if value.is_null() {
                continue;
            }
            if fk.table == table.name() {
                let own = table.column_index(&fk.column).map(|p| &row[p]);
                if matches!(own.map(|v| v.compare(value)), Some(Ok(Some(Ordering::Equal)))) {
                    continue;
                }
            }
            let parent = self.catalog.get_table(&fk.table)?;
            if !holds_value(parent, &fk.column, value) {
                debug!("foreign key {}.{} has no parent {}", table.name(), col.name, value);
                return Err(DbError::ForeignKeyViolation(format!(
                    "{}.{} = {} has no matching row in {}({})",
                    table.name(),
                    col.name,
                    value,
                    fk.table,
                    fk.column
                )));
            }
        }
        Ok(())
    }

    /// Refuse to delete a row whose key is still referenced. Rows inside the
    /// same delete set do not count as references.
    pub fn validate_delete(&self, table: &Table, row_ids: &[RowId]) -> DbResult<()> {
        let deleting: BTreeSet<RowId> = row_ids.iter().copied().collect();
        for reference in self.references_to(table) {
            for &id in row_ids {
                let Some(row) = table.row(id) else {
                    continue;
                };
                let key = &row[reference.parent_pos];
                let skip = |child_id: RowId| reference.child.name() == table.name() && deleting.contains(&child_id);
                if self.find_referencing(&reference, key, skip).is_some() {
                    return Err(self.restricted(table, &reference, key, "delete"));
                }
            }
        }
        Ok(())
    }

    /// Refuse to change a referenced key while child rows still point at the
    /// old value.
    pub fn validate_key_change(&self, table: &Table, changes: &[(RowId, RowData)]) -> DbResult<()> {
        for reference in self.references_to(table) {
            for (id, new_row) in changes {
                let Some(old_row) = table.row(*id) else {
                    continue;
                };
                let old = &old_row[reference.parent_pos];
                let new = &new_row[reference.parent_pos];
                if old.is_null() || old.total_cmp(new) == Ordering::Equal {
                    continue;
                }
                let skip = |child_id: RowId| reference.child.name() == table.name() && child_id == *id;
                if self.find_referencing(&reference, old, skip).is_some() {
                    return Err(self.restricted(table, &reference, old, "update"));
                }
            }
        }
        Ok(())
    }

    fn references_to(&self, parent: &Table) -> Vec<Reference<'a>> {
        let mut found = Vec::new();
        for child in self.catalog.tables() {
            for (child_pos, col) in child.columns().iter().enumerate() {
                let Some(fk) = &col.references else {
                    continue;
                };
                if fk.table != parent.name() {
                    continue;
                }
                if let Some(parent_pos) = parent.column_index(&fk.column) {
                    found.push(Reference { child, child_pos, parent_pos });
                }
            }
        }
        found
    }

    fn find_referencing<F>(&self, reference: &Reference<'_>, key: &Value, skip: F) -> Option<RowId>
    where
        F: Fn(RowId) -> bool,
    {
        if key.is_null() {
            return None;
        }
        reference.child.rows().find_map(|(id, row)| {
            let hit = matches!(row[reference.child_pos].compare(key), Ok(Some(Ordering::Equal)));
            (hit && !skip(id)).then_some(id)
        })
    }

    fn restricted(&self, parent: &Table, reference: &Reference<'_>, key: &Value, action: &str) -> DbError {
        DbError::ForeignKeyViolation(format!(
            "cannot {} {}.{} = {}: still referenced by {}.{}",
            action,
            parent.name(),
            parent.columns()[reference.parent_pos].name,
            key,
            reference.child.name(),
            reference.child.columns()[reference.child_pos].name
        ))
    }
}
