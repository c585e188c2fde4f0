use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::constraints::ForeignKeyConstraint;
use crate::error::{DbError, DbResult};
use crate::storage::index::{Index, RowId};
use crate::storage::row::{RowData, Value};
use crate::storage::table::{ColumnDef, Table};

/// All user tables of one database, keyed by name.
///
/// Every mutation that can touch more than one table (foreign keys, index
/// names) goes through here so that cross-table checks see a consistent view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tables: BTreeMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { tables: BTreeMap::new() }
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get_table(&self, name: &str) -> DbResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> DbResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.tables.values()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::TableExists(name.to_string()));
        }
        let table = Table::new(name, columns)?;
        for col in table.columns() {
            self.check_reference_target(&table, col)?;
        }
        for index in table.indexes() {
            self.check_index_name_free(&index.name)?;
        }
        info!("created table '{}' with {} columns", name, table.columns().len());
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    // The referenced table may be `table` itself.
    fn check_reference_target(&self, table: &Table, col: &ColumnDef) -> DbResult<()> {
        let Some(fk) = &col.references else {
            return Ok(());
        };
        let target = if fk.table == table.name() {
            table
        } else {
            self.get_table(&fk.table)?
        };
        let target_col = target
            .column(&fk.column)
            .map_err(|_| DbError::ColumnNotFound(format!("{}.{}", fk.table, fk.column)))?;
        if !col.col_type.comparable_with(target_col.col_type) {
            return Err(DbError::Schema(format!(
                "{}.{} ({}) cannot reference {}.{} ({})",
                table.name(),
                col.name,
                col.col_type.as_str(),
                fk.table,
                fk.column,
                target_col.col_type.as_str()
            )));
        }
        Ok(())
    }

    fn check_index_name_free(&self, name: &str) -> DbResult<()> {
        if self.find_index(name).is_some() {
            return Err(DbError::IndexExists(name.to_string()));
        }
        Ok(())
    }

    /// Tables holding a foreign key into `name`, or into `name.column` when
    /// a column is given. A whole-table lookup skips the table's own
    /// self-references; a column lookup keeps them, except for a key on the
    /// column itself.
    fn referencing_tables(&self, name: &str, column: Option<&str>) -> Vec<String> {
        self.tables
            .values()
            .filter(|t| {
                t.columns().iter().any(|c| {
                    let own = t.name() == name;
                    c.references.as_ref().is_some_and(|fk| match column {
                        None => fk.table == name && !own,
                        Some(col) => fk.table == name && fk.column == col && !(own && c.name == col),
                    })
                })
            })
            .map(|t| t.name().to_string())
            .collect()
    }

    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        if !self.tables.contains_key(name) {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        let referencing = self.referencing_tables(name, None);
        if !referencing.is_empty() {
            return Err(DbError::Schema(format!(
                "cannot drop '{}': referenced by {}",
                name,
                referencing.join(", ")
            )));
        }
        self.tables.remove(name);
        info!("dropped table '{}'", name);
        Ok(())
    }

    pub fn find_index(&self, name: &str) -> Option<(&Table, &Index)> {
        self.tables
            .values()
            .find_map(|t| t.index_named(name).map(|i| (t, i)))
    }

    /// Create one index per listed column. A unique index must cover exactly
    /// one column; a multi-column non-unique request yields one index per
    /// column, named `<name>_<column>`.
    pub fn create_index(&mut self, name: &str, table: &str, columns: &[String], unique: bool) -> DbResult<()> {
        if columns.is_empty() {
            return Err(DbError::Schema(format!("index '{}' names no columns", name)));
        }
        if unique && columns.len() > 1 {
            return Err(DbError::Schema(format!(
                "unique index '{}' must cover exactly one column",
                name
            )));
        }
        let names: Vec<String> = if columns.len() == 1 {
            vec![name.to_string()]
        } else {
            columns.iter().map(|c| format!("{}_{}", name, c)).collect()
        };
        for index_name in &names {
            self.check_index_name_free(index_name)?;
        }
        let distinct: BTreeSet<&String> = columns.iter().collect();
        if distinct.len() != columns.len() {
            return Err(DbError::Schema(format!("index '{}' repeats a column", name)));
        }

        // Build on a copy so a failure on a later column leaves no index behind.
        let mut staged = self.get_table(table)?.clone();
        for (index_name, column) in names.iter().zip(columns) {
            staged.create_index(index_name, column, unique)?;
        }
        self.tables.insert(table.to_string(), staged);
        info!("created index '{}' on {}({})", name, table, columns.join(", "));
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) -> DbResult<()> {
        let (table, column) = self
            .find_index(name)
            .map(|(t, i)| (t.name().to_string(), i.column.clone()))
            .ok_or_else(|| DbError::IndexNotFound(name.to_string()))?;
        let table_ref = self.get_table(&table)?;
        let col = table_ref.column(&column)?;
        if col.unique && !col.primary_key {
            return Err(DbError::Schema(format!(
                "index '{}' enforces UNIQUE on {}.{}",
                name, table, column
            )));
        }
        self.get_table_mut(&table)?.drop_index(&column)?;
        info!("dropped index '{}'", name);
        Ok(())
    }

    /// Insert literal values, either positionally or into the named columns
    /// with the rest set to NULL. Values are coerced to the declared types
    /// and checked against the table's own constraints before foreign keys.
    pub fn insert_row(&mut self, table: &str, columns: Option<&[String]>, values: Vec<Value>) -> DbResult<RowId> {
        let target = self.get_table(table)?;
        let values = match columns {
            None => values,
            Some(names) => {
                if names.len() != values.len() {
                    return Err(DbError::Schema(format!(
                        "{} columns listed but {} values given",
                        names.len(),
                        values.len()
                    )));
                }
                let mut full = vec![Value::Null; target.columns().len()];
                let mut filled = BTreeSet::new();
                for (name, value) in names.iter().zip(values) {
                    let pos = target
                        .column_index(name)
                        .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", table, name)))?;
                    if !filled.insert(pos) {
                        return Err(DbError::Schema(format!("column '{}' listed twice", name)));
                    }
                    full[pos] = value;
                }
                full
            }
        };
        let row = target.coerce_row(values)?;
        target.validate_row(&row)?;
        ForeignKeyConstraint::new(self).validate_insert(target, &row)?;
        self.get_table_mut(table)?.insert(row)
    }

    /// Apply a batch of full-row replacements. Foreign keys in the new
    /// values must resolve, and referenced keys may not change while
    /// referenced.
    pub fn update_rows(&mut self, table: &str, changes: Vec<(RowId, RowData)>) -> DbResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let target = self.get_table(table)?;
        let fk = ForeignKeyConstraint::new(self);
        for (_, row) in &changes {
            fk.validate_insert(target, row)?;
        }
        fk.validate_key_change(target, &changes)?;
        self.get_table_mut(table)?.update(changes)
    }

    pub fn delete_rows(&mut self, table: &str, row_ids: &[RowId]) -> DbResult<usize> {
        if row_ids.is_empty() {
            return Ok(0);
        }
        let target = self.get_table(table)?;
        ForeignKeyConstraint::new(self).validate_delete(target, row_ids)?;
        Ok(self.get_table_mut(table)?.delete(row_ids))
    }

    pub fn add_column(&mut self, table: &str, def: ColumnDef) -> DbResult<()> {
        let target = self.get_table(table)?;
        self.check_reference_target(target, &def)?;
        let mut staged = target.clone();
        staged.add_column(def)?;
        for index in staged.indexes() {
            if self.find_index(&index.name).is_some_and(|(t, _)| t.name() != table) {
                return Err(DbError::IndexExists(index.name.clone()));
            }
        }
        debug!("added column to '{}'", table);
        self.tables.insert(table.to_string(), staged);
        Ok(())
    }

    pub fn drop_column(&mut self, table: &str, column: &str) -> DbResult<()> {
        self.get_table(table)?.column(column)?;
        let referencing = self.referencing_tables(table, Some(column));
        if !referencing.is_empty() {
            return Err(DbError::Schema(format!(
                "cannot drop {}.{}: referenced by {}",
                table,
                column,
                referencing.join(", ")
            )));
        }
        self.get_table_mut(table)?.drop_column(column)?;
        debug!("dropped column {}.{}", table, column);
        Ok(())
    }

    /// Change a column definition. Existing values must convert, satisfy
    /// the new constraints and, for a new foreign key, resolve.
    pub fn modify_column(&mut self, table: &str, def: ColumnDef) -> DbResult<()> {
        let target = self.get_table(table)?;
        self.check_reference_target(target, &def)?;
        if !self.referencing_tables(table, Some(&def.name)).is_empty() {
            let current = target.column(&def.name)?;
            if current.col_type != def.col_type {
                return Err(DbError::Schema(format!(
                    "cannot change the type of referenced column {}.{}",
                    table, def.name
                )));
            }
        }
        let mut staged = target.clone();
        staged.modify_column(def)?;
        let fk = ForeignKeyConstraint::new(self);
        for (_, row) in staged.rows() {
            fk.validate_insert(&staged, row)?;
        }
        debug!("modified column in '{}'", table);
        self.tables.insert(table.to_string(), staged);
        Ok(())
    }
}
