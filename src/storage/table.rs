use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::constraints::local_constraints;
use crate::error::{DbError, DbResult};
use crate::storage::index::{Index, IndexKey, RowId};
use crate::storage::row::{ColumnType, RowData, Value, build_row_data};

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub references: Option<ForeignKeyRef>,
}

impl ColumnDef {
    pub fn new(name: &str, col_type: ColumnType) -> Self {
        ColumnDef {
            name: name.to_string(),
            col_type,
            primary_key: false,
            not_null: false,
            unique: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some(ForeignKeyRef { table: table.to_string(), column: column.to_string() });
        self
    }

    fn needs_unique_index(&self) -> bool {
        self.primary_key || self.unique
    }
}

/// A table owns its column definitions, its rows and one index per indexed
/// column.
///
/// Row ids are positions in the row store. A deleted row leaves a tombstone,
/// so ids held by indexes never shift.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Option<RowData>>,
    indexes: BTreeMap<String, Index>,
}

fn position(columns: &[ColumnDef], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.name == name)
}

fn constraint_index_name(table: &str, col: &ColumnDef) -> String {
    if col.primary_key {
        format!("pk_{}", table)
    } else {
        format!("uq_{}_{}", table, col.name)
    }
}

impl Table {
    pub fn new(name: &str, columns: Vec<ColumnDef>) -> DbResult<Self> {
        if columns.is_empty() {
            return Err(DbError::Schema(format!("table '{}' must have at least one column", name)));
        }
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(DbError::Schema(format!("duplicate column '{}' in table '{}'", col.name, name)));
            }
        }
        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(DbError::Schema(format!("table '{}' declares more than one primary key", name)));
        }
        let mut indexes = BTreeMap::new();
        for col in columns.iter().filter(|c| c.needs_unique_index()) {
            let index_name = constraint_index_name(name, col);
            indexes.insert(col.name.clone(), Index::new(&index_name, name, &col.name, true));
        }
        Ok(Table { name: name.to_string(), columns, rows: Vec::new(), indexes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        position(&self.columns, name)
    }

    pub fn column(&self, name: &str) -> DbResult<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name, name)))
    }

    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Option::is_none)
    }

    pub fn row(&self, id: RowId) -> Option<&RowData> {
        self.rows.get(id).and_then(Option::as_ref)
    }

    /// Live rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &RowData)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(id, row)| row.as_ref().map(|r| (id, r)))
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Index> + '_ {
        self.indexes.values()
    }

    pub fn index_on(&self, column: &str) -> Option<&Index> {
        self.indexes.get(column)
    }

    pub fn index_named(&self, name: &str) -> Option<&Index> {
        self.indexes.values().find(|i| i.name == name)
    }

    pub fn coerce_row(&self, values: Vec<Value>) -> DbResult<RowData> {
        build_row_data(values, &self.columns)
    }

    /// Checks every constraint local to this table except uniqueness, which
    /// the indexes enforce.
    pub fn validate_row(&self, row: &[Value]) -> DbResult<()> {
        if row.len() != self.columns.len() {
            return Err(DbError::Schema(format!(
                "table '{}' expects {} values, got {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        for constraint in local_constraints() {
            constraint.validate_insert(self, row)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, row: RowData) -> DbResult<RowId> {
        self.validate_row(&row)?;
        let row_id = self.rows.len();
        self.add_to_indexes(row_id, &row)?;
        self.rows.push(Some(row));
        debug!("inserted row {} into '{}'", row_id, self.name);
        Ok(row_id)
    }

    // All or nothing: a failed add removes the keys already added for this row.
    fn add_to_indexes(&mut self, row_id: RowId, row: &[Value]) -> DbResult<()> {
        let mut added: Vec<(String, usize)> = Vec::new();
        let keyed: Vec<(String, usize)> = self
            .indexes
            .keys()
            .filter_map(|c| position(&self.columns, c).map(|pos| (c.clone(), pos)))
            .collect();
        for (column, pos) in keyed {
            let Some(index) = self.indexes.get_mut(&column) else {
                continue;
            };
            if let Err(e) = index.add(&row[pos], row_id) {
                for (done, done_pos) in &added {
                    if let Some(index) = self.indexes.get_mut(done) {
                        index.remove(&row[*done_pos], row_id);
                    }
                }
                warn!("insert into '{}' rolled back: {}", self.name, e);
                return Err(e);
            }
            added.push((column, pos));
        }
        Ok(())
    }

    /// Replace rows in place. Every candidate row is validated, including
    /// uniqueness against rows outside the change set and within it, before
    /// any row or index is touched.
    pub fn update(&mut self, changes: Vec<(RowId, RowData)>) -> DbResult<usize> {
        let changed: BTreeSet<RowId> = changes.iter().map(|(id, _)| *id).collect();
        for (id, new_row) in &changes {
            if self.row(*id).is_none() {
                return Err(DbError::Schema(format!("row {} does not exist in '{}'", id, self.name)));
            }
            self.validate_row(new_row)?;
        }
        for index in self.indexes.values().filter(|i| i.unique) {
            let Some(pos) = position(&self.columns, &index.column) else {
                continue;
            };
            let mut seen = BTreeSet::new();
            for (_, new_row) in &changes {
                let key = &new_row[pos];
                if key.is_null() {
                    continue;
                }
                let collides = !seen.insert(IndexKey(key.clone()))
                    || index.find(key).iter().any(|other| !changed.contains(other));
                if collides {
                    return Err(DbError::DuplicateKey { column: index.column.clone(), value: key.to_string() });
                }
            }
        }

        let keyed: Vec<(String, usize)> = self
            .indexes
            .keys()
            .filter_map(|c| position(&self.columns, c).map(|pos| (c.clone(), pos)))
            .collect();
        for (id, _) in &changes {
            if let Some(old) = self.rows[*id].as_ref() {
                for (column, pos) in &keyed {
                    if let Some(index) = self.indexes.get_mut(column) {
                        index.remove(&old[*pos], *id);
                    }
                }
            }
        }
        let count = changes.len();
        for (id, new_row) in changes {
            for (column, pos) in &keyed {
                if let Some(index) = self.indexes.get_mut(column) {
                    index.add(&new_row[*pos], id)?;
                }
            }
            self.rows[id] = Some(new_row);
        }
        debug!("updated {} rows in '{}'", count, self.name);
        Ok(count)
    }

    pub fn delete(&mut self, ids: &[RowId]) -> usize {
        let mut count = 0;
        for &id in ids {
            let Some(old) = self.rows.get_mut(id).and_then(Option::take) else {
                continue;
            };
            for index in self.indexes.values_mut() {
                if let Some(pos) = position(&self.columns, &index.column) {
                    index.remove(&old[pos], id);
                }
            }
            count += 1;
        }
        debug!("deleted {} rows from '{}'", count, self.name);
        count
    }

    /// Build an index over the existing rows. A uniqueness violation discards
    /// the partial index and leaves the table untouched.
    pub fn create_index(&mut self, name: &str, column: &str, unique: bool) -> DbResult<()> {
        let pos = self
            .column_index(column)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name, column)))?;
        if let Some(existing) = self.indexes.get(column) {
            return Err(DbError::Schema(format!(
                "column '{}' already has index '{}'",
                column, existing.name
            )));
        }
        let mut index = Index::new(name, &self.name, column, unique);
        for (id, row) in self.rows() {
            if let Err(e) = index.add(&row[pos], id) {
                warn!("index '{}' on '{}' discarded: {}", name, self.name, e);
                return Err(e);
            }
        }
        self.indexes.insert(column.to_string(), index);
        Ok(())
    }

    pub fn drop_index(&mut self, column: &str) -> DbResult<Index> {
        if self.columns.iter().any(|c| c.name == column && c.primary_key) {
            return Err(DbError::Schema(format!(
                "cannot drop the primary key index of '{}'",
                self.name
            )));
        }
        self.indexes
            .remove(column)
            .ok_or_else(|| DbError::IndexNotFound(format!("{}.{}", self.name, column)))
    }

    pub fn add_column(&mut self, def: ColumnDef) -> DbResult<()> {
        if self.column_index(&def.name).is_some() {
            return Err(DbError::Schema(format!("column '{}' already exists in '{}'", def.name, self.name)));
        }
        if def.primary_key && self.primary_key().is_some() {
            return Err(DbError::Schema(format!("table '{}' already has a primary key", self.name)));
        }
        if !self.is_empty() {
            if def.primary_key {
                return Err(DbError::NullPrimaryKey(def.name));
            }
            if def.not_null {
                return Err(DbError::NullViolation(def.name));
            }
        }
        if def.needs_unique_index() {
            let index_name = constraint_index_name(&self.name, &def);
            self.indexes
                .insert(def.name.clone(), Index::new(&index_name, &self.name, &def.name, true));
        }
        for row in self.rows.iter_mut().flatten() {
            row.push(Value::Null);
        }
        self.columns.push(def);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> DbResult<()> {
        let pos = self
            .column_index(name)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name, name)))?;
        if self.columns[pos].primary_key {
            return Err(DbError::Schema(format!("cannot drop primary key column '{}'", name)));
        }
        if self.columns.len() == 1 {
            return Err(DbError::Schema(format!("cannot drop the only column of '{}'", self.name)));
        }
        self.indexes.remove(name);
        for row in self.rows.iter_mut().flatten() {
            row.remove(pos);
        }
        self.columns.remove(pos);
        Ok(())
    }

    /// Change a column's type or constraints. Existing values are converted
    /// and revalidated first; nothing changes if any row fails.
    pub fn modify_column(&mut self, def: ColumnDef) -> DbResult<()> {
        let pos = self
            .column_index(&def.name)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name, def.name)))?;
        if def.primary_key && self.columns.iter().any(|c| c.primary_key && c.name != def.name) {
            return Err(DbError::Schema(format!("table '{}' already has a primary key", self.name)));
        }
        let mut converted = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match row {
                Some(r) => {
                    let value = r[pos].clone().coerce_to(def.col_type, &def.name)?;
                    if value.is_null() && def.primary_key {
                        return Err(DbError::NullPrimaryKey(def.name.clone()));
                    }
                    if value.is_null() && def.not_null {
                        return Err(DbError::NullViolation(def.name.clone()));
                    }
                    converted.push(Some(value));
                }
                None => converted.push(None),
            }
        }

        let old_def = &self.columns[pos];
        let old_index = self.indexes.get(&def.name);
        let rebuilt = if def.needs_unique_index() || old_index.is_some() {
            let explicit_unique = old_index
                .map(|i| i.unique && !old_def.needs_unique_index())
                .unwrap_or(false);
            let index_name = match old_index {
                Some(i) if !old_def.needs_unique_index() || def.needs_unique_index() => i.name.clone(),
                _ => constraint_index_name(&self.name, &def),
            };
            let mut index = Index::new(&index_name, &self.name, &def.name, def.needs_unique_index() || explicit_unique);
            for (id, value) in converted.iter().enumerate() {
                if let Some(v) = value {
                    index.add(v, id)?;
                }
            }
            Some(index)
        } else {
            None
        };

        for (row, value) in self.rows.iter_mut().zip(converted) {
            if let (Some(r), Some(v)) = (row.as_mut(), value) {
                r[pos] = v;
            }
        }
        match rebuilt {
            Some(index) => {
                self.indexes.insert(def.name.clone(), index);
            }
            None => {
                self.indexes.remove(&def.name);
            }
        }
        self.columns[pos] = def;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", ColumnType::Int).primary_key(),
                ColumnDef::new("email", ColumnType::Text).unique(),
                ColumnDef::new("name", ColumnType::Text).not_null(),
            ],
        )
        .unwrap()
    }

    fn row(id: i64, email: &str, name: &str) -> RowData {
        vec![Value::Integer(id), Value::from(email), Value::from(name)]
    }

    #[test]
    fn primary_key_gets_unique_index() {
        let t = users();
        let idx = t.index_on("id").unwrap();
        assert!(idx.unique);
        assert_eq!(idx.name, "pk_users");
    }

    #[test]
    fn rejects_two_primary_keys() {
        let res = Table::new(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Int).primary_key(),
                ColumnDef::new("b", ColumnType::Int).primary_key(),
            ],
        );
        assert!(matches!(res, Err(DbError::Schema(_))));
    }

    #[test]
    fn failed_unique_insert_rolls_back_every_index() {
        let mut t = users();
        t.create_index("idx_name", "name", false).unwrap();
        t.insert(row(1, "a@x", "ann")).unwrap();
        let before = t.clone();
        // email is indexed before id, so its key must be rolled back
        let err = t.insert(row(1, "b@x", "bob")).unwrap_err();
        assert!(matches!(err, DbError::DuplicateKey { .. }));
        assert_eq!(t, before);
        assert!(t.index_on("email").unwrap().find(&Value::from("b@x")).is_empty());
    }

    #[test]
    fn null_checks_run_before_indexes() {
        let mut t = users();
        assert!(matches!(
            t.insert(vec![Value::Null, Value::from("x"), Value::from("y")]),
            Err(DbError::NullPrimaryKey(_))
        ));
        assert!(matches!(
            t.insert(vec![Value::Integer(1), Value::from("x"), Value::Null]),
            Err(DbError::NullViolation(_))
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn row_ids_survive_deletes() {
        let mut t = users();
        for i in 0..5 {
            t.insert(row(i, &format!("{}@x", i), "n")).unwrap();
        }
        assert_eq!(t.delete(&[3]), 1);
        assert_eq!(t.row(4).unwrap()[0], Value::Integer(4));
        assert!(t.row(3).is_none());
        let id = t.insert(row(9, "9@x", "n")).unwrap();
        assert_eq!(id, 5);
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn update_swapping_keys_is_allowed() {
        let mut t = users();
        t.insert(row(1, "a", "n")).unwrap();
        t.insert(row(2, "b", "n")).unwrap();
        let changes = vec![(0, row(1, "b", "n")), (1, row(2, "a", "n"))];
        assert_eq!(t.update(changes).unwrap(), 2);
        assert_eq!(t.index_on("email").unwrap().find(&Value::from("a")).into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn update_collision_changes_nothing() {
        let mut t = users();
        t.insert(row(1, "a", "n")).unwrap();
        t.insert(row(2, "b", "n")).unwrap();
        let before = t.clone();
        assert!(t.update(vec![(1, row(1, "b", "n"))]).is_err());
        assert!(t.update(vec![(0, row(5, "c", "n")), (1, row(5, "d", "n"))]).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn failed_index_creation_leaves_table() {
        let mut t = users();
        t.insert(row(1, "a", "same")).unwrap();
        t.insert(row(2, "b", "same")).unwrap();
        let before = t.clone();
        assert!(t.create_index("uq_name", "name", true).is_err());
        assert_eq!(t, before);
        assert!(t.index_on("name").is_none());
    }

    #[test]
    fn add_and_drop_column() {
        let mut t = users();
        t.insert(row(1, "a", "n")).unwrap();
        t.add_column(ColumnDef::new("age", ColumnType::Int)).unwrap();
        assert_eq!(t.row(0).unwrap().len(), 4);
        assert!(t.add_column(ColumnDef::new("zip", ColumnType::Text).not_null()).is_err());
        t.drop_column("email").unwrap();
        assert!(t.index_on("email").is_none());
        assert_eq!(t.row(0).unwrap(), &vec![Value::Integer(1), Value::from("n"), Value::Null]);
        assert!(t.drop_column("id").is_err());
    }

    #[test]
    fn modify_column_converts_or_fails_whole() {
        let mut t = Table::new(
            "t",
            vec![ColumnDef::new("id", ColumnType::Int).primary_key(), ColumnDef::new("v", ColumnType::Text)],
        )
        .unwrap();
        t.insert(vec![Value::Integer(1), Value::from("10")]).unwrap();
        t.insert(vec![Value::Integer(2), Value::from("x")]).unwrap();
        let before = t.clone();
        assert!(t.modify_column(ColumnDef::new("v", ColumnType::Int)).is_err());
        assert_eq!(t, before);
        t.delete(&[1]);
        t.modify_column(ColumnDef::new("v", ColumnType::Int).unique()).unwrap();
        assert_eq!(t.row(0).unwrap()[1], Value::Integer(10));
        assert!(t.index_on("v").unwrap().unique);
    }
}
