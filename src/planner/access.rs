use std::ops::Bound;

use log::debug;

use crate::execution::eval::Schema;
use crate::sql::ast::{CompareOp, Condition, LogicalOp};
use crate::storage::index::RowId;
use crate::storage::row::Value;
use crate::storage::table::Table;

/// How the first FROM table's rows are fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    FullScan,
    IndexEq { column: String, value: Value },
    IndexRange { column: String, low: Bound<Value>, high: Bound<Value> },
}

/// Pick an index lookup for a top-level comparison, or a comparison inside
/// a top-level AND. The full predicate is still evaluated afterwards, so the
/// path only has to return a superset of the matching rows.
///
/// `schema` describes the rows the predicate is evaluated over; the base
/// table's columns occupy its first `table.columns().len()` positions.
pub fn choose_access(table: &Table, schema: &Schema, selection: Option<&Condition>) -> AccessPath {
    let Some(cond) = selection else {
        return AccessPath::FullScan;
    };
    let terms: Vec<&Condition> = match cond {
        Condition::Logical { op: LogicalOp::And, children } => children.iter().collect(),
        other => vec![other],
    };
    for term in terms {
        if let Some(path) = index_path(table, schema, term) {
            debug!("using index access {:?} on '{}'", path, table.name());
            return path;
        }
    }
    debug!("full scan of '{}'", table.name());
    AccessPath::FullScan
}

fn indexed_column<'t>(table: &'t Table, schema: &Schema, name: &str, value: &Value) -> Option<&'t str> {
    let pos = schema.resolve(name).ok()?;
    let col = table.columns().get(pos)?;
    if value.is_null() || !col.col_type.accepts(value) {
        return None;
    }
    table.index_on(&col.name).map(|_| col.name.as_str())
}

fn index_path(table: &Table, schema: &Schema, term: &Condition) -> Option<AccessPath> {
    match term {
        Condition::Comparison { column, op, value } => {
            let column = indexed_column(table, schema, column, value)?.to_string();
            let v = value.clone();
            Some(match op {
                CompareOp::Eq => AccessPath::IndexEq { column, value: v },
                CompareOp::Gt => AccessPath::IndexRange { column, low: Bound::Excluded(v), high: Bound::Unbounded },
                CompareOp::GtEq => AccessPath::IndexRange { column, low: Bound::Included(v), high: Bound::Unbounded },
                CompareOp::Lt => AccessPath::IndexRange { column, low: Bound::Unbounded, high: Bound::Excluded(v) },
                CompareOp::LtEq => AccessPath::IndexRange { column, low: Bound::Unbounded, high: Bound::Included(v) },
                CompareOp::NotEq => return None,
            })
        }
        Condition::Range { column: name, low, high } => {
            let column = indexed_column(table, schema, name, low)?;
            indexed_column(table, schema, name, high)?;
            Some(AccessPath::IndexRange {
                column: column.to_string(),
                low: Bound::Included(low.clone()),
                high: Bound::Included(high.clone()),
            })
        }
        _ => None,
    }
}

/// Row ids selected by `path`, in insertion order.
pub fn candidate_rows(table: &Table, path: &AccessPath) -> Vec<RowId> {
    let scan = || -> Vec<RowId> { table.rows().map(|(id, _)| id).collect() };
    match path {
        AccessPath::FullScan => scan(),
        AccessPath::IndexEq { column, value } => match table.index_on(column) {
            Some(index) => index.find(value).into_iter().collect(),
            None => scan(),
        },
        AccessPath::IndexRange { column, low, high } => match table.index_on(column) {
            Some(index) => index.find_range(low.as_ref(), high.as_ref()).into_iter().collect(),
            None => scan(),
        },
    }
}
