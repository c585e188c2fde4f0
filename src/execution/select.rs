use std::cmp::Ordering;
use std::collections::BTreeSet;

use log::debug;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::execution::eval::{Schema, evaluate};
use crate::execution::result::ResultSet;
use crate::planner::access::{candidate_rows, choose_access};
use crate::planner::aggregate::{collect_aggregates, group_rows, is_grouped, validate_group_by};
use crate::sql::ast::{Condition, SelectItem, SelectStatement, aggregate_name};
use crate::storage::index::{IndexKey, RowId};
use crate::storage::row::Value;
use crate::storage::table::Table;

type Rows = Vec<Vec<Value>>;

fn filter_rows(rows: Rows, cond: &Condition, schema: &Schema) -> DbResult<Rows> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if evaluate(cond, schema, &row)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

/// Ids of the rows of `table` matching `selection`, in insertion order.
/// Used by UPDATE and DELETE as well as single-table SELECT.
pub fn matching_row_ids(table: &Table, selection: Option<&Condition>) -> DbResult<Vec<RowId>> {
    let schema = Schema::for_table(table, table.name());
    let path = choose_access(table, &schema, selection);
    let mut ids = Vec::new();
    for id in candidate_rows(table, &path) {
        let Some(row) = table.row(id) else {
            continue;
        };
        let keep = match selection {
            Some(cond) => evaluate(cond, &schema, row)?,
            None => true,
        };
        if keep {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn cross(left: Rows, right: &Table) -> Rows {
    let mut out = Vec::new();
    for l in &left {
        for (_, r) in right.rows() {
            let mut combined = l.clone();
            combined.extend(r.iter().cloned());
            out.push(combined);
        }
    }
    out
}

fn join_rows(left: Rows, right: &Table, on: &Condition, schema: &Schema) -> DbResult<Rows> {
    let mut out = Vec::new();
    for l in &left {
        for (_, r) in right.rows() {
            let mut combined = l.clone();
            combined.extend(r.iter().cloned());
            if evaluate(on, schema, &combined)? {
                out.push(combined);
            }
        }
    }
    Ok(out)
}

/// ORDER BY accepts columns of the current row and select-list aliases.
fn order_position(select: &SelectStatement, schema: &Schema, name: &str) -> DbResult<usize> {
    match schema.resolve(name) {
        Ok(pos) => Ok(pos),
        Err(err) => {
            let target = select.columns.iter().find_map(|item| match item {
                SelectItem::Column { name: column, alias: Some(alias) } if alias == name => Some(column.clone()),
                SelectItem::Aggregate { func, arg, alias: Some(alias) } if alias == name => {
                    Some(aggregate_name(*func, arg.as_deref()))
                }
                _ => None,
            });
            match target {
                Some(column) => schema.resolve(&column),
                None => Err(err),
            }
        }
    }
}

fn sort_rows(select: &SelectStatement, schema: &Schema, rows: &mut Rows) -> DbResult<()> {
    let keys = select
        .order_by
        .iter()
        .map(|o| order_position(select, schema, &o.column).map(|p| (p, o.descending)))
        .collect::<DbResult<Vec<_>>>()?;
    // `sort_by` is stable, so full ties keep their prior order.
    rows.sort_by(|a, b| {
        for &(pos, descending) in &keys {
            let ord = a[pos].total_cmp(&b[pos]);
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

/// Headers and source positions of the output columns. `*` expands to the
/// columns of the joined tables in declared order, qualified only where a
/// name occurs more than once.
fn projection(select: &SelectStatement, schema: &Schema, source: &Schema) -> DbResult<(Vec<String>, Vec<usize>)> {
    let mut headers = Vec::new();
    let mut positions = Vec::new();
    for item in &select.columns {
        match item {
            SelectItem::All => {
                for (pos, field) in source.fields.iter().enumerate() {
                    let repeated = source.fields.iter().filter(|f| f.name == field.name).count() > 1;
                    headers.push(if repeated { field.qualified_name() } else { field.name.clone() });
                    positions.push(pos);
                }
            }
            SelectItem::Column { name, .. } => {
                positions.push(schema.resolve(name)?);
                headers.push(item.output_name());
            }
            SelectItem::Aggregate { func, arg, .. } => {
                positions.push(schema.resolve(&aggregate_name(*func, arg.as_deref()))?);
                headers.push(item.output_name());
            }
        }
    }
    Ok((headers, positions))
}

fn dedupe(rows: Rows) -> Rows {
    let mut seen: BTreeSet<Vec<IndexKey>> = BTreeSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.iter().cloned().map(IndexKey).collect()))
        .collect()
}

/// Run a SELECT through its stages: row acquisition and filtering, joins,
/// grouping and HAVING, ordering, projection with DISTINCT, then LIMIT and
/// OFFSET.
pub fn execute_select(catalog: &Catalog, select: &SelectStatement) -> DbResult<ResultSet> {
    validate_group_by(select)?;
    let Some(base_ref) = select.from.first() else {
        return Err(DbError::Parse("SELECT requires a FROM table".to_string()));
    };
    let base = catalog.get_table(&base_ref.name)?;
    let mut others = Vec::new();
    for tref in &select.from[1..] {
        let table = catalog.get_table(&tref.name)?;
        others.push((table, Schema::for_table(table, tref.qualifier())));
    }
    let mut joined = Vec::new();
    for join in &select.joins {
        let table = catalog.get_table(&join.table.name)?;
        joined.push((table, Schema::for_table(table, join.table.qualifier()), &join.on));
    }
    let multi_table = !others.is_empty() || !joined.is_empty();

    let mut schema = Schema::for_table(base, base_ref.qualifier());
    let full_schema = others
        .iter()
        .map(|(_, s)| s)
        .chain(joined.iter().map(|(_, s, _)| s))
        .fold(schema.clone(), |acc, s| acc.join(s));

    // Row acquisition, narrowed by an index when the predicate allows it.
    let path = choose_access(base, &full_schema, select.selection.as_ref());
    let mut rows: Rows = candidate_rows(base, &path)
        .into_iter()
        .filter_map(|id| base.row(id).cloned())
        .collect();
    if !multi_table {
        if let Some(cond) = &select.selection {
            rows = filter_rows(rows, cond, &schema)?;
        }
    }

    for (table, right_schema) in &others {
        rows = cross(rows, table);
        schema = schema.join(right_schema);
    }
    for (table, right_schema, on) in &joined {
        schema = schema.join(right_schema);
        rows = join_rows(rows, table, on, &schema)?;
    }
    if multi_table {
        if let Some(cond) = &select.selection {
            rows = filter_rows(rows, cond, &schema)?;
        }
    }

    let source = schema.clone();
    let aggregates = collect_aggregates(select);
    if is_grouped(select, &aggregates) {
        let (grouped_schema, grouped) = group_rows(select, &aggregates, &schema, rows)?;
        schema = grouped_schema;
        rows = grouped;
        if let Some(having) = &select.having {
            rows = filter_rows(rows, having, &schema)?;
        }
    }

    if !select.order_by.is_empty() {
        sort_rows(select, &schema, &mut rows)?;
    }

    let (headers, positions) = projection(select, &schema, &source)?;
    let mut out: Rows = rows
        .into_iter()
        .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
        .collect();
    if select.distinct {
        out = dedupe(out);
    }
    let offset = select.offset.unwrap_or(0);
    let limit = select.limit.unwrap_or(usize::MAX);
    let out: Rows = out.into_iter().skip(offset).take(limit).collect();
    debug!("select on '{}' returned {} rows", base_ref.name, out.len());
    Ok(ResultSet::new(headers, out))
}
