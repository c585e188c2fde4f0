use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::execution::eval::Schema;
use crate::execution::result::QueryResult;
use crate::execution::select::{execute_select, matching_row_ids};
use crate::sql::ast::{AlterOp, ArithOp, Condition, Literal, Operand, SetExpr, Statement};
use crate::storage::row::{RowData, Value};
use crate::storage::table::ColumnDef;

fn plural(n: usize, noun: &str) -> String {
    if n == 1 { format!("1 {}", noun) } else { format!("{} {}s", n, noun) }
}

pub fn execute_create_table(
    catalog: &mut Catalog,
    name: &str,
    columns: Vec<ColumnDef>,
    if_not_exists: bool,
) -> DbResult<QueryResult> {
    if if_not_exists && catalog.contains_table(name) {
        return Ok(QueryResult::Message(format!("Table '{}' already exists, skipped", name)));
    }
    catalog.create_table(name, columns)?;
    Ok(QueryResult::Message(format!("Table '{}' created successfully", name)))
}

pub fn execute_insert(
    catalog: &mut Catalog,
    table: &str,
    columns: Option<Vec<String>>,
    values: Vec<Literal>,
) -> DbResult<QueryResult> {
    let values: Vec<Value> = values.into_iter().map(Literal::into_value).collect();
    catalog.insert_row(table, columns.as_deref(), values)?;
    Ok(QueryResult::Message("1 row inserted".to_string()))
}

fn operand_value(operand: &Operand, schema: &Schema, row: &[Value]) -> DbResult<Value> {
    match operand {
        Operand::Literal(lit) => Ok(lit.as_value()),
        Operand::Column(name) => Ok(row[schema.resolve(name)?].clone()),
    }
}

fn arithmetic(left: Value, op: ArithOp, right: Value) -> DbResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        let result = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div if b == 0 => return Err(DbError::Type("division by zero".to_string())),
            ArithOp::Div => a.checked_div(b),
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| DbError::Type("integer overflow".to_string()));
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => {
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div if b == 0.0 => return Err(DbError::Type("division by zero".to_string())),
                ArithOp::Div => a / b,
            };
            Ok(Value::Float(result))
        }
        _ => Err(DbError::Type(format!(
            "cannot apply arithmetic to {} and {}",
            left.kind_name(),
            right.kind_name()
        ))),
    }
}

fn eval_set_expr(expr: &SetExpr, schema: &Schema, row: &[Value]) -> DbResult<Value> {
    match expr {
        SetExpr::Operand(operand) => operand_value(operand, schema, row),
        SetExpr::Binary { left, op, right } => {
            let l = operand_value(left, schema, row)?;
            let r = operand_value(right, schema, row)?;
            arithmetic(l, *op, r)
        }
    }
}

/// Build every post-update row from the current values, then hand the
/// whole batch to the catalog, which validates before it applies.
pub fn execute_update(
    catalog: &mut Catalog,
    table_name: &str,
    assignments: &[(String, SetExpr)],
    selection: Option<&Condition>,
) -> DbResult<QueryResult> {
    let table = catalog.get_table(table_name)?;
    let schema = Schema::for_table(table, table_name);
    let targets = assignments
        .iter()
        .map(|(col, _)| {
            table
                .column_index(col)
                .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", table_name, col)))
        })
        .collect::<DbResult<Vec<_>>>()?;

    let mut changes: Vec<(usize, RowData)> = Vec::new();
    for id in matching_row_ids(table, selection)? {
        let Some(current) = table.row(id) else {
            continue;
        };
        let mut updated = current.clone();
        for (&pos, (_, expr)) in targets.iter().zip(assignments) {
            let col = &table.columns()[pos];
            updated[pos] = eval_set_expr(expr, &schema, current)?.coerce_to(col.col_type, &col.name)?;
        }
        changes.push((id, updated));
    }
    let count = catalog.update_rows(table_name, changes).inspect_err(|e| {
        warn!("update on '{}' rejected: {}", table_name, e);
    })?;
    Ok(QueryResult::Message(format!("{} updated", plural(count, "row"))))
}

pub fn execute_delete(
    catalog: &mut Catalog,
    table_name: &str,
    selection: Option<&Condition>,
) -> DbResult<QueryResult> {
    let table = catalog.get_table(table_name)?;
    let ids = matching_row_ids(table, selection)?;
    let count = catalog.delete_rows(table_name, &ids).inspect_err(|e| {
        warn!("delete on '{}' rejected: {}", table_name, e);
    })?;
    Ok(QueryResult::Message(format!("{} deleted", plural(count, "row"))))
}

fn execute_alter(catalog: &mut Catalog, table: &str, op: AlterOp) -> DbResult<QueryResult> {
    let message = match op {
        AlterOp::Add(def) => {
            let name = def.name.clone();
            catalog.add_column(table, def)?;
            format!("Column '{}' added to '{}'", name, table)
        }
        AlterOp::Drop(column) => {
            catalog.drop_column(table, &column)?;
            format!("Column '{}' dropped from '{}'", column, table)
        }
        AlterOp::Modify(def) => {
            let name = def.name.clone();
            catalog.modify_column(table, def)?;
            format!("Column '{}' of '{}' modified", name, table)
        }
    };
    info!("{}", message);
    Ok(QueryResult::Message(message))
}

/// Execute one parsed statement against the catalog.
pub fn handle_statement(catalog: &mut Catalog, stmt: Statement) -> DbResult<QueryResult> {
    debug!("executing {:?}", stmt);
    match stmt {
        Statement::CreateTable { name, columns, if_not_exists } => {
            execute_create_table(catalog, &name, columns, if_not_exists)
        }
        Statement::CreateIndex { name, table, columns, unique } => {
            catalog.create_index(&name, &table, &columns, unique)?;
            Ok(QueryResult::Message(format!("Index '{}' created successfully", name)))
        }
        Statement::AlterTable { table, op } => execute_alter(catalog, &table, op),
        Statement::DropTable { name, if_exists } => {
            if if_exists && !catalog.contains_table(&name) {
                return Ok(QueryResult::Message(format!("Table '{}' does not exist, skipped", name)));
            }
            catalog.drop_table(&name)?;
            Ok(QueryResult::Message(format!("Table '{}' dropped", name)))
        }
        Statement::DropIndex { name } => {
            catalog.drop_index(&name)?;
            Ok(QueryResult::Message(format!("Index '{}' dropped", name)))
        }
        Statement::Insert { table, columns, values } => execute_insert(catalog, &table, columns, values),
        Statement::Update { table, assignments, selection } => {
            execute_update(catalog, &table, &assignments, selection.as_ref())
        }
        Statement::Delete { table, selection } => execute_delete(catalog, &table, selection.as_ref()),
        Statement::Select(select) => Ok(QueryResult::Rows(execute_select(catalog, &select)?)),
    }
}
