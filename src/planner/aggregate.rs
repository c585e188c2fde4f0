use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::debug;

use crate::error::{DbError, DbResult};
use crate::execution::eval::{Field, Schema};
use crate::sql::ast::{AggFunc, Condition, SelectItem, SelectStatement, aggregate_name};
use crate::storage::index::IndexKey;
use crate::storage::row::Value;

/// One aggregate to compute per group, named canonically (`SUM(v)`).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub func: AggFunc,
    pub arg: Option<String>,
    pub name: String,
}

impl AggregateSpec {
    pub fn new(func: AggFunc, arg: Option<&str>) -> Self {
        AggregateSpec { func, arg: arg.map(str::to_string), name: aggregate_name(func, arg) }
    }

    /// Recognise a canonical aggregate name used as a column in HAVING or
    /// ORDER BY.
    pub fn from_name(name: &str) -> Option<Self> {
        let (head, rest) = name.split_once('(')?;
        let func = AggFunc::from_name(head)?;
        let arg = rest.strip_suffix(')')?;
        Some(AggregateSpec::new(func, if arg == "*" { None } else { Some(arg) }))
    }
}

pub fn validate_group_by(select: &SelectStatement) -> DbResult<()> {
    if select.having.is_some() && select.group_by.is_empty() {
        return Err(DbError::Semantic("HAVING requires GROUP BY".to_string()));
    }
    if select.columns.contains(&SelectItem::All) && select.columns.len() > 1 {
        return Err(DbError::Semantic("'*' cannot be combined with other select items".to_string()));
    }
    Ok(())
}

/// Aggregates the query needs, in first-mention order without duplicates:
/// those selected, then those referenced from HAVING and ORDER BY.
pub fn collect_aggregates(select: &SelectStatement) -> Vec<AggregateSpec> {
    let mut specs: Vec<AggregateSpec> = Vec::new();
    let mut push = |spec: AggregateSpec| {
        if !specs.iter().any(|s| s.name == spec.name) {
            specs.push(spec);
        }
    };
    for item in &select.columns {
        if let SelectItem::Aggregate { func, arg, .. } = item {
            push(AggregateSpec::new(*func, arg.as_deref()));
        }
    }
    let having = select.having.as_ref().map(Condition::columns).unwrap_or_default();
    let ordering = select.order_by.iter().map(|o| o.column.as_str());
    for name in having.into_iter().chain(ordering) {
        if let Some(spec) = AggregateSpec::from_name(name) {
            push(spec);
        }
    }
    specs
}

/// Whether the query runs through the grouping stage at all.
pub fn is_grouped(select: &SelectStatement, aggregates: &[AggregateSpec]) -> bool {
    !select.group_by.is_empty() || !aggregates.is_empty()
}

struct Totals {
    /// `None` once a float is seen or the integer sum overflows.
    int: Option<i64>,
    all_int: bool,
    float: f64,
}

fn totals(values: &[&Value], func: AggFunc, column: &str) -> DbResult<Totals> {
    let mut t = Totals { int: Some(0), all_int: true, float: 0.0 };
    for v in values {
        match v {
            Value::Integer(i) => {
                t.int = t.int.and_then(|n| n.checked_add(*i));
                t.float += *i as f64;
            }
            Value::Float(f) => {
                t.int = None;
                t.all_int = false;
                t.float += f;
            }
            other => {
                return Err(DbError::Type(format!(
                    "cannot apply {} to {} values of '{}'",
                    func.as_str(),
                    other.kind_name(),
                    column
                )));
            }
        }
    }
    Ok(t)
}

fn sum(values: &[&Value], column: &str) -> DbResult<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let t = totals(values, AggFunc::Sum, column)?;
    match (t.all_int, t.int) {
        (true, Some(n)) => Ok(Value::Integer(n)),
        (true, None) => Err(DbError::Type(format!("integer overflow in SUM({})", column))),
        _ => Ok(Value::Float(t.float)),
    }
}

fn avg(values: &[&Value], column: &str) -> DbResult<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let t = totals(values, AggFunc::Avg, column)?;
    Ok(Value::Float(t.float / values.len() as f64))
}

fn extreme(values: &[&Value], want: Ordering) -> DbResult<Value> {
    let mut best: Option<&Value> = None;
    for &v in values {
        let replace = match best {
            Some(b) => v.compare(b)? == Some(want),
            None => true,
        };
        if replace {
            best = Some(v);
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

/// Reduce one group. NULL inputs are ignored by every function except
/// `COUNT(*)`.
pub fn compute(spec: &AggregateSpec, schema: &Schema, rows: &[&Vec<Value>]) -> DbResult<Value> {
    let Some(arg) = &spec.arg else {
        return Ok(Value::Integer(rows.len() as i64));
    };
    let pos = schema.resolve(arg)?;
    let values: Vec<&Value> = rows.iter().map(|r| &r[pos]).filter(|v| !v.is_null()).collect();
    match spec.func {
        AggFunc::Count => Ok(Value::Integer(values.len() as i64)),
        AggFunc::Sum => sum(&values, arg),
        AggFunc::Avg => avg(&values, arg),
        AggFunc::Max => extreme(&values, Ordering::Greater),
        AggFunc::Min => extreme(&values, Ordering::Less),
    }
}

/// Partition `rows` by the GROUP BY columns (one implicit group when there
/// are none) and produce one output row per group, in first-seen order.
///
/// An output row is the group's first input row followed by a column per
/// select alias and per aggregate, so that HAVING, ORDER BY and the final
/// projection can all address the grouped row by name.
pub fn group_rows(
    select: &SelectStatement,
    aggregates: &[AggregateSpec],
    schema: &Schema,
    rows: Vec<Vec<Value>>,
) -> DbResult<(Schema, Vec<Vec<Value>>)> {
    let key_positions = select
        .group_by
        .iter()
        .map(|c| schema.resolve(c))
        .collect::<DbResult<Vec<_>>>()?;
    for spec in aggregates {
        if let Some(arg) = &spec.arg {
            schema.resolve(arg)?;
        }
    }

    let mut order: Vec<Vec<usize>> = Vec::new();
    let mut lookup: BTreeMap<Vec<IndexKey>, usize> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        let key: Vec<IndexKey> = key_positions.iter().map(|&p| IndexKey(row[p].clone())).collect();
        match lookup.get(&key) {
            Some(&g) => order[g].push(i),
            None => {
                lookup.insert(key, order.len());
                order.push(vec![i]);
            }
        }
    }
    if order.is_empty() && key_positions.is_empty() {
        order.push(Vec::new());
    }
    debug!("grouped {} rows into {} groups", rows.len(), order.len());

    let mut out_schema = schema.clone();
    let mut column_aliases: Vec<(String, usize)> = Vec::new();
    for item in &select.columns {
        if let SelectItem::Column { name, alias: Some(alias) } = item {
            column_aliases.push((alias.clone(), schema.resolve(name)?));
            out_schema.fields.push(Field::new(None, alias));
        }
    }
    for spec in aggregates {
        out_schema.fields.push(Field::new(None, &spec.name));
    }
    let aggregate_aliases: Vec<(String, usize)> = select
        .columns
        .iter()
        .filter_map(|item| match item {
            SelectItem::Aggregate { func, arg, alias: Some(alias) } => {
                let name = aggregate_name(*func, arg.as_deref());
                aggregates.iter().position(|s| s.name == name).map(|p| (alias.clone(), p))
            }
            _ => None,
        })
        .collect();
    for (alias, _) in &aggregate_aliases {
        out_schema.fields.push(Field::new(None, alias));
    }

    let mut output = Vec::with_capacity(order.len());
    for members in &order {
        let group: Vec<&Vec<Value>> = members.iter().map(|&i| &rows[i]).collect();
        let mut out = match group.first() {
            Some(first) => (*first).clone(),
            None => vec![Value::Null; schema.len()],
        };
        for (_, pos) in &column_aliases {
            out.push(out[*pos].clone());
        }
        let mut computed = Vec::with_capacity(aggregates.len());
        for spec in aggregates {
            computed.push(compute(spec, schema, &group)?);
        }
        for (_, p) in &aggregate_aliases {
            computed.push(computed[*p].clone());
        }
        out.extend(computed);
        output.push(out);
    }
    Ok((out_schema, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::Statement;
    use crate::sql::parser::parse_statement;

    fn select(sql: &str) -> SelectStatement {
        match parse_statement(sql).unwrap() {
            Statement::Select(s) => s,
            other => panic!("expected select, got {:?}", other),
        }
    }

    fn schema() -> Schema {
        Schema { fields: vec![Field::new(Some("t"), "k"), Field::new(Some("t"), "v")] }
    }

    fn rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::Integer(1), Value::Integer(10)],
            vec![Value::Integer(1), Value::Integer(20)],
            vec![Value::Integer(2), Value::Integer(5)],
            vec![Value::Integer(2), Value::Null],
        ]
    }

    #[test]
    fn sums_in_first_seen_order() {
        let sel = select("SELECT k, SUM(v) AS s FROM t GROUP BY k");
        let aggs = collect_aggregates(&sel);
        let (schema, out) = group_rows(&sel, &aggs, &schema(), rows()).unwrap();
        let k = schema.resolve("k").unwrap();
        let s = schema.resolve("s").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!((out[0][k].clone(), out[0][s].clone()), (Value::Integer(1), Value::Integer(30)));
        assert_eq!((out[1][k].clone(), out[1][s].clone()), (Value::Integer(2), Value::Integer(5)));
    }

    #[test]
    fn count_variants_and_avg() {
        let sel = select("SELECT COUNT(*), COUNT(v), AVG(v), MAX(v), MIN(v) FROM t");
        let aggs = collect_aggregates(&sel);
        let (schema, out) = group_rows(&sel, &aggs, &schema(), rows()).unwrap();
        assert_eq!(out.len(), 1);
        let get = |n: &str| out[0][schema.resolve(n).unwrap()].clone();
        assert_eq!(get("COUNT(*)"), Value::Integer(4));
        assert_eq!(get("COUNT(v)"), Value::Integer(3));
        assert_eq!(get("AVG(v)"), Value::Float(35.0 / 3.0));
        assert_eq!(get("MAX(v)"), Value::Integer(20));
        assert_eq!(get("MIN(v)"), Value::Integer(5));
    }

    #[test]
    fn implicit_group_over_no_rows() {
        let sel = select("SELECT COUNT(*), SUM(v) FROM t");
        let aggs = collect_aggregates(&sel);
        let (schema, out) = group_rows(&sel, &aggs, &schema(), Vec::new()).unwrap();
        assert_eq!(out[0][schema.resolve("COUNT(*)").unwrap()], Value::Integer(0));
        assert_eq!(out[0][schema.resolve("SUM(v)").unwrap()], Value::Null);
    }

    #[test]
    fn having_aggregates_are_collected() {
        let sel = select("SELECT k FROM t GROUP BY k HAVING COUNT(*) > 1 ORDER BY MAX(v)");
        let names: Vec<String> = collect_aggregates(&sel).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["COUNT(*)".to_string(), "MAX(v)".to_string()]);
    }

    #[test]
    fn sum_of_text_is_type_error() {
        let sel = select("SELECT SUM(k) FROM t");
        let aggs = collect_aggregates(&sel);
        let text_rows = vec![vec![Value::from("a"), Value::Integer(1)]];
        assert!(matches!(group_rows(&sel, &aggs, &schema(), text_rows), Err(DbError::Type(_))));
    }

    #[test]
    fn avg_survives_integer_overflow() {
        let big = vec![
            vec![Value::Integer(1), Value::Integer(i64::MAX)],
            vec![Value::Integer(1), Value::Integer(i64::MAX)],
        ];
        let refs: Vec<&Vec<Value>> = big.iter().collect();
        let avg = compute(&AggregateSpec::new(AggFunc::Avg, Some("v")), &schema(), &refs).unwrap();
        assert_eq!(avg, Value::Float(i64::MAX as f64));
        let sum = compute(&AggregateSpec::new(AggFunc::Sum, Some("v")), &schema(), &refs);
        assert!(matches!(sum, Err(DbError::Type(_))));
    }

    #[test]
    fn having_needs_group_by() {
        let sel = select("SELECT COUNT(*) FROM t HAVING COUNT(*) > 1");
        assert!(matches!(validate_group_by(&sel), Err(DbError::Semantic(_))));
    }
}
