use std::cmp::Ordering;

use crate::error::{DbError, DbResult};
use crate::sql::ast::{CompareOp, Condition, LogicalOp};
use crate::storage::row::Value;
use crate::storage::table::Table;

/// One column of an intermediate row. `qualifier` is the table name or
/// alias the column came from; derived columns have none.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub qualifier: Option<String>,
    pub name: String,
}

impl Field {
    pub fn new(qualifier: Option<&str>, name: &str) -> Self {
        Field { qualifier: qualifier.map(str::to_string), name: name.to_string() }
    }

    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.name),
            None => self.name.clone(),
        }
    }
}

/// Column layout of the rows flowing through a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn for_table(table: &Table, qualifier: &str) -> Self {
        Schema {
            fields: table.columns().iter().map(|c| Field::new(Some(qualifier), &c.name)).collect(),
        }
    }

    pub fn join(&self, right: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        fields.extend(right.fields.iter().cloned());
        Schema { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of `name`, which is either a bare column or `qualifier.column`.
    /// A derived column (alias or aggregate) shadows table columns of the
    /// same name; otherwise a bare name matching several tables is ambiguous.
    pub fn resolve(&self, name: &str) -> DbResult<usize> {
        let bare: Vec<usize> = self.positions(|f| f.name == name);
        match bare.len() {
            1 => return Ok(bare[0]),
            0 => {}
            _ => {
                let derived: Vec<&usize> = bare.iter().filter(|&&i| self.fields[i].qualifier.is_none()).collect();
                if let &[pos] = derived.as_slice() {
                    return Ok(*pos);
                }
                return Err(DbError::Semantic(format!("column reference '{}' is ambiguous", name)));
            }
        }
        if let Some((qualifier, column)) = name.split_once('.') {
            let qualified = self.positions(|f| f.qualifier.as_deref() == Some(qualifier) && f.name == column);
            if let &[pos] = qualified.as_slice() {
                return Ok(pos);
            }
        }
        Err(DbError::Semantic(format!("unknown column '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    fn positions<F: Fn(&Field) -> bool>(&self, pred: F) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| pred(f))
            .map(|(i, _)| i)
            .collect()
    }
}

fn op_holds(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::NotEq => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::GtEq => ord != Ordering::Less,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::LtEq => ord != Ordering::Greater,
    }
}

/// Comparison under SQL rules: anything involving NULL is false.
pub fn compare_values(left: &Value, op: CompareOp, right: &Value) -> DbResult<bool> {
    Ok(left.compare(right)?.is_some_and(|ord| op_holds(op, ord)))
}

/// Evaluate a predicate against one row laid out by `schema`.
pub fn evaluate(cond: &Condition, schema: &Schema, row: &[Value]) -> DbResult<bool> {
    match cond {
        Condition::Comparison { column, op, value } => {
            let v = &row[schema.resolve(column)?];
            compare_values(v, *op, value)
        }
        Condition::ColumnComparison { left, op, right } => {
            let l = &row[schema.resolve(left)?];
            let r = &row[schema.resolve(right)?];
            compare_values(l, *op, r)
        }
        Condition::Logical { op: LogicalOp::And, children } => {
            for child in children {
                if !evaluate(child, schema, row)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Logical { op: LogicalOp::Or, children } => {
            for child in children {
                if evaluate(child, schema, row)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Logical { op: LogicalOp::Not, children } => match children.as_slice() {
            [child] => Ok(!evaluate(child, schema, row)?),
            _ => Err(DbError::Semantic("NOT takes exactly one operand".to_string())),
        },
        Condition::SetMembership { column, negated, values } => {
            let v = &row[schema.resolve(column)?];
            if v.is_null() {
                return Ok(false);
            }
            let mut found = false;
            for candidate in values {
                if compare_values(v, CompareOp::Eq, candidate)? {
                    found = true;
                    break;
                }
            }
            Ok(found != *negated)
        }
        Condition::Range { column, low, high } => {
            let v = &row[schema.resolve(column)?];
            Ok(compare_values(v, CompareOp::GtEq, low)? && compare_values(v, CompareOp::LtEq, high)?)
        }
        Condition::Pattern { column, pattern } => match &row[schema.resolve(column)?] {
            Value::Text(s) => Ok(like(s, pattern)),
            Value::Null => Ok(false),
            other => Err(DbError::Type(format!("LIKE needs TEXT, found {}", other.kind_name()))),
        },
        Condition::NullCheck { column, negated } => {
            let v = &row[schema.resolve(column)?];
            Ok(v.is_null() != *negated)
        }
    }
}

/// SQL LIKE over whole values: `%` is any run of characters, `_` exactly
/// one. Case-sensitive.
pub fn like(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut vi, mut pi) = (0, 0);
    // Last '%' seen and the value position it is currently stretched to.
    let mut star: Option<(usize, usize)> = None;
    while vi < v.len() {
        if pi < p.len() && (p[pi] == '_' || (p[pi] != '%' && p[pi] == v[vi])) {
            vi += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, vi));
            pi += 1;
        } else if let Some((star_pi, star_vi)) = star {
            pi = star_pi + 1;
            vi = star_vi + 1;
            star = Some((star_pi, star_vi + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::condition::parse_condition_str;

    fn schema(names: &[&str]) -> Schema {
        Schema { fields: names.iter().map(|n| Field::new(Some("t"), n)).collect() }
    }

    fn eval(cond: &str, row: &[Value]) -> DbResult<bool> {
        let s = schema(&["a", "b", "name"]);
        evaluate(&parse_condition_str(cond).unwrap(), &s, row)
    }

    #[test]
    fn like_wildcards() {
        assert!(like("hello", "h%o"));
        assert!(like("hello", "_ello"));
        assert!(like("hello", "%"));
        assert!(like("", "%"));
        assert!(like("abcbc", "a%bc"));
        assert!(!like("hello", "hell"));
        assert!(!like("Hello", "h%"));
        assert!(!like("hello", "h_o"));
        assert!(like("a%b", "a%b"));
    }

    #[test]
    fn comparisons_and_logic() {
        let row = [Value::Integer(5), Value::Float(2.5), Value::from("Jane")];
        assert!(eval("a > 3 AND b < 3", &row).unwrap());
        assert!(eval("a = 1 OR name LIKE 'J%'", &row).unwrap());
        assert!(!eval("NOT a BETWEEN 1 AND 5", &row).unwrap());
        assert!(eval("a IN (1, 5, 9)", &row).unwrap());
        assert!(eval("a NOT IN (1, 9)", &row).unwrap());
        assert!(eval("a >= b", &row).unwrap());
    }

    #[test]
    fn nulls_never_match() {
        let row = [Value::Null, Value::Null, Value::Null];
        assert!(!eval("a = 1", &row).unwrap());
        assert!(!eval("a != 1", &row).unwrap());
        assert!(!eval("a NOT IN (1)", &row).unwrap());
        assert!(!eval("name LIKE '%'", &row).unwrap());
        assert!(eval("a IS NULL", &row).unwrap());
    }

    #[test]
    fn errors_surface() {
        let row = [Value::Integer(1), Value::Float(1.0), Value::from("x")];
        assert!(matches!(eval("missing = 1", &row), Err(DbError::Semantic(_))));
        assert!(matches!(eval("a = 'x'", &row), Err(DbError::Type(_))));
        assert!(matches!(eval("a LIKE 'x'", &row), Err(DbError::Type(_))));
    }

    #[test]
    fn qualified_and_ambiguous_names() {
        let s = Schema { fields: vec![Field::new(Some("o"), "id"), Field::new(Some("c"), "id")] };
        assert_eq!(s.resolve("c.id").unwrap(), 1);
        assert!(matches!(s.resolve("id"), Err(DbError::Semantic(_))));
        assert!(s.resolve("x.id").is_err());
    }
}
