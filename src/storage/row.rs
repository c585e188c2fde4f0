use std::cmp::Ordering;
use std::fmt;

use crate::error::{DbError, DbResult};
use crate::storage::table::ColumnDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Boolean,
}

impl ColumnType {
    /// Resolve a declared type name. Length suffixes such as `VARCHAR(20)`
    /// are accepted and ignored.
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" => Some(ColumnType::Int),
            "FLOAT" | "REAL" | "DOUBLE" => Some(ColumnType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Some(ColumnType::Text),
            "BOOL" | "BOOLEAN" => Some(ColumnType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// Whether a literal of this value's kind can be compared against the
    /// column without a type error.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnType::Int | ColumnType::Float, Value::Integer(_) | Value::Float(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Boolean, Value::Boolean(_))
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    pub fn comparable_with(&self, other: ColumnType) -> bool {
        *self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// SQL comparison. `Ok(None)` when either side is NULL; a type error when
    /// the kinds cannot be compared.
    pub fn compare(&self, other: &Value) -> DbResult<Option<Ordering>> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(None),
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
            (Value::Text(a), Value::Text(b)) => Ok(Some(a.cmp(b))),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y)),
                _ => Err(DbError::Type(format!(
                    "cannot compare {} with {}",
                    a.kind_name(),
                    b.kind_name()
                ))),
            },
        }
    }

    /// Total order used for sorting, grouping and index keys: NULL first,
    /// then booleans, numbers by magnitude, and text by code point.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Boolean(_) => 1,
                Value::Integer(_) | Value::Float(_) => 2,
                Value::Text(_) => 3,
            }
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(&unsigned_zero(*b)),
            (Value::Float(a), Value::Integer(b)) => unsigned_zero(*a).total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Convert to the declared column type, as done for every value written
    /// into a table.
    pub fn coerce_to(self, ty: ColumnType, column: &str) -> DbResult<Value> {
        let mismatch = |v: &Value| {
            DbError::Type(format!(
                "value '{}' for column '{}' is not a valid {}",
                v,
                column,
                ty.as_str()
            ))
        };
        match (ty, self) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnType::Int, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ColumnType::Int, Value::Float(f)) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
                    Ok(Value::Integer(f as i64))
                } else {
                    Err(mismatch(&Value::Float(f)))
                }
            }
            (ColumnType::Int, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch(&Value::Text(s.clone()))),
            (ColumnType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (ColumnType::Float, Value::Float(f)) => Ok(Value::Float(unsigned_zero(f))),
            (ColumnType::Float, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(unsigned_zero(f))),
                _ => Err(mismatch(&Value::Text(s))),
            },
            (ColumnType::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (ColumnType::Text, other) => Ok(Value::Text(other.to_string())),
            (ColumnType::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (ColumnType::Boolean, Value::Integer(i)) if i == 0 || i == 1 => Ok(Value::Boolean(i == 1)),
            (ColumnType::Boolean, Value::Text(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(mismatch(&Value::Text(s))),
            },
            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// `-0.0` as `0.0`; SQL equality does not see the sign of zero.
fn unsigned_zero(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Stored row: one value per declared column, in declaration order.
pub type RowData = Vec<Value>;

/// Coerce positional values against the declared column types. Fails if the
/// counts differ or any value does not convert.
pub fn build_row_data(values: Vec<Value>, columns: &[ColumnDef]) -> DbResult<RowData> {
    if values.len() != columns.len() {
        return Err(DbError::Schema(format!(
            "expected {} values, got {}",
            columns.len(),
            values.len()
        )));
    }
    values
        .into_iter()
        .zip(columns.iter())
        .map(|(v, col)| v.coerce_to(col.col_type, &col.name))
        .collect()
}
