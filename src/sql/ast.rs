use crate::storage::row::Value;
use crate::storage::table::ColumnDef;

/// Literal as written in a statement. Bare words that are not keywords are
/// kept opaque and coerced by the target column.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Value(Value),
    Bare(String),
}

impl Literal {
    pub fn into_value(self) -> Value {
        match self {
            Literal::Value(v) => v,
            Literal::Bare(s) => Value::Text(s),
        }
    }

    pub fn as_value(&self) -> Value {
        self.clone().into_value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Predicate tree shared by WHERE, HAVING and JOIN ON.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison { column: String, op: CompareOp, value: Value },
    ColumnComparison { left: String, op: CompareOp, right: String },
    /// `Not` always has exactly one child.
    Logical { op: LogicalOp, children: Vec<Condition> },
    SetMembership { column: String, negated: bool, values: Vec<Value> },
    /// BETWEEN, inclusive at both ends.
    Range { column: String, low: Value, high: Value },
    /// LIKE with `%` and `_` wildcards.
    Pattern { column: String, pattern: String },
    NullCheck { column: String, negated: bool },
}

impl Condition {
    pub fn not(child: Condition) -> Self {
        Condition::Logical { op: LogicalOp::Not, children: vec![child] }
    }

    /// Every column name referenced by the tree, in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Comparison { column, .. }
            | Condition::SetMembership { column, .. }
            | Condition::Range { column, .. }
            | Condition::Pattern { column, .. }
            | Condition::NullCheck { column, .. } => out.push(column),
            Condition::ColumnComparison { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Condition::Logical { children, .. } => {
                for child in children {
                    child.collect_columns(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggFunc::Count),
            "SUM" => Some(AggFunc::Sum),
            "AVG" => Some(AggFunc::Avg),
            "MAX" => Some(AggFunc::Max),
            "MIN" => Some(AggFunc::Min),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Max => "MAX",
            AggFunc::Min => "MIN",
        }
    }
}

/// Canonical column name of an aggregate, e.g. `SUM(v)` or `COUNT(*)`.
pub fn aggregate_name(func: AggFunc, arg: Option<&str>) -> String {
    format!("{}({})", func.as_str(), arg.unwrap_or("*"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    All,
    Column { name: String, alias: Option<String> },
    /// `arg` is `None` only for `COUNT(*)`.
    Aggregate { func: AggFunc, arg: Option<String>, alias: Option<String> },
}

impl SelectItem {
    /// Header shown for this item: the alias if present, otherwise the
    /// expression as written.
    pub fn output_name(&self) -> String {
        match self {
            SelectItem::All => "*".to_string(),
            SelectItem::Column { name, alias } => alias.clone().unwrap_or_else(|| name.clone()),
            SelectItem::Aggregate { func, arg, alias } => alias
                .clone()
                .unwrap_or_else(|| aggregate_name(*func, arg.as_deref())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Name used to qualify this table's columns.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub on: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub selection: Option<Condition>,
    pub group_by: Vec<String>,
    pub having: Option<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    Column(String),
}

/// Right-hand side of `SET col = ...`.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Operand(Operand),
    Binary { left: Operand, op: ArithOp, right: Operand },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterOp {
    Add(ColumnDef),
    Drop(String),
    Modify(ColumnDef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        if_not_exists: bool,
    },
    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        unique: bool,
    },
    AlterTable {
        table: String,
        op: AlterOp,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    DropIndex {
        name: String,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<Literal>,
    },
    Update {
        table: String,
        assignments: Vec<(String, SetExpr)>,
        selection: Option<Condition>,
    },
    Delete {
        table: String,
        selection: Option<Condition>,
    },
    Select(SelectStatement),
}
