use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DbError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("index '{0}' not found")]
    IndexNotFound(String),
    #[error("index '{0}' already exists")]
    IndexExists(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("null value in column '{0}' violates not-null constraint")]
    NullViolation(String),
    #[error("primary key column '{0}' cannot be null")]
    NullPrimaryKey(String),
    #[error("duplicate key {value} violates unique index on column '{column}'")]
    DuplicateKey { column: String, value: String },
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("semantic error: {0}")]
    Semantic(String),
}

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Schema,
    Constraint,
    Type,
    Semantic,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Parse(_) => ErrorKind::Parse,
            DbError::TableNotFound(_)
            | DbError::TableExists(_)
            | DbError::ColumnNotFound(_)
            | DbError::IndexNotFound(_)
            | DbError::IndexExists(_)
            | DbError::Schema(_) => ErrorKind::Schema,
            DbError::NullViolation(_)
            | DbError::NullPrimaryKey(_)
            | DbError::DuplicateKey { .. }
            | DbError::ForeignKeyViolation(_) => ErrorKind::Constraint,
            DbError::Type(_) => ErrorKind::Type,
            DbError::Semantic(_) => ErrorKind::Semantic,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
