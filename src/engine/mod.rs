use log::debug;

use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::execution::result::QueryResult;
use crate::execution::runtime::handle_statement;
use crate::sql::ast::Statement;
use crate::sql::parser::parse_statement;

/// An in-memory database: the table catalog plus the statement pipeline.
///
/// Every statement runs to completion before `execute` returns. A statement
/// that fails leaves the catalog as it was.
#[derive(Debug, Default)]
pub struct Database {
    catalog: Catalog,
}

impl Database {
    pub fn new() -> Self {
        Database { catalog: Catalog::new() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parse and run one statement. Blank input yields `QueryResult::Empty`.
    pub fn execute(&mut self, sql: &str) -> DbResult<QueryResult> {
        let text = sql.trim();
        if text.trim_matches(';').trim().is_empty() {
            return Ok(QueryResult::Empty);
        }
        let stmt = parse_statement(text)?;
        self.execute_statement(stmt)
    }

    pub fn execute_statement(&mut self, stmt: Statement) -> DbResult<QueryResult> {
        handle_statement(&mut self.catalog, stmt)
    }

    /// Run `;`-separated statements in order, stopping at the first error.
    pub fn execute_script(&mut self, script: &str) -> DbResult<Vec<QueryResult>> {
        let mut results = Vec::new();
        for stmt in split_statements(script) {
            debug!("script statement: {}", stmt);
            results.push(self.execute(stmt)?);
        }
        Ok(results)
    }
}

/// Split on semicolons outside single-quoted strings. Empty pieces are
/// dropped.
pub fn split_statements(script: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    for (i, c) in script.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            ';' if !in_string => {
                out.push(&script[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&script[start..]);
    out.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}
