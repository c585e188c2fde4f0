//! Text rendering of query results for the shell.

use crate::execution::result::{QueryResult, ResultSet};

fn border(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for w in widths {
        line.push_str(&"-".repeat(w + 2));
        line.push('+');
    }
    line
}

fn row_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, w) in cells.iter().zip(widths) {
        line.push_str(&format!(" {:<width$} |", cell, width = w));
    }
    line
}

/// Bordered table followed by the row count, or `Empty set` when there are
/// no rows.
pub fn render_result_set(rs: &ResultSet) -> String {
    if rs.is_empty() {
        return "Empty set".to_string();
    }
    let cells: Vec<Vec<String>> = rs
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();
    let mut widths: Vec<usize> = rs.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let sep = border(&widths);
    let mut lines = vec![sep.clone(), row_line(&rs.columns, &widths), sep.clone()];
    lines.extend(cells.iter().map(|row| row_line(row, &widths)));
    lines.push(sep);
    let count = if rs.len() == 1 { "1 row in set".to_string() } else { format!("{} rows in set", rs.len()) };
    lines.push(count);
    lines.join("\n")
}

/// What the shell prints for a result; `None` for blank input.
pub fn render(result: &QueryResult) -> Option<String> {
    match result {
        QueryResult::Rows(rs) => Some(render_result_set(rs)),
        QueryResult::Message(msg) => Some(msg.clone()),
        QueryResult::Empty => None,
    }
}
