//! WHERE / HAVING / ON grammar.
//!
//! Precedence from loosest to tightest: `OR`, `AND`, `NOT`, then a leaf or a
//! parenthesized group. Chains of the same operator are flattened into one
//! `Logical` node with children in source order.

use crate::error::{DbError, DbResult};
use crate::sql::ast::{CompareOp, Condition, Literal, LogicalOp, aggregate_name};
use crate::sql::lexer::{Token, tokenize};
use crate::sql::parser::{Cursor, is_reserved, parse_aggregate_call, parse_literal, peek_aggregate};
use crate::storage::row::Value;

pub(crate) fn parse_condition(cur: &mut Cursor) -> DbResult<Condition> {
    parse_or(cur)
}

/// Parse a standalone condition such as `a = 1 AND b LIKE 'x%'`.
pub fn parse_condition_str(text: &str) -> DbResult<Condition> {
    let mut cur = Cursor::new(tokenize(text)?);
    let cond = parse_or(&mut cur)?;
    if !cur.is_done() {
        return Err(cur.unexpected("end of condition"));
    }
    Ok(cond)
}

fn chain(op: LogicalOp, mut children: Vec<Condition>) -> Condition {
    if children.len() == 1 {
        children.remove(0)
    } else {
        Condition::Logical { op, children }
    }
}

fn parse_or(cur: &mut Cursor) -> DbResult<Condition> {
    let mut children = vec![parse_and(cur)?];
    while cur.eat_keyword("OR") {
        children.push(parse_and(cur)?);
    }
    Ok(chain(LogicalOp::Or, children))
}

fn parse_and(cur: &mut Cursor) -> DbResult<Condition> {
    let mut children = vec![parse_not(cur)?];
    while cur.eat_keyword("AND") {
        children.push(parse_not(cur)?);
    }
    Ok(chain(LogicalOp::And, children))
}

fn parse_not(cur: &mut Cursor) -> DbResult<Condition> {
    if cur.eat_keyword("NOT") {
        return Ok(Condition::not(parse_not(cur)?));
    }
    if cur.eat(&Token::LParen) {
        let inner = parse_or(cur)?;
        cur.expect(&Token::RParen, "')' to close condition")?;
        return Ok(inner);
    }
    parse_leaf(cur)
}

fn compare_op(tok: Option<&Token>) -> Option<CompareOp> {
    match tok? {
        Token::Eq => Some(CompareOp::Eq),
        Token::NotEq => Some(CompareOp::NotEq),
        Token::Gt => Some(CompareOp::Gt),
        Token::GtEq => Some(CompareOp::GtEq),
        Token::Lt => Some(CompareOp::Lt),
        Token::LtEq => Some(CompareOp::LtEq),
        _ => None,
    }
}

/// Left side of a leaf: a column, or an aggregate call which resolves
/// against the grouped row by its canonical name.
fn parse_subject(cur: &mut Cursor) -> DbResult<String> {
    if let Some(func) = peek_aggregate(cur) {
        let arg = parse_aggregate_call(cur, func)?;
        return Ok(aggregate_name(func, arg.as_deref()));
    }
    cur.identifier("column name in condition")
}

fn value_literal(cur: &mut Cursor) -> DbResult<Value> {
    Ok(parse_literal(cur)?.into_value())
}

fn parse_leaf(cur: &mut Cursor) -> DbResult<Condition> {
    let column = parse_subject(cur)?;

    if cur.eat_keyword("IS") {
        let negated = cur.eat_keyword("NOT");
        cur.expect_keyword("NULL")?;
        return Ok(Condition::NullCheck { column, negated });
    }

    let negated = cur.eat_keyword("NOT");
    if cur.eat_keyword("IN") {
        cur.expect(&Token::LParen, "'(' after IN")?;
        let mut values = vec![value_literal(cur)?];
        while cur.eat(&Token::Comma) {
            values.push(value_literal(cur)?);
        }
        cur.expect(&Token::RParen, "')' to close IN list")?;
        return Ok(Condition::SetMembership { column, negated, values });
    }
    if cur.eat_keyword("BETWEEN") {
        let low = value_literal(cur)?;
        cur.expect_keyword("AND")?;
        let high = value_literal(cur)?;
        let range = Condition::Range { column, low, high };
        return Ok(if negated { Condition::not(range) } else { range });
    }
    if cur.eat_keyword("LIKE") {
        let pattern = match cur.advance() {
            Some(Token::Str(p)) => p,
            _ => return Err(DbError::Parse("LIKE requires a quoted pattern".to_string())),
        };
        let like = Condition::Pattern { column, pattern };
        return Ok(if negated { Condition::not(like) } else { like });
    }
    if negated {
        return Err(cur.unexpected("IN, BETWEEN or LIKE after NOT"));
    }

    let Some(op) = compare_op(cur.peek()) else {
        return Err(cur.unexpected(&format!("operator after '{}'", column)));
    };
    cur.advance();
    if let Some(Token::Word(w)) = cur.peek() {
        if !is_reserved(w) && !matches!(w.to_ascii_lowercase().as_str(), "true" | "false") {
            let right = parse_subject(cur)?;
            return Ok(Condition::ColumnComparison { left: column, op, right });
        }
    }
    let value = match parse_literal(cur)? {
        Literal::Value(v) => v,
        Literal::Bare(w) => return Err(DbError::Parse(format!("unexpected '{}' in comparison", w))),
    };
    Ok(Condition::Comparison { column, op, value })
}
