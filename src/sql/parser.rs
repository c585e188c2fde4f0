use log::debug;

use crate::error::{DbError, DbResult};
use crate::sql::ast::{
    AggFunc, AlterOp, ArithOp, Join, Literal, Operand, OrderBy, SelectItem, SelectStatement, SetExpr, Statement,
    TableRef, aggregate_name,
};
use crate::sql::condition::parse_condition;
use crate::sql::lexer::{Token, tokenize};
use crate::storage::row::{ColumnType, Value};
use crate::storage::table::ColumnDef;

/// Words that end a clause and therefore never act as an identifier or an
/// implicit alias.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "LIMIT", "OFFSET", "JOIN", "INNER",
    "ON", "AND", "OR", "NOT", "AS", "ASC", "DESC", "IN", "LIKE", "BETWEEN", "IS", "NULL", "DISTINCT",
    "VALUES", "SET", "INTO",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

fn describe(tok: Option<&Token>) -> String {
    match tok {
        None => "end of input".to_string(),
        Some(Token::Word(w)) => format!("'{}'", w),
        Some(Token::Number(n)) => format!("'{}'", n),
        Some(Token::Str(s)) => format!("'{}'", s),
        Some(other) => format!("{:?}", other),
    }
}

/// Position in a token stream with the small lookahead helpers the
/// statement and condition grammars share.
pub(crate) struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    pub(crate) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: &str) -> DbResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(kw))
        }
    }

    pub(crate) fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, tok: &Token, what: &str) -> DbResult<()> {
        if self.eat(tok) { Ok(()) } else { Err(self.unexpected(what)) }
    }

    pub(crate) fn unexpected(&self, wanted: &str) -> DbError {
        DbError::Parse(format!("expected {}, found {}", wanted, describe(self.peek())))
    }

    pub(crate) fn identifier(&mut self, what: &str) -> DbResult<String> {
        match self.peek() {
            Some(Token::Word(w)) if !is_reserved(w) => {
                let name = w.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn finish(&mut self) -> DbResult<()> {
        while self.eat(&Token::Semicolon) {}
        if self.is_done() {
            Ok(())
        } else {
            Err(DbError::Parse(format!("unexpected {} after statement", describe(self.peek()))))
        }
    }

    /// `( item, item, ... )` with at least one item.
    fn paren_list<T, F>(&mut self, mut item: F) -> DbResult<Vec<T>>
    where
        F: FnMut(&mut Cursor) -> DbResult<T>,
    {
        self.expect(&Token::LParen, "'('")?;
        let mut items = vec![item(self)?];
        while self.eat(&Token::Comma) {
            items.push(item(self)?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(items)
    }
}

fn number_literal(text: &str, negative: bool) -> DbResult<Value> {
    let signed = if negative { format!("-{}", text) } else { text.to_string() };
    if !text.contains('.') {
        if let Ok(i) = signed.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
    }
    signed
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| DbError::Parse(format!("invalid number '{}'", signed)))
}

/// Literal in a value position: quoted text, a signed number, `true`,
/// `false`, `null`, or a bare word kept for coercion by the column.
pub(crate) fn parse_literal(cur: &mut Cursor) -> DbResult<Literal> {
    match cur.advance() {
        Some(Token::Str(s)) => Ok(Literal::Value(Value::Text(s))),
        Some(Token::Number(n)) => Ok(Literal::Value(number_literal(&n, false)?)),
        Some(sign @ (Token::Minus | Token::Plus)) => match cur.advance() {
            Some(Token::Number(n)) => Ok(Literal::Value(number_literal(&n, sign == Token::Minus)?)),
            other => Err(DbError::Parse(format!("expected number after sign, found {}", describe(other.as_ref())))),
        },
        Some(Token::Word(w)) => Ok(match w.to_ascii_lowercase().as_str() {
            "true" => Literal::Value(Value::Boolean(true)),
            "false" => Literal::Value(Value::Boolean(false)),
            "null" => Literal::Value(Value::Null),
            _ => Literal::Bare(w),
        }),
        other => Err(DbError::Parse(format!("expected a value, found {}", describe(other.as_ref())))),
    }
}

pub fn parse_statement(input: &str) -> DbResult<Statement> {
    let text = input.trim().trim_end_matches(';').trim_end();
    let tokens = tokenize(text)?;
    let mut cur = Cursor::new(tokens);
    let head = match cur.peek() {
        Some(Token::Word(w)) => w.to_ascii_uppercase(),
        Some(other) => return Err(DbError::Parse(format!("unrecognized statement starting with {:?}", other))),
        None => return Err(DbError::Parse("empty statement".to_string())),
    };
    cur.advance();
    let stmt = match head.as_str() {
        "SELECT" => Statement::Select(parse_select(&mut cur)?),
        "INSERT" => parse_insert(&mut cur)?,
        "UPDATE" => parse_update(&mut cur)?,
        "DELETE" => parse_delete(&mut cur)?,
        "CREATE" => parse_create(&mut cur)?,
        "ALTER" => parse_alter(&mut cur)?,
        "DROP" => parse_drop(&mut cur)?,
        _ => return Err(DbError::Parse(format!("unrecognized statement '{}'", head))),
    };
    cur.finish()?;
    debug!("parsed {} statement", head);
    Ok(stmt)
}

fn parse_column_def(cur: &mut Cursor) -> DbResult<ColumnDef> {
    let name = cur.identifier("column name")?;
    let type_name = match cur.advance() {
        Some(Token::Word(w)) => w,
        other => return Err(DbError::Parse(format!("expected type for column '{}', found {}", name, describe(other.as_ref())))),
    };
    let col_type = ColumnType::from_str(&type_name)
        .ok_or_else(|| DbError::Parse(format!("unknown type '{}' for column '{}'", type_name, name)))?;
    if cur.eat(&Token::LParen) {
        match cur.advance() {
            Some(Token::Number(_)) => {}
            other => return Err(DbError::Parse(format!("expected type length, found {}", describe(other.as_ref())))),
        }
        cur.expect(&Token::RParen, "')'")?;
    }
    let mut def = ColumnDef::new(&name, col_type);
    loop {
        if cur.eat_keyword("PRIMARY") {
            cur.expect_keyword("KEY")?;
            def.primary_key = true;
        } else if cur.eat_keyword("NOT") {
            cur.expect_keyword("NULL")?;
            def.not_null = true;
        } else if cur.eat_keyword("NULL") {
            // nullable is the default
        } else if cur.eat_keyword("UNIQUE") {
            def.unique = true;
        } else if cur.eat_keyword("REFERENCES") {
            let table = cur.identifier("referenced table")?;
            cur.expect(&Token::LParen, "'('")?;
            let column = cur.identifier("referenced column")?;
            cur.expect(&Token::RParen, "')'")?;
            def = def.references(&table, &column);
        } else {
            break;
        }
    }
    Ok(def)
}

fn parse_create(cur: &mut Cursor) -> DbResult<Statement> {
    if cur.eat_keyword("TABLE") {
        let if_not_exists = if cur.eat_keyword("IF") {
            cur.expect_keyword("NOT")?;
            cur.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        let name = cur.identifier("table name")?;
        let columns = cur.paren_list(parse_column_def)?;
        return Ok(Statement::CreateTable { name, columns, if_not_exists });
    }
    let unique = cur.eat_keyword("UNIQUE");
    if !cur.eat_keyword("INDEX") {
        return Err(cur.unexpected(if unique { "INDEX" } else { "TABLE or INDEX" }));
    }
    let name = cur.identifier("index name")?;
    cur.expect_keyword("ON")?;
    let table = cur.identifier("table name")?;
    let columns = cur.paren_list(|c| c.identifier("column name"))?;
    Ok(Statement::CreateIndex { name, table, columns, unique })
}

fn parse_alter(cur: &mut Cursor) -> DbResult<Statement> {
    cur.expect_keyword("TABLE")?;
    let table = cur.identifier("table name")?;
    let op = if cur.eat_keyword("ADD") {
        cur.eat_keyword("COLUMN");
        AlterOp::Add(parse_column_def(cur)?)
    } else if cur.eat_keyword("DROP") {
        cur.eat_keyword("COLUMN");
        AlterOp::Drop(cur.identifier("column name")?)
    } else if cur.eat_keyword("MODIFY") {
        cur.eat_keyword("COLUMN");
        AlterOp::Modify(parse_column_def(cur)?)
    } else {
        return Err(cur.unexpected("ADD, DROP or MODIFY"));
    };
    Ok(Statement::AlterTable { table, op })
}

fn parse_drop(cur: &mut Cursor) -> DbResult<Statement> {
    if cur.eat_keyword("TABLE") {
        let if_exists = if cur.eat_keyword("IF") {
            cur.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        let name = cur.identifier("table name")?;
        return Ok(Statement::DropTable { name, if_exists });
    }
    if cur.eat_keyword("INDEX") {
        let name = cur.identifier("index name")?;
        return Ok(Statement::DropIndex { name });
    }
    Err(cur.unexpected("TABLE or INDEX"))
}

fn parse_insert(cur: &mut Cursor) -> DbResult<Statement> {
    cur.expect_keyword("INTO")?;
    let table = cur.identifier("table name")?;
    if cur.eat_keyword("VALUES") {
        let values = cur.paren_list(parse_literal)?;
        return Ok(Statement::Insert { table, columns: None, values });
    }
    let first = cur.paren_list(parse_literal)?;
    if !cur.eat_keyword("VALUES") {
        return Ok(Statement::Insert { table, columns: None, values: first });
    }
    let columns = first
        .into_iter()
        .map(|lit| match lit {
            Literal::Bare(name) if !is_reserved(&name) => Ok(name),
            other => Err(DbError::Parse(format!("expected column name, found {:?}", other))),
        })
        .collect::<DbResult<Vec<_>>>()?;
    let values = cur.paren_list(parse_literal)?;
    Ok(Statement::Insert { table, columns: Some(columns), values })
}

fn parse_operand(cur: &mut Cursor) -> DbResult<Operand> {
    Ok(match parse_literal(cur)? {
        Literal::Bare(name) => Operand::Column(name),
        lit => Operand::Literal(lit),
    })
}

fn parse_set_expr(cur: &mut Cursor) -> DbResult<SetExpr> {
    let left = parse_operand(cur)?;
    let op = match cur.peek() {
        Some(Token::Plus) => ArithOp::Add,
        Some(Token::Minus) => ArithOp::Sub,
        Some(Token::Star) => ArithOp::Mul,
        Some(Token::Slash) => ArithOp::Div,
        _ => return Ok(SetExpr::Operand(left)),
    };
    cur.advance();
    let right = parse_operand(cur)?;
    Ok(SetExpr::Binary { left, op, right })
}

fn parse_update(cur: &mut Cursor) -> DbResult<Statement> {
    let table = cur.identifier("table name")?;
    cur.expect_keyword("SET")?;
    let mut assignments = Vec::new();
    loop {
        let column = cur.identifier("column name")?;
        cur.expect(&Token::Eq, "'='")?;
        assignments.push((column, parse_set_expr(cur)?));
        if !cur.eat(&Token::Comma) {
            break;
        }
    }
    let selection = if cur.eat_keyword("WHERE") { Some(parse_condition(cur)?) } else { None };
    Ok(Statement::Update { table, assignments, selection })
}

fn parse_delete(cur: &mut Cursor) -> DbResult<Statement> {
    cur.expect_keyword("FROM")?;
    let table = cur.identifier("table name")?;
    let selection = if cur.eat_keyword("WHERE") { Some(parse_condition(cur)?) } else { None };
    Ok(Statement::Delete { table, selection })
}

fn parse_alias(cur: &mut Cursor) -> DbResult<Option<String>> {
    if cur.eat_keyword("AS") {
        return cur.identifier("alias").map(Some);
    }
    match cur.peek() {
        Some(Token::Word(w)) if !is_reserved(w) => {
            let alias = w.clone();
            cur.advance();
            Ok(Some(alias))
        }
        _ => Ok(None),
    }
}

/// `FUNC(` lookahead, without consuming anything.
pub(crate) fn peek_aggregate(cur: &Cursor) -> Option<AggFunc> {
    match (cur.peek(), cur.peek_at(1)) {
        (Some(Token::Word(w)), Some(Token::LParen)) => AggFunc::from_name(w),
        _ => None,
    }
}

/// `FUNC(*)` or `FUNC(col)`; only COUNT accepts `*`.
pub(crate) fn parse_aggregate_call(cur: &mut Cursor, func: AggFunc) -> DbResult<Option<String>> {
    cur.advance();
    cur.expect(&Token::LParen, "'('")?;
    let arg = if cur.eat(&Token::Star) {
        if func != AggFunc::Count {
            return Err(DbError::Parse(format!("{}(*) is not supported", func.as_str())));
        }
        None
    } else {
        Some(cur.identifier("aggregate argument")?)
    };
    cur.expect(&Token::RParen, "')'")?;
    Ok(arg)
}

fn parse_select_item(cur: &mut Cursor) -> DbResult<SelectItem> {
    if let Some(func) = peek_aggregate(cur) {
        let arg = parse_aggregate_call(cur, func)?;
        let alias = parse_alias(cur)?;
        return Ok(SelectItem::Aggregate { func, arg, alias });
    }
    let name = cur.identifier("column name")?;
    let alias = parse_alias(cur)?;
    Ok(SelectItem::Column { name, alias })
}

fn parse_table_ref(cur: &mut Cursor) -> DbResult<TableRef> {
    let name = cur.identifier("table name")?;
    let alias = parse_alias(cur)?;
    Ok(TableRef { name, alias })
}

fn parse_count(cur: &mut Cursor, clause: &str) -> DbResult<usize> {
    match cur.advance() {
        Some(Token::Number(n)) => n
            .parse::<usize>()
            .map_err(|_| DbError::Parse(format!("{} must be a non-negative integer, got '{}'", clause, n))),
        other => Err(DbError::Parse(format!("expected integer after {}, found {}", clause, describe(other.as_ref())))),
    }
}

fn parse_select(cur: &mut Cursor) -> DbResult<SelectStatement> {
    let distinct = cur.eat_keyword("DISTINCT");
    let columns = if cur.eat(&Token::Star) {
        vec![SelectItem::All]
    } else {
        let mut items = vec![parse_select_item(cur)?];
        while cur.eat(&Token::Comma) {
            items.push(parse_select_item(cur)?);
        }
        items
    };
    if !cur.eat_keyword("FROM") {
        return Err(DbError::Parse(format!("missing FROM clause, found {}", describe(cur.peek()))));
    }
    let mut from = vec![parse_table_ref(cur)?];
    while cur.eat(&Token::Comma) {
        from.push(parse_table_ref(cur)?);
    }
    let mut joins = Vec::new();
    loop {
        let inner = cur.eat_keyword("INNER");
        if !cur.eat_keyword("JOIN") {
            if inner {
                return Err(cur.unexpected("JOIN"));
            }
            break;
        }
        let table = parse_table_ref(cur)?;
        if !cur.eat_keyword("ON") {
            return Err(DbError::Parse(format!("JOIN {} requires an ON condition", table.name)));
        }
        let on = parse_condition(cur)?;
        joins.push(Join { table, on });
    }

    let selection = if cur.eat_keyword("WHERE") { Some(parse_condition(cur)?) } else { None };
    let mut group_by = Vec::new();
    if cur.eat_keyword("GROUP") {
        cur.expect_keyword("BY")?;
        group_by.push(cur.identifier("grouping column")?);
        while cur.eat(&Token::Comma) {
            group_by.push(cur.identifier("grouping column")?);
        }
    }
    let having = if cur.eat_keyword("HAVING") { Some(parse_condition(cur)?) } else { None };
    let mut order_by = Vec::new();
    if cur.eat_keyword("ORDER") {
        cur.expect_keyword("BY")?;
        loop {
            let column = match peek_aggregate(cur) {
                Some(func) => {
                    let arg = parse_aggregate_call(cur, func)?;
                    aggregate_name(func, arg.as_deref())
                }
                None => cur.identifier("ORDER BY column")?,
            };
            let descending = if cur.eat_keyword("DESC") {
                true
            } else {
                cur.eat_keyword("ASC");
                false
            };
            order_by.push(OrderBy { column, descending });
            if !cur.eat(&Token::Comma) {
                break;
            }
        }
    }
    let limit = if cur.eat_keyword("LIMIT") { Some(parse_count(cur, "LIMIT")?) } else { None };
    let offset = if cur.eat_keyword("OFFSET") { Some(parse_count(cur, "OFFSET")?) } else { None };

    Ok(SelectStatement {
        distinct,
        columns,
        from,
        joins,
        selection,
        group_by,
        having,
        order_by,
        limit,
        offset,
    })
}
