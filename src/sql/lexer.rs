use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, opt, recognize, value};
use nom::error::ErrorKind as NomErrorKind;
use nom::sequence::{pair, preceded};
use nom::{IResult, Parser};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or identifier, possibly qualified (`t.col`). Case is kept;
    /// keywords are matched case-insensitively by the parser.
    Word(String),
    /// Unsigned numeric literal as written.
    Number(String),
    /// Single-quoted string with `''` already collapsed to `'`.
    Str(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Star,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Slash,
}

impl Token {
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }
}

type Res<'a, T> = IResult<&'a str, T>;

fn whitespace(input: &str) -> Res<'_, &str> {
    multispace0(input)
}

fn word(input: &str) -> Res<'_, Token> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
        )),
        |w: &str| Token::Word(w.to_string()),
    )
    .parse(input)
}

fn number(input: &str) -> Res<'_, Token> {
    let (rest, _) = (
        take_while1(|c: char| c.is_ascii_digit()),
        opt(preceded(char('.'), take_while(|c: char| c.is_ascii_digit()))),
    )
        .parse(input)?;
    let len = input.len() - rest.len();
    Ok((rest, Token::Number(input[..len].to_string())))
}

fn quoted_chunk(input: &str) -> Res<'_, &str> {
    take_while(|c: char| c != '\'').parse(input)
}

fn open_quote(input: &str) -> Res<'_, char> {
    char('\'').parse(input)
}

fn string_literal(input: &str) -> Res<'_, Token> {
    let (mut rest, _) = open_quote(input)?;
    let mut text = String::new();
    loop {
        let (after, chunk) = quoted_chunk(rest)?;
        text.push_str(chunk);
        if let Some(after) = after.strip_prefix("''") {
            text.push('\'');
            rest = after;
        } else if let Some(after) = after.strip_prefix('\'') {
            return Ok((after, Token::Str(text)));
        } else {
            return Err(nom::Err::Failure(nom::error::Error::new(after, NomErrorKind::Char)));
        }
    }
}

fn symbol(input: &str) -> Res<'_, Token> {
    alt((
        value(Token::NotEq, alt((tag("<>"), tag("!=")))),
        value(Token::LtEq, tag("<=")),
        value(Token::GtEq, tag(">=")),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Eq, char('=')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::Comma, char(',')),
        value(Token::Semicolon, char(';')),
        value(Token::Star, char('*')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Slash, char('/')),
    ))
    .parse(input)
}

fn token(input: &str) -> Res<'_, Token> {
    alt((string_literal, number, word, symbol)).parse(input)
}

pub fn tokenize(input: &str) -> DbResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        if let Ok((after, _)) = whitespace(rest) {
            rest = after;
        }
        if rest.is_empty() {
            return Ok(tokens);
        }
        match token(rest) {
            Ok((after, tok)) => {
                tokens.push(tok);
                rest = after;
            }
            Err(nom::Err::Failure(_)) => {
                return Err(DbError::Parse("unterminated string literal".to_string()));
            }
            Err(_) => {
                let near: String = rest.chars().take(10).collect();
                return Err(DbError::Parse(format!("unexpected input near '{}'", near)));
            }
        }
    }
}
