pub mod ast;
pub mod condition;
pub mod lexer;
pub mod parser;

pub use parser::parse_statement;
