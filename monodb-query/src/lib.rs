//! # monodb-query
//!
//! Lexer, parser, and AST for monodb's toy table-mutation language, plus a
//! [`processor::QueryProcessor`] stub. The grammar on purpose stays small —
//! this crate hands a parsed [`ast::Statement`] to a processor that does not
//! yet touch storage; a future integration will have it hand mutation
//! descriptors to `monodb-wal`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod processor;

pub use ast::{Action, Assignment, ColumnType, Literal, Statement};
pub use error::QueryError;
pub use processor::{ProcessorOutcome, QueryProcessor};

/// Parses a single statement from its source text.
pub fn parse(source: &str) -> Result<Statement, QueryError> {
    let tokens = lexer::tokenize(source)?;
    parser::parse_statement(&tokens)
}

/// Default port the thin query server listens on.
pub const DEFAULT_PORT: u16 = 7401;
