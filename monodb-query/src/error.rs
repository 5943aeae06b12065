//! Lexer and parser errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("unexpected token {found:?}, expected {expected}")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("unknown column type {0:?} (expected BOOLEAN, INTEGER, or TEXT)")]
    UnknownColumnType(String),

    #[error("unknown action after ADD (expected RECORD or a column name)")]
    UnknownAction,
}
