//! The line handler: parses one statement and formats a reply.
//!
//! This is the entire depth of "query processing" this crate does: the
//! query server parses statements and prints the resulting abstract syntax
//! tree; it does not touch storage. `LineHandler` is that, nothing more.

use monodb_query::{QueryError, QueryProcessor, Statement};

/// Stateless line-by-line statement handler shared by every connection.
pub struct LineHandler {
    processor: QueryProcessor,
}

impl Default for LineHandler {
    fn default() -> Self {
        LineHandler {
            processor: QueryProcessor::new(),
        }
    }
}

impl LineHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `line` and returns the text to write back to the client: the
    /// debug-formatted AST on success, or `ERROR: <message>` on a parse
    /// failure. Never panics on malformed input — a bad line is the
    /// client's problem, not the server's.
    pub fn handle_line(&self, line: &str) -> String {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        match monodb_query::parse(trimmed) {
            Ok(statement) => self.describe(&statement),
            Err(err) => format_error(&err),
        }
    }

    fn describe(&self, statement: &Statement) -> String {
        let outcome = self.processor.process(statement);
        format!("{statement:?} -> {outcome:?}")
    }
}

fn format_error(err: &QueryError) -> String {
    format!("ERROR: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_statement_echoes_its_ast() {
        let handler = LineHandler::new();
        let reply = handler.handle_line("TELL users TO ADD RECORD WITH id = 1");
        assert!(reply.contains("AddRecord"));
        assert!(reply.contains("Unimplemented"));
    }

    #[test]
    fn malformed_statement_reports_an_error_line() {
        let handler = LineHandler::new();
        let reply = handler.handle_line("NOT A STATEMENT");
        assert!(reply.starts_with("ERROR:"));
    }

    #[test]
    fn blank_line_produces_no_reply() {
        let handler = LineHandler::new();
        assert_eq!(handler.handle_line("   "), "");
    }
}
