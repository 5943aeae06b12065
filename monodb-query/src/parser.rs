//! Recursive-descent parser over the token stream produced by [`crate::lexer`].

use crate::ast::{Action, Assignment, ColumnType, Literal, Statement};
use crate::error::QueryError;
use crate::lexer::Token;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), QueryError> {
        match self.advance() {
            Some(Token::Ident(text)) if text == keyword => Ok(()),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: keyword,
                found: format!("{other:?}"),
            }),
            None => Err(QueryError::UnexpectedEof { expected: keyword }),
        }
    }

    fn expect_ident(&mut self, what: &'static str) -> Result<String, QueryError> {
        match self.advance() {
            Some(Token::Ident(text)) => Ok(text.clone()),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: what,
                found: format!("{other:?}"),
            }),
            None => Err(QueryError::UnexpectedEof { expected: what }),
        }
    }

    fn peek_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(text)) if text == keyword)
    }

    fn parse_literal(&mut self) -> Result<Literal, QueryError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Literal::Number(*n)),
            Some(Token::Str(s)) => Ok(Literal::Text(s.clone())),
            Some(Token::Ident(text)) if text == "TRUE" => Ok(Literal::Bool(true)),
            Some(Token::Ident(text)) if text == "FALSE" => Ok(Literal::Bool(false)),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: "a literal (number, string, TRUE, or FALSE)",
                found: format!("{other:?}"),
            }),
            None => Err(QueryError::UnexpectedEof {
                expected: "a literal",
            }),
        }
    }

    fn parse_assignment(&mut self) -> Result<Assignment, QueryError> {
        let column = self.expect_ident("a column name")?;
        match self.advance() {
            Some(Token::Eq) => {}
            Some(other) => {
                return Err(QueryError::UnexpectedToken {
                    expected: "=",
                    found: format!("{other:?}"),
                })
            }
            None => return Err(QueryError::UnexpectedEof { expected: "=" }),
        }
        let value = self.parse_literal()?;
        Ok(Assignment { column, value })
    }

    fn parse_column_type(&mut self) -> Result<ColumnType, QueryError> {
        let text = self.expect_ident("BOOLEAN, INTEGER, or TEXT")?;
        match text.as_str() {
            "BOOLEAN" => Ok(ColumnType::Boolean),
            "INTEGER" => Ok(ColumnType::Integer),
            "TEXT" => Ok(ColumnType::Text),
            _ => Err(QueryError::UnknownColumnType(text)),
        }
    }

    fn parse_action(&mut self) -> Result<Action, QueryError> {
        match self.advance() {
            Some(Token::Ident(keyword)) if keyword == "ADD" => {
                if self.peek_is_keyword("RECORD") {
                    self.pos += 1;
                    self.expect_keyword("WITH")?;
                    let mut assignments = vec![self.parse_assignment()?];
                    while matches!(self.peek(), Some(Token::Comma)) {
                        self.pos += 1;
                        assignments.push(self.parse_assignment()?);
                    }
                    Ok(Action::AddRecord { assignments })
                } else if matches!(self.peek(), Some(Token::Ident(_))) {
                    let name = self.expect_ident("a column name")?;
                    self.expect_keyword("AS")?;
                    let type_name = self.parse_column_type()?;
                    let default = if self.peek_is_keyword("DEFAULT") {
                        self.pos += 1;
                        Some(self.parse_literal()?)
                    } else {
                        None
                    };
                    Ok(Action::AddColumn {
                        name,
                        type_name,
                        default,
                    })
                } else {
                    Err(QueryError::UnknownAction)
                }
            }
            Some(Token::Ident(keyword)) if keyword == "REMOVE" => {
                self.expect_keyword("WHERE")?;
                let assignment = self.parse_assignment()?;
                Ok(Action::RemoveWhere { assignment })
            }
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: "ADD or REMOVE",
                found: format!("{other:?}"),
            }),
            None => Err(QueryError::UnexpectedEof {
                expected: "ADD or REMOVE",
            }),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, QueryError> {
        self.expect_keyword("TELL")?;
        let table = self.expect_ident("a table name")?;
        self.expect_keyword("TO")?;
        let action = self.parse_action()?;
        Ok(Statement { table, action })
    }
}

pub fn parse_statement(tokens: &[Token]) -> Result<Statement, QueryError> {
    Parser::new(tokens).parse_statement()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Statement {
        parse_statement(&tokenize(source).unwrap()).unwrap()
    }

    #[test]
    fn parses_add_record() {
        let statement = parse("TELL users TO ADD RECORD WITH id = 1");
        assert_eq!(statement.table, "users");
        assert_eq!(
            statement.action,
            Action::AddRecord {
                assignments: vec![Assignment {
                    column: "id".into(),
                    value: Literal::Number(1)
                }]
            }
        );
    }

    #[test]
    fn parses_remove_where() {
        let statement = parse("TELL users TO REMOVE WHERE id = 1");
        assert_eq!(
            statement.action,
            Action::RemoveWhere {
                assignment: Assignment {
                    column: "id".into(),
                    value: Literal::Number(1)
                }
            }
        );
    }

    #[test]
    fn parses_add_column_with_default() {
        let statement = parse("TELL users TO ADD email_verified AS BOOLEAN DEFAULT FALSE");
        assert_eq!(
            statement.action,
            Action::AddColumn {
                name: "email_verified".into(),
                type_name: ColumnType::Boolean,
                default: Some(Literal::Bool(false)),
            }
        );
    }

    #[test]
    fn parses_add_column_without_default() {
        let statement = parse("TELL users TO ADD nickname AS TEXT");
        assert_eq!(
            statement.action,
            Action::AddColumn {
                name: "nickname".into(),
                type_name: ColumnType::Text,
                default: None,
            }
        );
    }

    #[test]
    fn parses_multiple_assignments_in_add_record() {
        let statement = parse("TELL users TO ADD RECORD WITH id = 1, name = 'Ada'");
        assert_eq!(
            statement.action,
            Action::AddRecord {
                assignments: vec![
                    Assignment {
                        column: "id".into(),
                        value: Literal::Number(1)
                    },
                    Assignment {
                        column: "name".into(),
                        value: Literal::Text("Ada".into())
                    },
                ]
            }
        );
    }

    #[test]
    fn rejects_unknown_column_type() {
        let tokens = tokenize("TELL users TO ADD foo AS FLOAT").unwrap();
        let err = parse_statement(&tokens).unwrap_err();
        assert_eq!(err, QueryError::UnknownColumnType("FLOAT".into()));
    }
}
