//! The processor stub: a deliberately shallow collaborator that will,
//! eventually, hand mutation descriptors to the WAL. It does not touch
//! storage.

use crate::ast::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorOutcome {
    Unimplemented,
}

#[derive(Debug, Default)]
pub struct QueryProcessor;

impl QueryProcessor {
    pub fn new() -> Self {
        QueryProcessor
    }

    pub fn process(&self, statement: &Statement) -> ProcessorOutcome {
        tracing::info!(table = %statement.table, action = ?statement.action, "received statement");
        ProcessorOutcome::Unimplemented
    }
}
