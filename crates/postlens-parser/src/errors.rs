use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ParserAttempt {
    pub parser: &'static str,
    pub message: String,
}

impl ParserAttempt {
    pub fn new(parser: &'static str, message: impl Into<String>) -> Self {
        Self {
            parser,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParserAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parser, self.message)
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{column}' has {found} cells, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row_index} has {found} fields, header has {expected}")]
    RaggedRow {
        row_index: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{parser} format mismatch: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser} could not decode text: {message}")]
    Encoding {
        parser: &'static str,
        message: String,
    },

    #[error("{parser} CSV error: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{parser} produced an invalid table: {source}")]
    Table {
        parser: &'static str,
        #[source]
        source: TableError,
    },

    #[error("{parser} file did not contain any data rows")]
    EmptyData { parser: &'static str },
}

/// Raised only when every parser in the chain failed to produce a table with
/// at least one row and more than one column.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no parser produced a usable table; last error: {}", last_message(.attempts))]
    NoUsableTable { attempts: Vec<ParserAttempt> },
}

impl DecodeError {
    pub fn attempts(&self) -> &[ParserAttempt] {
        match self {
            DecodeError::NoUsableTable { attempts } => attempts,
        }
    }

    pub fn last_attempt(&self) -> Option<&ParserAttempt> {
        self.attempts().last()
    }
}

fn last_message(attempts: &[ParserAttempt]) -> String {
    attempts
        .last()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no parsers were configured".to_string())
}
