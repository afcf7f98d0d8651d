//! Error types for the execution engine

use crate::cursor::CursorState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lifecycle errors. These indicate a mis-sequenced cursor driver or a
    // broken operator implementation, not a user-facing condition.
    #[error("cursor lifecycle violation: {call}() called in state {state:?}")]
    CursorLifecycle {
        state: CursorState,
        call: &'static str,
    },

    #[error("rebind is not supported by this cursor")]
    RebindUnsupported,

    // Statement-level SQL errors
    #[error("scalar subquery produced more than one row")]
    TooManyRows,

    // Plan/schema errors
    #[error("plan compiled against schema generation {plan}, execution sees generation {live}")]
    SchemaMismatch { plan: u64, live: u64 },

    #[error("row type mismatch: expected {expected}, found {found}")]
    RowTypeMismatch { expected: String, found: String },

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    // Binding errors
    #[error("binding position {0} is not set")]
    UnboundPosition(usize),

    #[error("column {0} out of range")]
    ColumnOutOfRange(usize),

    // Value errors
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    // Cancellation
    #[error("execution interrupted")]
    Interrupted,

    // Backend errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("corrupted row encoding: {0}")]
    Corrupted(String),
}

impl From<fjall::Error> for Error {
    fn from(e: fjall::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
