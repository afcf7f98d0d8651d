//! Column data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data types supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    I32,
    I64,
    F64,
    Decimal,
    Str,
    Date,
    Timestamp,
    Uuid,
    Bytea,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "BOOLEAN",
            DataType::I32 => "INT",
            DataType::I64 => "BIGINT",
            DataType::F64 => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Str => "TEXT",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Uuid => "UUID",
            DataType::Bytea => "BYTEA",
        };
        write!(f, "{}", name)
    }
}
