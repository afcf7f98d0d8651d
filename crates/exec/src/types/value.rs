//! SQL values and type-aware comparison

use crate::error::{Error, Result};
use crate::types::DataType;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// SQL values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    Str(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Bytea(Vec<u8>),
}

impl Value {
    /// Create an I64 value (most common integer type)
    pub fn integer(i: i64) -> Self {
        Value::I64(i)
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create a boolean value
    pub fn boolean(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The data type of this value, if it has one (NULL is untyped)
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::I32(_) => Some(DataType::I32),
            Value::I64(_) => Some(DataType::I64),
            Value::F64(_) => Some(DataType::F64),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Str(_) => Some(DataType::Str),
            Value::Date(_) => Some(DataType::Date),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Uuid(_) => Some(DataType::Uuid),
            Value::Bytea(_) => Some(DataType::Bytea),
        }
    }

    /// Interpret this value as a boolean, if possible
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Bytea(b) => {
                write!(f, "\\x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Compare two values with type-aware semantics.
///
/// NULL sorts before any value; mixed numeric types are widened before
/// comparison; NaN sorts after all regular numbers and two NaNs compare
/// equal (stable ordering for sorts, not SQL equality).
pub fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Less),
        (_, Value::Null) => Ok(Ordering::Greater),

        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),

        (Value::I32(a), Value::I32(b)) => Ok(a.cmp(b)),
        (Value::I64(a), Value::I64(b)) => Ok(a.cmp(b)),
        (Value::I32(a), Value::I64(b)) => Ok((*a as i64).cmp(b)),
        (Value::I64(a), Value::I32(b)) => Ok(a.cmp(&(*b as i64))),

        (Value::F64(a), Value::F64(b)) => Ok(compare_f64(*a, *b)),
        (Value::I32(a), Value::F64(b)) => Ok(compare_f64(*a as f64, *b)),
        (Value::I64(a), Value::F64(b)) => Ok(compare_f64(*a as f64, *b)),
        (Value::F64(a), Value::I32(b)) => Ok(compare_f64(*a, *b as f64)),
        (Value::F64(a), Value::I64(b)) => Ok(compare_f64(*a, *b as f64)),

        (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
        (Value::Decimal(a), Value::I32(b)) => Ok(a.cmp(&Decimal::from(*b))),
        (Value::Decimal(a), Value::I64(b)) => Ok(a.cmp(&Decimal::from(*b))),
        (Value::I32(a), Value::Decimal(b)) => Ok(Decimal::from(*a).cmp(b)),
        (Value::I64(a), Value::Decimal(b)) => Ok(Decimal::from(*a).cmp(b)),
        (Value::Decimal(a), Value::F64(b)) => match Decimal::from_f64(*b) {
            Some(d) => Ok(a.cmp(&d)),
            None => Ok(compare_f64(a.to_f64().unwrap_or(f64::NAN), *b)),
        },
        (Value::F64(a), Value::Decimal(b)) => match Decimal::from_f64(*a) {
            Some(d) => Ok(d.cmp(b)),
            None => Ok(compare_f64(*a, b.to_f64().unwrap_or(f64::NAN))),
        },

        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Ok(a.cmp(b)),
        (Value::Bytea(a), Value::Bytea(b)) => Ok(a.cmp(b)),

        (l, r) => Err(Error::TypeMismatch {
            expected: l
                .data_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "NULL".into()),
            found: r
                .data_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "NULL".into()),
        }),
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        None => {
            if a.is_nan() && b.is_nan() {
                Ordering::Equal
            } else if a.is_nan() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
    }
}

/// Compare two composite keys column by column
pub fn compare_composite(left: &[Value], right: &[Value]) -> Result<Ordering> {
    for (l, r) in left.iter().zip(right.iter()) {
        match compare(l, r)? {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(left.len().cmp(&right.len()))
}
