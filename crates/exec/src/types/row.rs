//! Rows and RowTypes
//!
//! A `RowType` is a schema-level shape descriptor, created once and shared
//! read-only; equality is by identity (the id handed out by `Schema`), not
//! structure. A `Row` is a reference-counted tuple of values tagged with
//! its RowType and, for base rows, the HKey addressing it in its group.

use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::types::schema::TableId;
use crate::types::{DataType, Value};
use std::fmt;
use std::sync::Arc;

/// Discriminates how a RowType came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTypeKind {
    /// Rows of a base table in a group
    Base,
    /// Rows produced by an operator (project, join)
    Derived,
    /// Rows of a virtual or memory table with no backing storage
    Synthetic,
}

/// Immutable schema-level row shape descriptor
#[derive(Debug)]
pub struct RowType {
    id: u64,
    kind: RowTypeKind,
    table: Option<TableId>,
    name: String,
    columns: Vec<DataType>,
}

impl RowType {
    pub(crate) fn new(
        id: u64,
        kind: RowTypeKind,
        table: Option<TableId>,
        name: String,
        columns: Vec<DataType>,
    ) -> Self {
        Self {
            id,
            kind,
            table,
            name,
            columns,
        }
    }

    pub fn kind(&self) -> RowTypeKind {
        self.kind
    }

    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[DataType] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RowType {}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

struct RowInner {
    row_type: Arc<RowType>,
    values: Vec<Value>,
    hkey: Option<HKey>,
}

/// A single row. Cloning is cheap (Arc); rows are logically immutable once
/// handed downstream.
#[derive(Clone)]
pub struct Row {
    inner: Arc<RowInner>,
}

impl Row {
    /// A base-table (or synthetic-table) row with its HKey
    pub fn base(row_type: Arc<RowType>, values: Vec<Value>, hkey: HKey) -> Self {
        debug_assert_eq!(row_type.arity(), values.len());
        Self {
            inner: Arc::new(RowInner {
                row_type,
                values,
                hkey: Some(hkey),
            }),
        }
    }

    /// A derived row (projected, joined); carries no HKey
    pub fn derived(row_type: Arc<RowType>, values: Vec<Value>) -> Self {
        debug_assert_eq!(row_type.arity(), values.len());
        Self {
            inner: Arc::new(RowInner {
                row_type,
                values,
                hkey: None,
            }),
        }
    }

    pub fn value(&self, column: usize) -> Result<&Value> {
        self.inner
            .values
            .get(column)
            .ok_or(Error::ColumnOutOfRange(column))
    }

    pub fn values(&self) -> &[Value] {
        &self.inner.values
    }

    pub fn row_type(&self) -> &Arc<RowType> {
        &self.inner.row_type
    }

    /// The row's position in its group; `None` for derived rows
    pub fn hkey(&self) -> Option<&HKey> {
        self.inner.hkey.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.inner.values.len()
    }

    /// Fail fast if this row is not of the expected type. Operators call
    /// this where a type mismatch indicates a broken plan, not bad data.
    pub fn check_type(&self, expected: &Arc<RowType>) -> Result<()> {
        if self.inner.row_type == *expected {
            Ok(())
        } else {
            Err(Error::RowTypeMismatch {
                expected: expected.to_string(),
                found: self.inner.row_type.to_string(),
            })
        }
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("type", &self.inner.row_type.to_string())
            .field("values", &self.inner.values)
            .field("hkey", &self.inner.hkey)
            .finish()
    }
}
