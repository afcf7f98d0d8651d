//! Per-execution environment: QueryContext and QueryBindings
//!
//! The context is the read-only side (schema snapshot, store adapter,
//! transaction handle, interrupt flag); the bindings are the mutable side
//! (positional parameters and correlated-row slots). One context/bindings
//! pair belongs to exactly one executing statement.

use crate::error::{Error, Result};
use crate::store::StoreAdapter;
use crate::types::{Row, Schema, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Opaque handle to the external transaction/session service. The engine
/// only forwards it to the StoreAdapter; commit and rollback live outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    pub id: u64,
    pub read_timestamp: u64,
}

impl TransactionHandle {
    pub fn new(id: u64, read_timestamp: u64) -> Self {
        Self { id, read_timestamp }
    }
}

/// Immutable per-statement execution environment
pub struct QueryContext {
    schema: Arc<Schema>,
    adapter: Arc<dyn StoreAdapter>,
    txn: TransactionHandle,
    interrupt: Arc<AtomicBool>,
}

impl QueryContext {
    pub fn new(schema: Arc<Schema>, adapter: Arc<dyn StoreAdapter>, txn: TransactionHandle) -> Self {
        Self {
            schema,
            adapter,
            txn,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn adapter(&self) -> &Arc<dyn StoreAdapter> {
        &self.adapter
    }

    pub fn txn(&self) -> TransactionHandle {
        self.txn
    }

    /// Flag a session can set from another thread to cancel the statement.
    /// Leaf cursors observe it at every `next()`.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub fn check_interrupted(&self) -> Result<()> {
        if self.interrupt.load(Ordering::Relaxed) {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Fail if a plan compiled against another schema generation is being
    /// executed here; the caller should re-plan.
    pub fn check_schema_generation(&self, plan_generation: u64) -> Result<()> {
        let live = self.schema.generation();
        if plan_generation == live {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                plan: plan_generation,
                live,
            })
        }
    }
}

/// A value bound at a binding position: a statement parameter or the
/// current outer row of a nested loop.
#[derive(Debug, Clone)]
pub enum BindingValue {
    Value(Value),
    Row(Row),
}

/// Mutable slot table, scoped. Binding positions are small integers
/// assigned at plan-compile time; no name resolution happens here.
///
/// Scopes nest: reads search innermost-outward, writes always land in the
/// innermost frame. Subquery evaluation pushes a scope instead of copying
/// the whole binding set.
pub struct QueryBindings {
    frames: Vec<Vec<Option<BindingValue>>>,
}

impl QueryBindings {
    pub fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }

    /// Bindings preloaded with positional statement parameters at 0..n
    pub fn with_parameters(params: Vec<Value>) -> Self {
        Self {
            frames: vec![params.into_iter().map(BindingValue::Value).map(Some).collect()],
        }
    }

    /// Read a binding, falling through to enclosing scopes
    pub fn at(&self, position: usize) -> Result<&BindingValue> {
        for frame in self.frames.iter().rev() {
            if let Some(Some(v)) = frame.get(position) {
                return Ok(v);
            }
        }
        Err(Error::UnboundPosition(position))
    }

    pub fn value_at(&self, position: usize) -> Result<&Value> {
        match self.at(position)? {
            BindingValue::Value(v) => Ok(v),
            BindingValue::Row(_) => Err(Error::InvalidValue(format!(
                "binding position {} holds a row, not a value",
                position
            ))),
        }
    }

    pub fn row_at(&self, position: usize) -> Result<&Row> {
        match self.at(position)? {
            BindingValue::Row(r) => Ok(r),
            BindingValue::Value(_) => Err(Error::InvalidValue(format!(
                "binding position {} holds a value, not a row",
                position
            ))),
        }
    }

    pub fn set_value(&mut self, position: usize, value: Value) {
        self.set(position, BindingValue::Value(value));
    }

    /// Bind the current outer row of a nested loop before opening or
    /// rebinding the inner cursor
    pub fn set_row(&mut self, position: usize, row: Row) {
        self.set(position, BindingValue::Row(row));
    }

    fn set(&mut self, position: usize, value: BindingValue) {
        let frame = self.frames.last_mut().expect("at least one frame");
        if frame.len() <= position {
            frame.resize(position + 1, None);
        }
        frame[position] = Some(value);
    }

    /// Enter a nested binding scope (correlated subquery evaluation)
    pub fn push_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Leave the innermost scope, discarding its local writes
    pub fn pop_scope(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the root scope");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

impl Default for QueryBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_load_frame_zero() {
        let b = QueryBindings::with_parameters(vec![Value::I64(7), Value::string("x")]);
        assert_eq!(b.value_at(0).unwrap(), &Value::I64(7));
        assert_eq!(b.value_at(1).unwrap(), &Value::string("x"));
        assert!(matches!(b.at(2), Err(Error::UnboundPosition(2))));
    }

    #[test]
    fn test_reads_fall_through_writes_stay_local() {
        let mut b = QueryBindings::with_parameters(vec![Value::I64(1)]);
        b.push_scope();
        // Read falls through to the parent scope
        assert_eq!(b.value_at(0).unwrap(), &Value::I64(1));
        // Write shadows locally
        b.set_value(0, Value::I64(2));
        assert_eq!(b.value_at(0).unwrap(), &Value::I64(2));
        b.pop_scope();
        // Parent scope untouched
        assert_eq!(b.value_at(0).unwrap(), &Value::I64(1));
    }

    #[test]
    fn test_sparse_positions() {
        let mut b = QueryBindings::new();
        b.set_value(5, Value::boolean(true));
        assert!(matches!(b.at(3), Err(Error::UnboundPosition(3))));
        assert_eq!(b.value_at(5).unwrap(), &Value::Bool(true));
    }
}
