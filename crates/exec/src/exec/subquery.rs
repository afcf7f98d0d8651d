//! Scalar subquery cursor
//!
//! Per input row, evaluates a correlated subquery to exactly one scalar:
//! the first column of its single row, NULL when it produces no rows, an
//! error when it produces more than one. Evaluation happens in a pushed
//! binding scope so subquery-local bindings never leak outward.

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::exec::operator::Operator;
use crate::types::{Row, RowType, Value};
use std::sync::Arc;

pub struct ScalarSubqueryCursor {
    input: Box<dyn Cursor>,
    subquery: Arc<Operator>,
    binding_position: usize,
    row_type: Arc<RowType>,
    lifecycle: CursorLifecycle,
}

impl ScalarSubqueryCursor {
    pub fn new(
        input: Box<dyn Cursor>,
        subquery: Arc<Operator>,
        binding_position: usize,
        row_type: Arc<RowType>,
    ) -> Self {
        Self {
            input,
            subquery,
            binding_position,
            row_type,
            lifecycle: CursorLifecycle::new(),
        }
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }
}

/// Drive a subquery cursor to completion and reduce it to one scalar
fn scalar_value(
    plan: &Operator,
    ctx: &QueryContext,
    bindings: &mut QueryBindings,
) -> Result<Value> {
    let mut cursor = plan.cursor();
    cursor.open(ctx, bindings)?;
    let value = match cursor.next(ctx, bindings) {
        Ok(None) => Ok(Value::Null),
        Ok(Some(first)) => match cursor.next(ctx, bindings) {
            Ok(None) => first.value(0).cloned(),
            Ok(Some(_)) => Err(Error::TooManyRows),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    // Close regardless of the outcome; the first error wins
    match (value, cursor.close()) {
        (Ok(v), Ok(())) => Ok(v),
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e),
    }
}

impl Cursor for ScalarSubqueryCursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        match self.input.open(ctx, bindings) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        let row = match self.input.next(ctx, bindings) {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.lifecycle.exhausted();
                return Ok(None);
            }
            Err(e) => return Err(self.abort(e)),
        };

        bindings.push_scope();
        bindings.set_row(self.binding_position, row.clone());
        let scalar = scalar_value(&self.subquery, ctx, bindings);
        bindings.pop_scope();

        match scalar {
            Ok(value) => {
                let mut values = Vec::with_capacity(row.arity() + 1);
                values.extend_from_slice(row.values());
                values.push(value);
                self.lifecycle.row_emitted();
                Ok(Some(Row::derived(self.row_type.clone(), values)))
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.lifecycle.close()? {
            self.input.close()?;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.input.destroy();
        self.lifecycle.destroy();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }
}
