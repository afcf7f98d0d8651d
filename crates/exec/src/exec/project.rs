//! Project cursor

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::exec::expression::{evaluate, Expression};
use crate::types::{Row, RowType};
use std::sync::Arc;

pub struct ProjectCursor {
    input: Box<dyn Cursor>,
    expressions: Vec<Expression>,
    row_type: Arc<RowType>,
    lifecycle: CursorLifecycle,
}

impl ProjectCursor {
    pub fn new(input: Box<dyn Cursor>, expressions: Vec<Expression>, row_type: Arc<RowType>) -> Self {
        debug_assert_eq!(expressions.len(), row_type.arity());
        Self {
            input,
            expressions,
            row_type,
            lifecycle: CursorLifecycle::new(),
        }
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }
}

impl Cursor for ProjectCursor {
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
        let mut values = Vec::with_capacity(self.expressions.len());
        for expr in &self.expressions {
            match evaluate(expr, Some(&row), bindings) {
                Ok(v) => values.push(v),
                Err(e) => return Err(self.abort(e)),
            }
        }
        self.lifecycle.row_emitted();
        Ok(Some(Row::derived(self.row_type.clone(), values)))
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
