//! Select (filter) cursor

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::exec::expression::{evaluate, Expression};
use crate::types::{Row, Value};

pub struct SelectCursor {
    input: Box<dyn Cursor>,
    predicate: Expression,
    lifecycle: CursorLifecycle,
}

impl SelectCursor {
    pub fn new(input: Box<dyn Cursor>, predicate: Expression) -> Self {
        Self {
            input,
            predicate,
            lifecycle: CursorLifecycle::new(),
        }
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }
}

impl Cursor for SelectCursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        match self.input.open(ctx, bindings) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        loop {
            let row = match self.input.next(ctx, bindings) {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.lifecycle.exhausted();
                    return Ok(None);
                }
                Err(e) => return Err(self.abort(e)),
            };
            // TRUE passes; FALSE and NULL are both filtered out
            match evaluate(&self.predicate, Some(&row), bindings) {
                Ok(Value::Bool(true)) => {
                    self.lifecycle.row_emitted();
                    return Ok(Some(row));
                }
                Ok(Value::Bool(false)) | Ok(Value::Null) => continue,
                Ok(v) => {
                    let e = Error::TypeMismatch {
                        expected: "BOOLEAN".into(),
                        found: v
                            .data_type()
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "NULL".into()),
                    };
                    return Err(self.abort(e));
                }
                Err(e) => return Err(self.abort(e)),
            }
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
