//! Limit cursor

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::types::Row;

pub struct LimitCursor {
    input: Box<dyn Cursor>,
    limit: usize,
    emitted: usize,
    lifecycle: CursorLifecycle,
}

impl LimitCursor {
    pub fn new(input: Box<dyn Cursor>, limit: usize) -> Self {
        Self {
            input,
            limit,
            emitted: 0,
            lifecycle: CursorLifecycle::new(),
        }
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }
}

impl Cursor for LimitCursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        self.emitted = 0;
        match self.input.open(ctx, bindings) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        if self.emitted >= self.limit {
            self.lifecycle.exhausted();
            return Ok(None);
        }
        match self.input.next(ctx, bindings) {
            Ok(Some(row)) => {
                self.emitted += 1;
                self.lifecycle.row_emitted();
                Ok(Some(row))
            }
            Ok(None) => {
                self.lifecycle.exhausted();
                Ok(None)
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
