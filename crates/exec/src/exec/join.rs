//! Nested loop join cursor
//!
//! Per outer row: bind it at the join's binding position, open a fresh
//! inner cursor, and emit outer ++ inner for every inner row. Inner plan
//! subtrees see the outer row through `BoundField` expressions, so any
//! operator tree works on the inner side.

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::exec::operator::Operator;
use crate::types::{Row, RowType};
use std::sync::Arc;

pub struct NestedLoopJoinCursor {
    outer: Box<dyn Cursor>,
    inner_plan: Arc<Operator>,
    binding_position: usize,
    row_type: Arc<RowType>,
    lifecycle: CursorLifecycle,
    inner: Option<Box<dyn Cursor>>,
    current_outer: Option<Row>,
}

impl NestedLoopJoinCursor {
    pub fn new(
        outer: Box<dyn Cursor>,
        inner_plan: Arc<Operator>,
        binding_position: usize,
        row_type: Arc<RowType>,
    ) -> Self {
        Self {
            outer,
            inner_plan,
            binding_position,
            row_type,
            lifecycle: CursorLifecycle::new(),
            inner: None,
            current_outer: None,
        }
    }

    fn release(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.destroy();
        }
        self.current_outer = None;
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }

    fn combined(&self, outer: &Row, inner: &Row) -> Row {
        let mut values = Vec::with_capacity(outer.arity() + inner.arity());
        values.extend_from_slice(outer.values());
        values.extend_from_slice(inner.values());
        Row::derived(self.row_type.clone(), values)
    }
}

impl Cursor for NestedLoopJoinCursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        self.current_outer = None;
        match self.outer.open(ctx, bindings) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        loop {
            if let Some(inner) = self.inner.as_mut() {
                match inner.next(ctx, bindings) {
                    Ok(Some(inner_row)) => {
                        // current_outer is always set while an inner cursor
                        // is live
                        let outer_row = match self.current_outer.clone() {
                            Some(row) => row,
                            None => {
                                let e = Error::InvalidValue(
                                    "join inner cursor live without an outer row".into(),
                                );
                                return Err(self.abort(e));
                            }
                        };
                        let combined = self.combined(&outer_row, &inner_row);
                        self.lifecycle.row_emitted();
                        return Ok(Some(combined));
                    }
                    Ok(None) => {
                        if let Some(mut inner) = self.inner.take() {
                            if let Err(e) = inner.close() {
                                return Err(self.abort(e));
                            }
                        }
                        self.current_outer = None;
                    }
                    Err(e) => return Err(self.abort(e)),
                }
                continue;
            }

            let outer_row = match self.outer.next(ctx, bindings) {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.lifecycle.exhausted();
                    return Ok(None);
                }
                Err(e) => return Err(self.abort(e)),
            };
            bindings.set_row(self.binding_position, outer_row.clone());
            let mut inner = self.inner_plan.cursor();
            if let Err(e) = inner.open(ctx, bindings) {
                return Err(self.abort(e));
            }
            self.inner = Some(inner);
            self.current_outer = Some(outer_row);
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.lifecycle.close()? {
            // Close every child before reporting; the first error wins
            let inner_result = match self.inner.take() {
                Some(mut inner) => inner.close(),
                None => Ok(()),
            };
            self.current_outer = None;
            let outer_result = self.outer.close();
            inner_result?;
            outer_result?;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.release();
        self.outer.destroy();
        self.lifecycle.destroy();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::row::RowTypeKind;
    use crate::types::GroupId;
    use std::cell::Cell;
    use std::rc::Rc;

    struct RecordingCursor {
        lifecycle: CursorLifecycle,
        fail_close: bool,
        closed: Rc<Cell<bool>>,
    }

    impl RecordingCursor {
        fn new(fail_close: bool, closed: Rc<Cell<bool>>) -> Self {
            Self {
                lifecycle: CursorLifecycle::new(),
                fail_close,
                closed,
            }
        }
    }

    impl Cursor for RecordingCursor {
        fn open(&mut self, _: &QueryContext, _: &mut QueryBindings) -> Result<()> {
            self.lifecycle.open()
        }

        fn next(&mut self, _: &QueryContext, _: &mut QueryBindings) -> Result<Option<Row>> {
            self.lifecycle.next()?;
            self.lifecycle.exhausted();
            Ok(None)
        }

        fn close(&mut self) -> Result<()> {
            if self.lifecycle.close()? {
                if self.fail_close {
                    return Err(Error::Storage("close failed".into()));
                }
                self.closed.set(true);
            }
            Ok(())
        }

        fn destroy(&mut self) {
            self.lifecycle.destroy();
        }

        fn state(&self) -> CursorState {
            self.lifecycle.state()
        }
    }

    #[test]
    fn test_close_reaches_outer_when_inner_close_fails() {
        let outer_closed = Rc::new(Cell::new(false));
        let row_type = Arc::new(RowType::new(
            1,
            RowTypeKind::Derived,
            None,
            "j".into(),
            Vec::new(),
        ));
        let mut join = NestedLoopJoinCursor::new(
            Box::new(RecordingCursor::new(false, outer_closed.clone())),
            Arc::new(Operator::GroupScan { group: GroupId(0) }),
            0,
            row_type,
        );
        join.lifecycle.open().unwrap();

        // A live inner cursor whose close fails
        let mut inner = RecordingCursor::new(true, Rc::new(Cell::new(false)));
        inner.lifecycle.open().unwrap();
        join.inner = Some(Box::new(inner));

        assert!(matches!(join.close(), Err(Error::Storage(_))));
        assert!(
            outer_closed.get(),
            "outer must still be closed after the inner close failure"
        );
        assert_eq!(join.state(), CursorState::Closed);
    }
}
