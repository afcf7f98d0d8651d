//! Lookup cursor: hierarchy navigation by HKey arithmetic
//!
//! Per input row, navigates the group hierarchy without a comparison join:
//! an ancestor's HKey is a prefix of the input row's HKey (one point
//! fetch), and a branch's rows all share the input row's HKey as prefix
//! (one range scan). A branch scan also returns the input row itself; it
//! is skipped so `Descendants` means strictly below.

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::exec::operator::LookupTarget;
use crate::store::GroupScan;
use crate::types::{GroupId, Row};
use std::collections::VecDeque;

pub struct LookupCursor {
    input: Box<dyn Cursor>,
    group: GroupId,
    target: LookupTarget,
    keep_input: bool,
    lifecycle: CursorLifecycle,
    // Rows ready to emit before pulling the next input row
    queue: VecDeque<Row>,
    // In-flight branch scan for a Descendants target
    scan: Option<Box<dyn GroupScan>>,
    // Encoded HKey of the row the branch scan must not re-emit
    skip_exact: Option<Vec<u8>>,
}

impl LookupCursor {
    pub fn new(
        input: Box<dyn Cursor>,
        group: GroupId,
        target: LookupTarget,
        keep_input: bool,
    ) -> Self {
        Self {
            input,
            group,
            target,
            keep_input,
            lifecycle: CursorLifecycle::new(),
            queue: VecDeque::new(),
            scan: None,
            skip_exact: None,
        }
    }

    fn release(&mut self) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        self.queue.clear();
        self.skip_exact = None;
    }

    fn abort(&mut self, e: Error) -> Error {
        let _ = self.close();
        e
    }

    /// Queue the rows this input row navigates to, or start its branch scan
    fn advance(&mut self, ctx: &QueryContext, row: Row) -> Result<()> {
        let hkey = row
            .hkey()
            .ok_or_else(|| Error::InvalidValue("lookup input row carries no HKey".into()))?
            .clone();

        match &self.target {
            LookupTarget::Ancestor(table) => {
                let depth = ctx.schema().table(*table)?.depth;
                if hkey.segments().len() <= depth {
                    return Err(Error::InvalidValue(format!(
                        "lookup input row is not beneath table {}",
                        table
                    )));
                }
                let ancestor_key = hkey.prefix(depth + 1);
                if let Some(ancestor) = ctx.adapter().fetch(ctx, self.group, &ancestor_key)? {
                    self.queue.push_back(ancestor);
                }
                if self.keep_input {
                    self.queue.push_back(row);
                }
            }
            LookupTarget::Descendants => {
                if self.keep_input {
                    self.queue.push_back(row);
                }
                self.skip_exact = Some(hkey.encoded().to_vec());
                self.scan = Some(ctx.adapter().branch_scan(ctx, self.group, &hkey)?);
            }
        }
        Ok(())
    }
}

impl Cursor for LookupCursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        self.queue.clear();
        match self.input.open(ctx, bindings) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        loop {
            if let Some(row) = self.queue.pop_front() {
                self.lifecycle.row_emitted();
                return Ok(Some(row));
            }

            if let Some(scan) = self.scan.as_mut() {
                match scan.next() {
                    Ok(Some(row)) => {
                        let is_input_row = match (&self.skip_exact, row.hkey()) {
                            (Some(skip), Some(k)) => k.encoded() == &skip[..],
                            _ => false,
                        };
                        if is_input_row {
                            continue;
                        }
                        self.lifecycle.row_emitted();
                        return Ok(Some(row));
                    }
                    Ok(None) => {
                        self.scan = None;
                        self.skip_exact = None;
                    }
                    Err(e) => return Err(self.abort(e)),
                }
                continue;
            }

            let row = match self.input.next(ctx, bindings) {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.lifecycle.exhausted();
                    return Ok(None);
                }
                Err(e) => return Err(self.abort(e)),
            };
            if let Err(e) = self.advance(ctx, row) {
                return Err(self.abort(e));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.lifecycle.close()? {
            self.release();
            self.input.close()?;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.release();
        self.input.destroy();
        self.lifecycle.destroy();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }
}
