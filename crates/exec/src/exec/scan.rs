//! Group scan cursor: the leaf of every cursor tree
//!
//! Walks an entire group in HKey order through the context's store
//! adapter. Supports `rebind` as the fast path for index-driven drivers:
//! an idle cursor can be repositioned onto a single row or a whole branch
//! without releasing its lifecycle slot.

use crate::context::{QueryBindings, QueryContext};
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::store::GroupScan;
use crate::types::{GroupId, Row};

pub struct GroupScanCursor {
    group: GroupId,
    lifecycle: CursorLifecycle,
    scan: Option<Box<dyn GroupScan>>,
    // A rebind takes effect lazily at the following next(), which has the
    // context in hand to open the repositioned scan
    rebound: Option<(HKey, bool)>,
    fetched: Option<Row>,
}

impl GroupScanCursor {
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            lifecycle: CursorLifecycle::new(),
            scan: None,
            rebound: None,
            fetched: None,
        }
    }

    fn release(&mut self) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        self.rebound = None;
        self.fetched = None;
    }

    fn abort(&mut self, e: Error) -> Error {
        tracing::debug!(group = %self.group, error = %e, "group scan aborted");
        let _ = self.lifecycle.close();
        self.release();
        e
    }
}

impl Cursor for GroupScanCursor {
    fn open(&mut self, ctx: &QueryContext, _bindings: &mut QueryBindings) -> Result<()> {
        self.lifecycle.open()?;
        self.rebound = None;
        self.fetched = None;
        match ctx.adapter().group_scan(ctx, self.group) {
            Ok(scan) => {
                self.scan = Some(scan);
                Ok(())
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    fn next(&mut self, ctx: &QueryContext, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.lifecycle.next()?;
        if let Err(e) = ctx.check_interrupted() {
            return Err(self.abort(e));
        }

        if let Some((hkey, deep)) = self.rebound.take() {
            if let Some(mut scan) = self.scan.take() {
                scan.close();
            }
            if deep {
                match ctx.adapter().branch_scan(ctx, self.group, &hkey) {
                    Ok(scan) => self.scan = Some(scan),
                    Err(e) => return Err(self.abort(e)),
                }
            } else {
                match ctx.adapter().fetch(ctx, self.group, &hkey) {
                    Ok(row) => self.fetched = row,
                    Err(e) => return Err(self.abort(e)),
                }
            }
        }

        if let Some(row) = self.fetched.take() {
            self.lifecycle.row_emitted();
            return Ok(Some(row));
        }

        let scan = match self.scan.as_mut() {
            Some(scan) => scan,
            None => {
                self.lifecycle.exhausted();
                return Ok(None);
            }
        };
        match scan.next() {
            Ok(Some(row)) => {
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
            self.release();
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.release();
        self.lifecycle.destroy();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn rebind(&mut self, hkey: &HKey, deep: bool) -> Result<()> {
        self.lifecycle.rebind()?;
        self.rebound = Some((hkey.clone(), deep));
        self.fetched = None;
        Ok(())
    }
}
