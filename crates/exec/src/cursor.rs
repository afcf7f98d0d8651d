//! Cursor lifecycle state machine
//!
//! Every operator cursor embeds a `CursorLifecycle` and consults it before
//! touching iteration state. Splitting ACTIVE from IDLE lets composite
//! operators see "child exhausted" without a sentinel row, and confines
//! `rebind` to points where no partial row is in flight.
//!
//! Violations are programming errors in the driver or operator tree, not
//! user-facing conditions; they surface as `Error::CursorLifecycle` so the
//! statement can be aborted and logged with operator context.

use crate::context::{QueryBindings, QueryContext};
use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::types::Row;

/// Cursor states. See the transition table on `CursorLifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Instantiated, no resources acquired
    Created,
    /// Mid-iteration: opened, and the last `next()` (if any) returned a row
    Active,
    /// Open but exhausted; `next()` returns no row until reopened or rebound
    Idle,
    /// Closed; backend resources released. May be reopened.
    Closed,
    /// Terminal; never reopenable
    Destroyed,
}

/// Checked state transitions shared by all cursor implementations.
///
/// | call      | legal from          | to                      |
/// |-----------|---------------------|-------------------------|
/// | open      | Created, Closed     | Active                  |
/// | next      | Active, Idle        | Active (row) / Idle (end)|
/// | close     | any but Destroyed   | Closed (idempotent)     |
/// | rebind    | Idle                | Idle                    |
/// | destroy   | any                 | Destroyed               |
#[derive(Debug)]
pub struct CursorLifecycle {
    state: CursorState,
}

impl CursorLifecycle {
    pub fn new() -> Self {
        Self {
            state: CursorState::Created,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn open(&mut self) -> Result<()> {
        match self.state {
            CursorState::Created | CursorState::Closed => {
                self.state = CursorState::Active;
                Ok(())
            }
            state => Err(Error::CursorLifecycle { state, call: "open" }),
        }
    }

    pub fn next(&mut self) -> Result<()> {
        match self.state {
            CursorState::Active | CursorState::Idle => Ok(()),
            state => Err(Error::CursorLifecycle { state, call: "next" }),
        }
    }

    /// Record that `next()` produced a row
    pub fn row_emitted(&mut self) {
        self.state = CursorState::Active;
    }

    /// Record that `next()` found no more rows
    pub fn exhausted(&mut self) {
        self.state = CursorState::Idle;
    }

    /// Returns `Ok(true)` when resources should actually be released,
    /// `Ok(false)` for a redundant close.
    pub fn close(&mut self) -> Result<bool> {
        match self.state {
            CursorState::Destroyed => Err(Error::CursorLifecycle {
                state: CursorState::Destroyed,
                call: "close",
            }),
            CursorState::Closed => Ok(false),
            _ => {
                self.state = CursorState::Closed;
                Ok(true)
            }
        }
    }

    pub fn rebind(&mut self) -> Result<()> {
        match self.state {
            CursorState::Idle => Ok(()),
            state => Err(Error::CursorLifecycle {
                state,
                call: "rebind",
            }),
        }
    }

    pub fn destroy(&mut self) {
        self.state = CursorState::Destroyed;
    }
}

impl Default for CursorLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// The uniform iterator contract every operator cursor implements.
///
/// Context and bindings are threaded through `open`/`next` rather than
/// captured at construction, so cursor trees own no borrows and the same
/// operator can spawn cursors for every outer-loop pulse of a join.
pub trait Cursor {
    fn open(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<()>;

    fn next(&mut self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<Option<Row>>;

    fn close(&mut self) -> Result<()>;

    /// Terminal teardown; after this the cursor is unusable
    fn destroy(&mut self);

    fn state(&self) -> CursorState;

    /// Reposition an idle cursor onto a different subtree. Optional fast
    /// path; close+reopen is the baseline-correct behavior.
    fn rebind(&mut self, hkey: &HKey, deep: bool) -> Result<()> {
        let _ = (hkey, deep);
        Err(Error::RebindUnsupported)
    }
}
