//! Physical plan nodes
//!
//! An `Operator` is an immutable node in a physical plan tree; `cursor()`
//! instantiates its runtime form. One operator can spawn many cursors over
//! its lifetime (a nested loop opens a fresh inner cursor per outer row),
//! so operators hold no execution state.

use crate::context::QueryContext;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::exec::expression::Expression;
use crate::exec::filter::SelectCursor;
use crate::exec::join::NestedLoopJoinCursor;
use crate::exec::limit::LimitCursor;
use crate::exec::lookup::LookupCursor;
use crate::exec::project::ProjectCursor;
use crate::exec::scan::GroupScanCursor;
use crate::exec::subquery::ScalarSubqueryCursor;
use crate::types::{GroupId, RowType, Schema, TableId};
use std::sync::Arc;

/// What a lookup navigates to, relative to each input row's HKey
#[derive(Debug, Clone, PartialEq)]
pub enum LookupTarget {
    /// The row of the named ancestor table (fetch by HKey prefix)
    Ancestor(TableId),
    /// Every row under the input row's HKey (branch scan)
    Descendants,
}

/// A node of a physical plan tree
#[derive(Debug)]
pub enum Operator {
    /// Full traversal of a group in HKey order
    GroupScan { group: GroupId },

    /// Per input row, navigate within the group hierarchy
    Lookup {
        input: Arc<Operator>,
        group: GroupId,
        target: LookupTarget,
        keep_input: bool,
    },

    /// Emit input rows whose predicate evaluates to TRUE
    Select {
        input: Arc<Operator>,
        predicate: Expression,
    },

    /// Evaluate expressions per input row into a derived row
    Project {
        input: Arc<Operator>,
        expressions: Vec<Expression>,
        row_type: Arc<RowType>,
    },

    /// Bind each outer row at a position, re-drive the inner subtree,
    /// emit outer ++ inner
    NestedLoopJoin {
        outer: Arc<Operator>,
        inner: Arc<Operator>,
        binding_position: usize,
        row_type: Arc<RowType>,
    },

    /// Per input row, evaluate a correlated subquery to a single scalar
    /// appended to the input row. Zero subquery rows yield NULL; more than
    /// one row is an error.
    ScalarSubquery {
        input: Arc<Operator>,
        subquery: Arc<Operator>,
        binding_position: usize,
        row_type: Arc<RowType>,
    },

    /// Emit at most `limit` input rows
    Limit { input: Arc<Operator>, limit: usize },
}

impl Operator {
    /// Instantiate the cursor tree for this plan subtree
    pub fn cursor(&self) -> Box<dyn Cursor> {
        match self {
            Operator::GroupScan { group } => Box::new(GroupScanCursor::new(*group)),

            Operator::Lookup {
                input,
                group,
                target,
                keep_input,
            } => Box::new(LookupCursor::new(
                input.cursor(),
                *group,
                target.clone(),
                *keep_input,
            )),

            Operator::Select { input, predicate } => {
                Box::new(SelectCursor::new(input.cursor(), predicate.clone()))
            }

            Operator::Project {
                input,
                expressions,
                row_type,
            } => Box::new(ProjectCursor::new(
                input.cursor(),
                expressions.clone(),
                row_type.clone(),
            )),

            Operator::NestedLoopJoin {
                outer,
                inner,
                binding_position,
                row_type,
            } => Box::new(NestedLoopJoinCursor::new(
                outer.cursor(),
                inner.clone(),
                *binding_position,
                row_type.clone(),
            )),

            Operator::ScalarSubquery {
                input,
                subquery,
                binding_position,
                row_type,
            } => Box::new(ScalarSubqueryCursor::new(
                input.cursor(),
                subquery.clone(),
                *binding_position,
                row_type.clone(),
            )),

            Operator::Limit { input, limit } => {
                Box::new(LimitCursor::new(input.cursor(), *limit))
            }
        }
    }
}

/// A compiled plan: the operator tree plus the schema generation it was
/// compiled against
pub struct Plan {
    root: Arc<Operator>,
    schema_generation: u64,
}

impl Plan {
    pub fn new(root: Operator, schema: &Schema) -> Self {
        Self {
            root: Arc::new(root),
            schema_generation: schema.generation(),
        }
    }

    pub fn root(&self) -> &Arc<Operator> {
        &self.root
    }

    /// Instantiate the root cursor, refusing to run against a schema
    /// generation other than the one the plan was compiled for
    pub fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        ctx.check_schema_generation(self.schema_generation)?;
        Ok(self.root.cursor())
    }
}
