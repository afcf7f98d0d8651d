//! Operator trees and their cursors
//!
//! Operators are immutable plan nodes handed over by the planner; cursors
//! are their runtime counterparts. Driving the root cursor through
//! `open → next* → close` pulls rows up from leaf group scans.

pub mod expression;
pub mod operator;

mod filter;
mod join;
mod limit;
mod lookup;
mod project;
mod scan;
mod subquery;

pub use expression::Expression;
pub use operator::{LookupTarget, Operator, Plan};
