//! Physical execution engine for hierarchically clustered tables
//!
//! Tables are clustered into groups: a parent row and its descendant rows
//! are interleaved in storage, ordered by hierarchical keys (HKeys) whose
//! byte encoding makes an ancestor's key a prefix of every descendant's.
//! Plans are trees of [`exec::Operator`] nodes; executing one instantiates
//! a tree of [`cursor::Cursor`]s that pull rows from a [`store::StoreAdapter`]
//! backend (persistent, memory, or virtual).
//!
//! The engine executes plans it is handed; parsing, optimization, and
//! transaction control live upstream.

pub mod context;
pub mod cursor;
pub mod error;
pub mod exec;
pub mod hkey;
pub mod pool;
pub mod store;
pub mod types;

pub use context::{BindingValue, QueryBindings, QueryContext, TransactionHandle};
pub use cursor::{Cursor, CursorLifecycle, CursorState};
pub use error::{Error, Result};
pub use exec::{Expression, LookupTarget, Operator, Plan};
pub use hkey::HKey;
pub use pool::{Pool, Shared};
pub use store::{GroupScan, StoreAdapter};
pub use types::{DataType, Row, RowType, RowTypeKind, Schema, SchemaBuilder, Value};
