//! Virtual store adapter
//!
//! Serves groups that have no storage at all: rows are synthesized from
//! schema metadata (catalog views, status tables) by registered factories.
//! Computed rows have no natural primary key, so the adapter assigns a
//! hidden incrementing key; downstream operators still see every row as
//! comparably identifiable.
//!
//! The registry is an explicit object owned by whoever constructs the
//! adapter, with its lifetime tied to schema (re)load, not the process.

use crate::context::QueryContext;
use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::store::{GroupScan, StoreAdapter};
use crate::types::{GroupId, Row, RowType, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Synthesizes one virtual group's rows from schema metadata
pub trait VirtualGroupFactory: Send + Sync {
    fn rows(&self, ctx: &QueryContext) -> Result<Vec<Vec<Value>>>;
}

struct VirtualEntry {
    row_type: Arc<RowType>,
    factory: Arc<dyn VirtualGroupFactory>,
}

/// Store adapter for purely computed tables
pub struct VirtualStore {
    entries: RwLock<HashMap<u32, VirtualEntry>>,
    next_hidden_key: AtomicU64,
}

impl VirtualStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
            next_hidden_key: AtomicU64::new(1),
        })
    }

    /// Register a virtual group: the synthetic RowType its rows carry and
    /// the factory that computes them
    pub fn register(
        &self,
        group: GroupId,
        row_type: Arc<RowType>,
        factory: Arc<dyn VirtualGroupFactory>,
    ) {
        self.entries
            .write()
            .insert(group.0, VirtualEntry { row_type, factory });
    }

    fn synthesize(&self, ctx: &QueryContext, group: GroupId) -> Result<Vec<Row>> {
        let (row_type, factory) = {
            let entries = self.entries.read();
            let entry = entries
                .get(&group.0)
                .ok_or_else(|| Error::GroupNotFound(group.to_string()))?;
            (entry.row_type.clone(), entry.factory.clone())
        };
        let mut rows = Vec::new();
        for values in factory.rows(ctx)? {
            if values.len() != row_type.arity() {
                return Err(Error::RowTypeMismatch {
                    expected: row_type.to_string(),
                    found: format!("{}-column factory row", values.len()),
                });
            }
            // Hidden key: unique per adapter lifetime, assigned in emission
            // order so one scan's rows iterate deterministically
            let hidden = self.next_hidden_key.fetch_add(1, Ordering::Relaxed);
            let hkey = HKey::root(1, vec![Value::I64(hidden as i64)]);
            rows.push(Row::base(row_type.clone(), values, hkey));
        }
        Ok(rows)
    }
}

impl StoreAdapter for VirtualStore {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn group_scan(&self, ctx: &QueryContext, group: GroupId) -> Result<Box<dyn GroupScan>> {
        Ok(Box::new(VirtualGroupScan {
            rows: self.synthesize(ctx, group)?.into_iter(),
        }))
    }

    fn branch_scan(
        &self,
        ctx: &QueryContext,
        group: GroupId,
        prefix: &HKey,
    ) -> Result<Box<dyn GroupScan>> {
        // Hidden keys are assigned per scan, so a prefix rarely matches;
        // the contract is honored regardless.
        let rows = self
            .synthesize(ctx, group)?
            .into_iter()
            .filter(|row| row.hkey().map(|k| prefix.is_prefix_of(k)).unwrap_or(false))
            .collect::<Vec<_>>();
        Ok(Box::new(VirtualGroupScan {
            rows: rows.into_iter(),
        }))
    }
}

struct VirtualGroupScan {
    rows: std::vec::IntoIter<Row>,
}

impl GroupScan for VirtualGroupScan {
    fn next(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }

    fn close(&mut self) {}
}
