//! In-memory store adapter
//!
//! Groups are served by registered factories that compute rows on demand
//! from in-process data structures (session tables, monitor tables).
//! `SortedRowSet` is the common factory: a key-ordered row map with a
//! write path for loaders and tests.

use crate::context::QueryContext;
use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::store::{GroupScan, StoreAdapter};
use crate::types::{GroupId, Row};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Computes one group's rows on demand. Rows must come back in HKey order.
pub trait MemoryGroupFactory: Send + Sync {
    fn rows(&self) -> Result<Vec<Row>>;
}

/// Memory-backed store
pub struct MemoryStore {
    factories: RwLock<HashMap<u32, Arc<dyn MemoryGroupFactory>>>,
    // Scan-open counts per group, for monitoring and tests
    opens: Mutex<HashMap<u32, u64>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            factories: RwLock::new(HashMap::new()),
            opens: Mutex::new(HashMap::new()),
        })
    }

    /// Register the factory serving a group
    pub fn register(&self, group: GroupId, factory: Arc<dyn MemoryGroupFactory>) {
        self.factories.write().insert(group.0, factory);
    }

    /// Register and return a writable key-ordered row set for a group
    pub fn register_rows(&self, group: GroupId) -> Arc<SortedRowSet> {
        let set = Arc::new(SortedRowSet::new());
        self.register(group, set.clone());
        set
    }

    /// How many scans have been opened against a group
    pub fn scan_opens(&self, group: GroupId) -> u64 {
        self.opens.lock().get(&group.0).copied().unwrap_or(0)
    }

    fn rows_for(&self, group: GroupId) -> Result<Vec<Row>> {
        let factory = self
            .factories
            .read()
            .get(&group.0)
            .cloned()
            .ok_or_else(|| Error::GroupNotFound(group.to_string()))?;
        self.opens
            .lock()
            .entry(group.0)
            .and_modify(|n| *n += 1)
            .or_insert(1);
        factory.rows()
    }
}

impl StoreAdapter for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn group_scan(&self, _ctx: &QueryContext, group: GroupId) -> Result<Box<dyn GroupScan>> {
        Ok(Box::new(MemoryGroupScan {
            rows: self.rows_for(group)?.into_iter(),
        }))
    }

    fn branch_scan(
        &self,
        _ctx: &QueryContext,
        group: GroupId,
        prefix: &HKey,
    ) -> Result<Box<dyn GroupScan>> {
        let rows = self
            .rows_for(group)?
            .into_iter()
            .filter(|row| row.hkey().map(|k| prefix.is_prefix_of(k)).unwrap_or(false))
            .collect::<Vec<_>>();
        Ok(Box::new(MemoryGroupScan {
            rows: rows.into_iter(),
        }))
    }
}

struct MemoryGroupScan {
    rows: std::vec::IntoIter<Row>,
}

impl GroupScan for MemoryGroupScan {
    fn next(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }

    fn close(&mut self) {
        // Nothing held beyond the materialized rows
    }
}

/// A key-ordered set of rows; the standard memory-group factory
pub struct SortedRowSet {
    rows: RwLock<BTreeMap<Vec<u8>, Row>>,
}

impl SortedRowSet {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace the row at its HKey
    pub fn insert(&self, row: Row) -> Result<()> {
        let key = row
            .hkey()
            .ok_or_else(|| Error::InvalidValue("cannot store a row without an HKey".into()))?
            .encoded()
            .to_vec();
        self.rows.write().insert(key, row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Default for SortedRowSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGroupFactory for SortedRowSet {
    fn rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows.read().values().cloned().collect())
    }
}
