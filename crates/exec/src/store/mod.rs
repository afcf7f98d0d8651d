//! Storage adapters
//!
//! The `StoreAdapter`/`GroupScan` SPI is the seam that lets one compiled
//! operator tree run unmodified over different backends: a persistent
//! fjall-backed store, an in-memory store fed by registered factories, and
//! a virtual store that synthesizes rows from schema metadata alone.

pub mod config;
pub mod encoding;
pub mod memory;
pub mod persistent;
pub mod virtual_table;

pub use config::StorageConfig;
pub use memory::{MemoryGroupFactory, MemoryStore, SortedRowSet};
pub use persistent::PersistentStore;
pub use virtual_table::{VirtualGroupFactory, VirtualStore};

use crate::context::QueryContext;
use crate::error::Result;
use crate::hkey::HKey;
use crate::types::{GroupId, Row};

/// Minimal leaf iteration contract over one group's rows.
///
/// Backends produce rows in HKey order (or the synthetic order assigned to
/// computed rows). A scan is driven by exactly one cursor on one thread.
pub trait GroupScan {
    fn next(&mut self) -> Result<Option<Row>>;

    /// Release backend resources. Called at most once by the owning cursor.
    fn close(&mut self);
}

/// Binds operator execution to a storage backend.
///
/// Implementations must honor the `GroupScan` contract and must give every
/// row a unique, comparable HKey, inventing a hidden incrementing key when
/// the backend has no natural one.
pub trait StoreAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// All rows of a group, interleaved in HKey order
    fn group_scan(&self, ctx: &QueryContext, group: GroupId) -> Result<Box<dyn GroupScan>>;

    /// The subtree rooted at `prefix`: every row whose HKey it prefixes,
    /// including the row at `prefix` itself if present
    fn branch_scan(
        &self,
        ctx: &QueryContext,
        group: GroupId,
        prefix: &HKey,
    ) -> Result<Box<dyn GroupScan>>;

    /// The single row at exactly `hkey`, if present
    fn fetch(&self, ctx: &QueryContext, group: GroupId, hkey: &HKey) -> Result<Option<Row>> {
        let mut scan = self.branch_scan(ctx, group, hkey)?;
        let found = loop {
            match scan.next()? {
                Some(row) => {
                    if row.hkey() == Some(hkey) {
                        break Some(row);
                    }
                    // Branch scans yield descendants too; only the exact
                    // key counts as a hit
                    if row.hkey().map(|k| k > hkey).unwrap_or(true) {
                        break None;
                    }
                }
                None => break None,
            }
        };
        scan.close();
        Ok(found)
    }
}
