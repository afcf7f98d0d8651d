//! Persistent store adapter with fjall backend
//!
//! One fjall partition per group; keys are encoded HKeys, so partition
//! iteration order is the group's traversal order and a branch scan is a
//! key-prefix scan.

use crate::context::QueryContext;
use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::pool::Pool;
use crate::store::config::StorageConfig;
use crate::store::encoding::{decode_row, encode_row_into};
use crate::store::{GroupScan, StoreAdapter};
use crate::types::{GroupId, Row, Schema};
use fjall::{Keyspace, Partition, PartitionCreateOptions};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type RawIter = Box<dyn Iterator<Item = fjall::Result<fjall::KvPair>>>;

/// Persistent group store
pub struct PersistentStore {
    keyspace: Keyspace,
    partitions: RwLock<HashMap<u32, Partition>>,
    // Payload scratch reused across writes
    scratch: Arc<Pool<Vec<u8>>>,
    config: StorageConfig,
}

impl PersistentStore {
    /// Open (or create) a store at the configured directory
    pub fn open(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let keyspace = fjall::Config::new(&config.data_dir)
            .cache_size(config.block_cache_size)
            .open()?;
        tracing::debug!(path = %config.data_dir.display(), "opened persistent store");
        Ok(Self {
            keyspace,
            partitions: RwLock::new(HashMap::new()),
            scratch: Pool::new(Vec::new),
            config,
        })
    }

    fn partition(&self, group: GroupId) -> Result<Partition> {
        if let Some(p) = self.partitions.read().get(&group.0) {
            return Ok(p.clone());
        }
        let p = self.keyspace.open_partition(
            &format!("group_{}", group.0),
            PartitionCreateOptions::default().compression(self.config.compression),
        )?;
        Ok(self
            .partitions
            .write()
            .entry(group.0)
            .or_insert(p)
            .clone())
    }

    /// Write one base row into its group's partition. Population path for
    /// loaders and tests; the engine itself only reads.
    pub fn write_row(&self, schema: &Schema, row: &Row) -> Result<()> {
        let table = row
            .row_type()
            .table()
            .ok_or_else(|| Error::InvalidValue("cannot store a derived row".into()))?;
        let hkey = row
            .hkey()
            .ok_or_else(|| Error::InvalidValue("cannot store a row without an HKey".into()))?;
        let group = schema.table(table)?.group;
        let partition = self.partition(group)?;
        let mut buf = self.scratch.acquire();
        let payload = buf.exclusive();
        payload.clear();
        encode_row_into(table, hkey, row.values(), payload);
        partition.insert(hkey.encoded(), &payload[..])?;
        Ok(())
    }

    /// Flush buffered writes according to the configured persist mode
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(self.config.persist_mode)?;
        Ok(())
    }
}

impl StoreAdapter for PersistentStore {
    fn name(&self) -> &'static str {
        "persistent"
    }

    fn group_scan(&self, ctx: &QueryContext, group: GroupId) -> Result<Box<dyn GroupScan>> {
        let partition = self.partition(group)?;
        Ok(Box::new(PersistentGroupScan {
            schema: ctx.schema().clone(),
            inner: Some(Box::new(partition.iter())),
        }))
    }

    fn branch_scan(
        &self,
        ctx: &QueryContext,
        group: GroupId,
        prefix: &HKey,
    ) -> Result<Box<dyn GroupScan>> {
        let partition = self.partition(group)?;
        Ok(Box::new(PersistentGroupScan {
            schema: ctx.schema().clone(),
            inner: Some(Box::new(partition.prefix(prefix.encoded().to_vec()))),
        }))
    }

    fn fetch(&self, ctx: &QueryContext, group: GroupId, hkey: &HKey) -> Result<Option<Row>> {
        let partition = self.partition(group)?;
        match partition.get(hkey.encoded())? {
            Some(payload) => Ok(Some(decode_row(ctx.schema(), &payload)?)),
            None => Ok(None),
        }
    }
}


struct PersistentGroupScan {
    schema: Arc<Schema>,
    inner: Option<RawIter>,
}

impl GroupScan for PersistentGroupScan {
    fn next(&mut self) -> Result<Option<Row>> {
        let iter = match self.inner.as_mut() {
            Some(iter) => iter,
            None => return Ok(None),
        };
        match iter.next() {
            Some(Ok((_key, payload))) => Ok(Some(decode_row(&self.schema, &payload)?)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.inner = None;
    }
}
