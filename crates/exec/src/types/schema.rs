//! Schema model: tables, hierarchical groups, and the RowType cache
//!
//! A group is a root table plus its declared descendant tables, stored
//! interleaved in HKey order. The schema is an immutable snapshot handed
//! to executions through the `QueryContext`; concurrent DDL produces a new
//! snapshot with a higher generation.

use crate::error::{Error, Result};
use crate::types::row::{RowType, RowTypeKind};
use crate::types::DataType;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a table within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

/// Identifies a group (hierarchical cluster) within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A table definition within a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub group: GroupId,
    pub columns: Vec<Column>,
    /// Column indices contributing this table's own HKey segment
    pub key_columns: Vec<usize>,
    /// Parent table in the group hierarchy, `None` for the group root
    pub parent: Option<TableId>,
    /// Position of this table in the group's traversal order, 1-based.
    /// Ordinals are part of the HKey encoding and never reused.
    pub ordinal: u32,
    /// Distance from the group root (root is 0)
    pub depth: usize,
}

impl Table {
    /// Extract this table's own HKey segment values from a full row
    pub fn segment_values(&self, values: &[crate::types::Value]) -> Vec<crate::types::Value> {
        self.key_columns
            .iter()
            .map(|&i| values[i].clone())
            .collect()
    }
}

/// A hierarchical group: a root table and its descendants in traversal order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub root: TableId,
    /// All tables in the group, in depth-first declaration order
    pub tables: Vec<TableId>,
}

/// An immutable schema snapshot
pub struct Schema {
    generation: u64,
    tables: HashMap<TableId, Arc<Table>>,
    tables_by_name: HashMap<String, TableId>,
    groups: HashMap<GroupId, Group>,
    groups_by_name: HashMap<String, GroupId>,
    // Base RowTypes are cached singletons; identity comparison relies on it
    row_types: RwLock<HashMap<TableId, Arc<RowType>>>,
    next_type_id: AtomicU64,
}

impl Schema {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn table(&self, id: TableId) -> Result<&Arc<Table>> {
        self.tables
            .get(&id)
            .ok_or_else(|| Error::TableNotFound(id.to_string()))
    }

    pub fn table_named(&self, name: &str) -> Result<&Arc<Table>> {
        let id = self
            .tables_by_name
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        self.table(*id)
    }

    pub fn group(&self, id: GroupId) -> Result<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))
    }

    pub fn group_named(&self, name: &str) -> Result<&Group> {
        let id = self
            .groups_by_name
            .get(name)
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))?;
        self.group(*id)
    }

    /// Resolve a table by the ordinal it holds within a group
    pub fn table_by_ordinal(&self, group: GroupId, ordinal: u32) -> Result<&Arc<Table>> {
        let g = self.group(group)?;
        for id in &g.tables {
            let t = self.table(*id)?;
            if t.ordinal == ordinal {
                return Ok(t);
            }
        }
        Err(Error::TableNotFound(format!(
            "ordinal {} in group {}",
            ordinal, group
        )))
    }

    /// The cached base RowType for a table. One instance per table per
    /// schema; operators compare RowTypes by identity.
    pub fn row_type(&self, table: TableId) -> Result<Arc<RowType>> {
        if let Some(rt) = self.row_types.read().get(&table) {
            return Ok(rt.clone());
        }
        let t = self.table(table)?;
        let rt = Arc::new(RowType::new(
            self.allocate_type_id(),
            RowTypeKind::Base,
            Some(table),
            t.name.clone(),
            t.columns.iter().map(|c| c.data_type).collect(),
        ));
        let mut cache = self.row_types.write();
        // Another thread may have raced us; keep the first instance
        Ok(cache.entry(table).or_insert(rt).clone())
    }

    /// A fresh derived RowType (projected, joined). Derived types are
    /// created at plan-compile time and owned by the plan.
    pub fn derived_type(&self, name: impl Into<String>, columns: Vec<DataType>) -> Arc<RowType> {
        Arc::new(RowType::new(
            self.allocate_type_id(),
            RowTypeKind::Derived,
            None,
            name.into(),
            columns,
        ))
    }

    /// A synthetic RowType for a virtual or memory table
    pub fn synthetic_type(&self, name: impl Into<String>, columns: Vec<DataType>) -> Arc<RowType> {
        Arc::new(RowType::new(
            self.allocate_type_id(),
            RowTypeKind::Synthetic,
            None,
            name.into(),
            columns,
        ))
    }

    /// The RowType produced by concatenating two input types (joins)
    pub fn join_type(&self, outer: &RowType, inner: &RowType) -> Arc<RowType> {
        let mut columns = outer.columns().to_vec();
        columns.extend_from_slice(inner.columns());
        self.derived_type(format!("{}*{}", outer.name(), inner.name()), columns)
    }

    fn allocate_type_id(&self) -> u64 {
        self.next_type_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Builds an immutable schema snapshot
pub struct SchemaBuilder {
    generation: u64,
    tables: Vec<Table>,
    groups: Vec<Group>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            generation: 1,
            tables: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Set the schema generation (monotonically increased by DDL, external)
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Declare a new group
    pub fn group(&mut self, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(Group {
            id,
            name: name.into(),
            root: TableId(u32::MAX), // set by the first table added
            tables: Vec::new(),
        });
        id
    }

    /// Declare a table. The first table added to a group becomes its root;
    /// every later table must name a parent already in the group.
    pub fn table(
        &mut self,
        group: GroupId,
        name: impl Into<String>,
        parent: Option<TableId>,
        columns: Vec<Column>,
        key_columns: Vec<usize>,
    ) -> Result<TableId> {
        let name = name.into();
        let g = self
            .groups
            .get_mut(group.0 as usize)
            .ok_or_else(|| Error::GroupNotFound(group.to_string()))?;

        let (depth, parent) = match parent {
            None => {
                if !g.tables.is_empty() {
                    return Err(Error::InvalidValue(format!(
                        "group {} already has a root table",
                        g.name
                    )));
                }
                (0, None)
            }
            Some(p) => {
                let pt = self
                    .tables
                    .iter()
                    .find(|t| t.id == p)
                    .ok_or_else(|| Error::TableNotFound(p.to_string()))?;
                if pt.group != group {
                    return Err(Error::InvalidValue(format!(
                        "parent {} belongs to a different group",
                        pt.name
                    )));
                }
                (pt.depth + 1, Some(p))
            }
        };

        for &k in &key_columns {
            if k >= columns.len() {
                return Err(Error::ColumnOutOfRange(k));
            }
        }

        let id = TableId(self.tables.len() as u32);
        let ordinal = g.tables.len() as u32 + 1;
        if g.tables.is_empty() {
            g.root = id;
        }
        g.tables.push(id);
        self.tables.push(Table {
            id,
            name,
            group,
            columns,
            key_columns,
            parent,
            ordinal,
            depth,
        });
        Ok(id)
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let mut tables = HashMap::new();
        let mut tables_by_name = HashMap::new();
        for t in self.tables {
            if tables_by_name.insert(t.name.clone(), t.id).is_some() {
                return Err(Error::InvalidValue(format!("duplicate table {}", t.name)));
            }
            tables.insert(t.id, Arc::new(t));
        }
        let mut groups = HashMap::new();
        let mut groups_by_name = HashMap::new();
        for g in self.groups {
            if g.tables.is_empty() {
                return Err(Error::InvalidValue(format!("group {} has no tables", g.name)));
            }
            groups_by_name.insert(g.name.clone(), g.id);
            groups.insert(g.id, g);
        }
        Ok(Arc::new(Schema {
            generation: self.generation,
            tables,
            tables_by_name,
            groups,
            groups_by_name,
            row_types: RwLock::new(HashMap::new()),
            next_type_id: AtomicU64::new(1),
        }))
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
