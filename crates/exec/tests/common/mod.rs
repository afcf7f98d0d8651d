//! Common fixtures for execution integration tests
#![allow(dead_code)]

use arbor_exec::store::{MemoryStore, SortedRowSet};
use arbor_exec::types::{Column, GroupId, TableId};
use arbor_exec::{
    Cursor, DataType, HKey, Operator, QueryBindings, QueryContext, Result, Row, Schema,
    SchemaBuilder, TransactionHandle, Value,
};
use std::sync::Arc;

/// A customers → orders → items group over a memory store, with helpers to
/// load rows and drive plans
pub struct TestContext {
    pub schema: Arc<Schema>,
    pub store: Arc<MemoryStore>,
    pub rows: Arc<SortedRowSet>,
    pub group: GroupId,
    pub customers: TableId,
    pub orders: TableId,
    pub items: TableId,
    next_side_group: u32,
}

impl TestContext {
    pub fn new() -> Self {
        let mut b = SchemaBuilder::new();
        let group = b.group("coi");
        let customers = b
            .table(
                group,
                "customers",
                None,
                vec![
                    Column::new("cid", DataType::I64),
                    Column::new("name", DataType::Str),
                ],
                vec![0],
            )
            .unwrap();
        let orders = b
            .table(
                group,
                "orders",
                Some(customers),
                vec![
                    Column::new("cid", DataType::I64),
                    Column::new("oid", DataType::I64),
                    Column::new("total", DataType::I64),
                ],
                vec![1],
            )
            .unwrap();
        let items = b
            .table(
                group,
                "items",
                Some(orders),
                vec![
                    Column::new("oid", DataType::I64),
                    Column::new("iid", DataType::I64),
                    Column::new("sku", DataType::Str),
                ],
                vec![1],
            )
            .unwrap();
        let schema = b.build().unwrap();
        let store = MemoryStore::new();
        let rows = store.register_rows(group);
        Self {
            schema,
            store,
            rows,
            group,
            customers,
            orders,
            items,
            next_side_group: 100,
        }
    }

    /// Three customers: 1 with one order, 2 with none, 3 with two orders
    pub fn with_standard_rows() -> Self {
        let mut ctx = Self::new();
        ctx.customer(1, "alice");
        ctx.customer(2, "bob");
        ctx.customer(3, "carol");
        ctx.order(1, 10, 100);
        ctx.order(3, 30, 300);
        ctx.order(3, 31, 310);
        ctx.item(1, 10, 1000, "widget");
        ctx.item(1, 10, 1001, "gadget");
        ctx.item(3, 30, 3000, "sprocket");
        ctx
    }

    pub fn customer_hkey(cid: i64) -> HKey {
        HKey::root(1, vec![Value::I64(cid)])
    }

    pub fn order_hkey(cid: i64, oid: i64) -> HKey {
        Self::customer_hkey(cid).child(2, vec![Value::I64(oid)])
    }

    pub fn item_hkey(cid: i64, oid: i64, iid: i64) -> HKey {
        Self::order_hkey(cid, oid).child(3, vec![Value::I64(iid)])
    }

    pub fn customer_row(&self, cid: i64, name: &str) -> Row {
        Row::base(
            self.schema.row_type(self.customers).unwrap(),
            vec![Value::I64(cid), Value::string(name)],
            Self::customer_hkey(cid),
        )
    }

    pub fn order_row(&self, cid: i64, oid: i64, total: i64) -> Row {
        Row::base(
            self.schema.row_type(self.orders).unwrap(),
            vec![Value::I64(cid), Value::I64(oid), Value::I64(total)],
            Self::order_hkey(cid, oid),
        )
    }

    pub fn item_row(&self, cid: i64, oid: i64, iid: i64, sku: &str) -> Row {
        Row::base(
            self.schema.row_type(self.items).unwrap(),
            vec![Value::I64(oid), Value::I64(iid), Value::string(sku)],
            Self::item_hkey(cid, oid, iid),
        )
    }

    pub fn customer(&self, cid: i64, name: &str) {
        self.rows.insert(self.customer_row(cid, name)).unwrap();
    }

    pub fn order(&self, cid: i64, oid: i64, total: i64) {
        self.rows.insert(self.order_row(cid, oid, total)).unwrap();
    }

    pub fn item(&self, cid: i64, oid: i64, iid: i64, sku: &str) {
        self.rows.insert(self.item_row(cid, oid, iid, sku)).unwrap();
    }

    /// Register a standalone scannable group holding exactly these rows;
    /// used as plan input when a test wants a specific row stream
    pub fn side_input(&mut self, rows: Vec<Row>) -> GroupId {
        let group = GroupId(self.next_side_group);
        self.next_side_group += 1;
        let set = self.store.register_rows(group);
        for row in rows {
            set.insert(row).unwrap();
        }
        group
    }

    pub fn context(&self) -> QueryContext {
        QueryContext::new(
            self.schema.clone(),
            self.store.clone(),
            TransactionHandle::new(1, 1),
        )
    }
}

/// Drive a plan to exhaustion and collect its rows
pub fn run(plan: &Operator, ctx: &QueryContext) -> Result<Vec<Row>> {
    let mut bindings = QueryBindings::new();
    run_with(plan, ctx, &mut bindings)
}

pub fn run_with(
    plan: &Operator,
    ctx: &QueryContext,
    bindings: &mut QueryBindings,
) -> Result<Vec<Row>> {
    let mut cursor = plan.cursor();
    cursor.open(ctx, bindings)?;
    let mut out = Vec::new();
    while let Some(row) = cursor.next(ctx, bindings)? {
        out.push(row);
    }
    cursor.close()?;
    Ok(out)
}

/// The (table ordinal, first key value) trace of a row stream; compact way
/// to assert traversal order
pub fn trace(rows: &[Row]) -> Vec<(u32, i64)> {
    rows.iter()
        .map(|row| {
            let hkey = row.hkey().expect("base row");
            let last = hkey.segments().last().unwrap();
            let key = match &last.values[0] {
                Value::I64(i) => *i,
                v => panic!("unexpected key value {:?}", v),
            };
            (last.ordinal, key)
        })
        .collect()
}
