//! Nested loop join semantics

mod common;

use arbor_exec::{Expression, Operator, Value};
use common::{run, TestContext};
use std::sync::Arc;

fn join_plan(tc: &mut TestContext) -> (Operator, arbor_exec::types::GroupId) {
    let customers = tc.side_input(vec![
        tc.customer_row(1, "alice"),
        tc.customer_row(2, "bob"),
        tc.customer_row(3, "carol"),
    ]);
    let orders = tc.side_input(vec![
        tc.order_row(1, 10, 100),
        tc.order_row(3, 30, 300),
        tc.order_row(3, 31, 310),
    ]);
    let customers_rt = tc.schema.row_type(tc.customers).unwrap();
    let orders_rt = tc.schema.row_type(tc.orders).unwrap();
    let plan = Operator::NestedLoopJoin {
        outer: Arc::new(Operator::GroupScan { group: customers }),
        inner: Arc::new(Operator::Select {
            input: Arc::new(Operator::GroupScan { group: orders }),
            // orders.cid = bound customer.cid
            predicate: Expression::equal(
                Expression::column(0),
                Expression::bound_field(0, 0),
            ),
        }),
        binding_position: 0,
        row_type: tc.schema.join_type(&customers_rt, &orders_rt),
    };
    (plan, orders)
}

#[test]
fn test_join_pairs_and_order() {
    let mut tc = TestContext::with_standard_rows();
    let (plan, _) = join_plan(&mut tc);
    let rows = run(&plan, &tc.context()).unwrap();

    let pairs: Vec<(i64, i64)> = rows
        .iter()
        .map(|r| {
            let cid = match r.value(0).unwrap() {
                Value::I64(i) => *i,
                v => panic!("unexpected {:?}", v),
            };
            let oid = match r.value(3).unwrap() {
                Value::I64(i) => *i,
                v => panic!("unexpected {:?}", v),
            };
            (cid, oid)
        })
        .collect();
    // Customer 2 has no orders and contributes nothing
    assert_eq!(pairs, vec![(1, 10), (3, 30), (3, 31)]);

    // Combined rows are outer ++ inner
    assert_eq!(rows[0].arity(), 5);
    assert_eq!(rows[0].value(1).unwrap(), &Value::string("alice"));
    assert_eq!(rows[0].value(4).unwrap(), &Value::I64(100));
}

#[test]
fn test_join_opens_fresh_inner_cursor_per_outer_row() {
    let mut tc = TestContext::with_standard_rows();
    let (plan, orders_group) = join_plan(&mut tc);
    run(&plan, &tc.context()).unwrap();
    // One inner scan per outer row, including the orderless customer
    assert_eq!(tc.store.scan_opens(orders_group), 3);
}

#[test]
fn test_join_with_empty_outer() {
    let mut tc = TestContext::with_standard_rows();
    let customers = tc.side_input(vec![]);
    let orders = tc.side_input(vec![tc.order_row(1, 10, 100)]);
    let customers_rt = tc.schema.row_type(tc.customers).unwrap();
    let orders_rt = tc.schema.row_type(tc.orders).unwrap();
    let plan = Operator::NestedLoopJoin {
        outer: Arc::new(Operator::GroupScan { group: customers }),
        inner: Arc::new(Operator::GroupScan { group: orders }),
        binding_position: 0,
        row_type: tc.schema.join_type(&customers_rt, &orders_rt),
    };
    let rows = run(&plan, &tc.context()).unwrap();
    assert!(rows.is_empty());
    assert_eq!(tc.store.scan_opens(orders), 0, "inner never driven");
}
