//! Group scan traversal, interrupt, and lifecycle behavior

mod common;

use arbor_exec::{CursorState, Error, Operator, Plan, QueryBindings, SchemaBuilder};
use common::{run, trace, TestContext};

#[test]
fn test_group_traversal_interleaves_in_hkey_order() {
    let tc = TestContext::with_standard_rows();
    let plan = Operator::GroupScan { group: tc.group };
    let rows = run(&plan, &tc.context()).unwrap();
    // Each customer, then its orders, each order's items nested beneath
    assert_eq!(
        trace(&rows),
        vec![
            (1, 1),
            (2, 10),
            (3, 1000),
            (3, 1001),
            (1, 2),
            (1, 3),
            (2, 30),
            (3, 3000),
            (2, 31),
        ]
    );
}

#[test]
fn test_every_descendant_follows_its_parent() {
    let tc = TestContext::with_standard_rows();
    let plan = Operator::GroupScan { group: tc.group };
    let rows = run(&plan, &tc.context()).unwrap();
    for (i, row) in rows.iter().enumerate() {
        let hkey = row.hkey().unwrap();
        if hkey.segments().len() < 2 {
            continue;
        }
        let parent = hkey.prefix(hkey.segments().len() - 1);
        let parent_pos = rows
            .iter()
            .position(|r| r.hkey() == Some(&parent))
            .expect("parent row present");
        assert!(parent_pos < i, "parent emitted before descendant");
    }
}

#[test]
fn test_interrupt_aborts_scan() {
    let tc = TestContext::with_standard_rows();
    let ctx = tc.context();
    let plan = Operator::GroupScan { group: tc.group };
    let mut bindings = QueryBindings::new();
    let mut cursor = plan.cursor();
    cursor.open(&ctx, &mut bindings).unwrap();
    assert!(cursor.next(&ctx, &mut bindings).unwrap().is_some());

    ctx.interrupt_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(matches!(
        cursor.next(&ctx, &mut bindings),
        Err(Error::Interrupted)
    ));
    // The cursor closed itself on the way out
    assert_eq!(cursor.state(), CursorState::Closed);
}

#[test]
fn test_lifecycle_enforced() {
    let tc = TestContext::with_standard_rows();
    let ctx = tc.context();
    let plan = Operator::GroupScan { group: tc.group };
    let mut bindings = QueryBindings::new();
    let mut cursor = plan.cursor();

    assert!(matches!(
        cursor.next(&ctx, &mut bindings),
        Err(Error::CursorLifecycle { .. })
    ));

    cursor.open(&ctx, &mut bindings).unwrap();
    assert!(matches!(
        cursor.open(&ctx, &mut bindings),
        Err(Error::CursorLifecycle { .. })
    ));

    cursor.close().unwrap();
    cursor.close().unwrap(); // idempotent

    // Reopen after close restarts from the top
    cursor.open(&ctx, &mut bindings).unwrap();
    let mut count = 0;
    while cursor.next(&ctx, &mut bindings).unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 9);

    cursor.destroy();
    assert_eq!(cursor.state(), CursorState::Destroyed);
    assert!(cursor.open(&ctx, &mut bindings).is_err());
}

#[test]
fn test_rebind_repositions_idle_cursor() {
    let tc = TestContext::with_standard_rows();
    let ctx = tc.context();
    let plan = Operator::GroupScan { group: tc.group };
    let mut bindings = QueryBindings::new();
    let mut cursor = plan.cursor();
    cursor.open(&ctx, &mut bindings).unwrap();

    // Rebind only applies between iterations
    assert!(matches!(
        cursor.rebind(&TestContext::customer_hkey(3), true),
        Err(Error::CursorLifecycle { .. })
    ));

    while cursor.next(&ctx, &mut bindings).unwrap().is_some() {}
    assert_eq!(cursor.state(), CursorState::Idle);

    // Deep rebind: the whole subtree under customer 3
    cursor.rebind(&TestContext::customer_hkey(3), true).unwrap();
    let mut rows = Vec::new();
    while let Some(row) = cursor.next(&ctx, &mut bindings).unwrap() {
        rows.push(row);
    }
    assert_eq!(trace(&rows), vec![(1, 3), (2, 30), (3, 3000), (2, 31)]);

    // Shallow rebind: exactly one row
    cursor.rebind(&TestContext::order_hkey(1, 10), false).unwrap();
    let mut rows = Vec::new();
    while let Some(row) = cursor.next(&ctx, &mut bindings).unwrap() {
        rows.push(row);
    }
    assert_eq!(trace(&rows), vec![(2, 10)]);

    cursor.close().unwrap();
}

#[test]
fn test_plan_rejects_stale_schema_generation() {
    let tc = TestContext::with_standard_rows();
    let plan = Operator::GroupScan { group: tc.group };
    let plan = Plan::new(plan, &tc.schema);

    // Executable against the generation it was compiled for
    assert!(plan.cursor(&tc.context()).is_ok());

    // A reloaded schema bumps the generation; the plan must be recompiled
    let mut b = SchemaBuilder::new().generation(2);
    let g = b.group("coi");
    b.table(
        g,
        "customers",
        None,
        vec![arbor_exec::types::Column::new(
            "cid",
            arbor_exec::DataType::I64,
        )],
        vec![0],
    )
    .unwrap();
    let reloaded = b.build().unwrap();
    let ctx = arbor_exec::QueryContext::new(
        reloaded,
        tc.store.clone(),
        arbor_exec::TransactionHandle::new(1, 1),
    );
    assert_eq!(
        plan.cursor(&ctx).err(),
        Some(Error::SchemaMismatch { plan: 1, live: 2 })
    );
}
