//! End-to-end optimization scenarios over the Sailors/Boats/Reserves
//! schema.

mod common;

use minnow_optimizer::nodes::{ColumnRef, ExprChild, Operator, SortKey};
use minnow_optimizer::{bind_query, Optimizer, PhysicalProps};
use pretty_assertions::assert_eq;

const JOIN_S_R: &str = "EQJOIN(S.sid, R.sid, GET(Sailors, S), GET(Reserves, R))";

fn optimized(query: &str) -> (Optimizer, minnow_optimizer::ArcExpression) {
    let catalog = common::catalog();
    let expr = bind_query(&catalog, query).unwrap();
    let mut optimizer = Optimizer::new(catalog);
    let plan = optimizer.optimize(&expr).unwrap();
    (optimizer, plan)
}

/// Every equi-join ordering the root group holds, as `(left alias of the
/// first key, operator name)` pairs.
fn root_join_members(optimizer: &Optimizer) -> Vec<String> {
    let root = optimizer.root().unwrap();
    let space = optimizer.space();
    space
        .group(root)
        .exprs()
        .iter()
        .map(|&id| space.mexpr(id))
        .filter_map(|mexpr| match &mexpr.op {
            Operator::EquiJoin { left_keys, .. } => Some(format!(
                "EquiJoin left={}",
                left_keys
                    .first()
                    .map(|k| k.alias.clone())
                    .unwrap_or_default()
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn trivial_get_becomes_a_file_scan() {
    let catalog = common::catalog();
    let expr = bind_query(&catalog, "GET(Sailors, S)").unwrap();
    let mut optimizer = Optimizer::new(catalog);

    let plan = optimizer.optimize(&expr).unwrap();
    assert!(
        matches!(plan.operator(), Operator::FileScan(t) if t.table == "Sailors"),
        "expected a file scan, got {plan}"
    );

    // Cost is exactly pages(Sailors) x the page IO constant.
    let explained = optimizer.explain(&expr).unwrap();
    assert_eq!(explained.cost().value(), 18.0);
}

#[test]
fn join_commute_enriches_the_root_group() {
    let (optimizer, plan) = optimized(JOIN_S_R);

    let members = root_join_members(&optimizer);
    assert!(
        members.contains(&"EquiJoin left=S".to_string())
            && members.contains(&"EquiJoin left=R".to_string()),
        "root group should hold both join orders, had {members:?}\n{}",
        optimizer.dump()
    );

    // The smaller relation builds the hash table.
    let Operator::HashJoin { left_keys, .. } = plan.operator() else {
        panic!("expected a hash join, got {plan}");
    };
    assert_eq!(left_keys[0].alias, "S");
    let build = plan.input(0).as_expr().unwrap();
    assert!(
        matches!(build.operator(), Operator::FileScan(t) if t.table == "Sailors"),
        "build side should scan the smaller relation, got {build}"
    );
}

#[test]
fn hash_join_outranks_nested_loops() {
    let (_, plan) = optimized("EQJOIN(R.bid, B.bid, GET(Boats, B), GET(Reserves, R))");
    assert!(
        matches!(plan.operator(), Operator::HashJoin { .. }),
        "expected a hash join, got {plan}"
    );
}

#[test]
fn cross_product_falls_back_to_nested_loops() {
    let (optimizer, plan) = optimized("EQJOIN(GET(Sailors, S), GET(Boats, B))");

    // The hash join rule promised `None`, so no hash join member exists
    // anywhere in the root group.
    let root = optimizer.root().unwrap();
    let space = optimizer.space();
    assert!(
        space
            .group(root)
            .exprs()
            .iter()
            .all(|&id| !matches!(space.mexpr(id).op, Operator::HashJoin { .. })),
        "{}",
        optimizer.dump()
    );
    assert!(
        matches!(plan.operator(), Operator::NestedLoopsJoin { .. }),
        "expected nested loops, got {plan}"
    );
}

#[test]
fn three_way_join_explores_commute_and_association() {
    let query = "EQJOIN(R.bid, B.bid, EQJOIN(S.sid, R.sid, GET(Sailors, S), GET(Reserves, R)), GET(Boats, B))";
    let catalog = common::catalog();
    let expr = bind_query(&catalog, query).unwrap();
    let mut optimizer = Optimizer::new(catalog);
    let explained = optimizer.explain(&expr).unwrap();

    // (S join R) join B, B join (S join R), and S join (R join B) must all
    // be members of the root group.
    let members = root_join_members(&optimizer);
    for expected in ["EquiJoin left=R", "EquiJoin left=B", "EquiJoin left=S"] {
        assert!(
            members.contains(&expected.to_string()),
            "missing ordering {expected}, had {members:?}\n{}",
            optimizer.dump()
        );
    }

    assert!(
        !explained.cost().is_infinity(),
        "plan cost must be finite:\n{explained}"
    );
}

#[test]
fn unsatisfiable_order_is_enforced_by_a_sort() {
    let catalog = common::catalog();
    let expr = bind_query(&catalog, JOIN_S_R).unwrap();
    let mut optimizer = Optimizer::new(catalog);

    let required = PhysicalProps::ordered(vec![SortKey::asc(ColumnRef::new(
        "Sailors", "S", "rating",
    ))]);
    let plan = optimizer.optimize_with_props(&expr, required.clone()).unwrap();

    let Operator::Sort(keys) = plan.operator() else {
        panic!("expected a sort enforcer at the root, got {plan}");
    };
    assert_eq!(keys[0].column.column, "rating");
    // The enforcer's input was optimized under no ordering requirement.
    let child = plan.input(0).as_expr().unwrap();
    assert!(
        matches!(child.operator(), Operator::HashJoin { .. }),
        "enforcer input should be the unordered winner, got {child}"
    );

    let explained = optimizer.explain_with_props(&expr, required).unwrap();
    assert_eq!(explained.root.children[0].required, PhysicalProps::any());
}

#[test]
fn optimization_is_deterministic() {
    let (first, first_plan) = optimized(JOIN_S_R);
    let (second, second_plan) = optimized(JOIN_S_R);
    assert_eq!(first_plan, second_plan);
    assert_eq!(first.dump(), second.dump());
}

#[test]
fn select_and_project_get_physical_counterparts() {
    let query = "PROJECT(<S.sname>, SELECT(GET(Sailors, S), OP_GT(ATTR(S.rating), INT(7))))";
    let (_, plan) = optimized(query);
    assert!(
        matches!(plan.operator(), Operator::ProjectList(_)),
        "expected a project list root, got {plan}"
    );
    let child = plan.input(0).as_expr().unwrap();
    assert!(
        matches!(child.operator(), Operator::Filter),
        "expected a filter below the projection, got {child}"
    );
    // The filter's predicate came through as an item tree.
    let predicate = child.input(1).as_expr().unwrap();
    assert!(matches!(predicate.operator(), Operator::Cmp(_)));
}

#[test]
fn distinct_is_implemented_by_hashing() {
    let (_, plan) = optimized("DISTINCT(PROJECT(<R.bid>, GET(Reserves, R)))");
    assert!(
        matches!(plan.operator(), Operator::HashDistinct),
        "expected hash distinct, got {plan}"
    );
}

#[test]
fn missing_access_path_rules_surface_as_no_plan() {
    let catalog = common::catalog();
    let expr = bind_query(&catalog, "GET(Sailors, S)").unwrap();
    let mut optimizer = Optimizer::new(catalog);
    let scan_rule = optimizer
        .rules_mut()
        .find("get_table_to_file_scan")
        .unwrap();
    optimizer.rules_mut().disable(scan_rule);

    let err = optimizer.optimize(&expr).unwrap_err();
    assert!(
        matches!(
            &err,
            minnow_optimizer::Error::Query(minnow_optimizer::QueryError::NoPlan { operator, .. })
                if operator.contains("GetTable")
        ),
        "unexpected error {err}"
    );
}

#[test]
fn plans_are_pure_trees() {
    let (_, plan) = optimized(JOIN_S_R);
    assert!(plan.is_pure());
    fn no_leaves(expr: &minnow_optimizer::Expression) -> bool {
        !expr.operator().is_leaf()
            && expr.children.iter().all(|c| match c {
                ExprChild::Expr(e) => no_leaves(e),
                ExprChild::Group(_) => false,
            })
    }
    assert!(no_leaves(&plan));
}
