// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Join reordering: commutativity and left-to-right associativity.

use crate::cascades::SearchSpace;
use crate::error::OptimizerError;
use crate::nodes::{ArcExpression, ExprChild, Expression, Operator};
use crate::rules::{leaf, Rule};

fn equi_join_op() -> Operator {
    Operator::EquiJoin {
        left_keys: Vec::new(),
        right_keys: Vec::new(),
    }
}

fn bad_pattern(rule: &'static str, binding: &Expression) -> OptimizerError {
    OptimizerError::BadPattern {
        rule,
        message: format!("unexpected binding shape {binding}"),
    }
}

/// `A join B` becomes `B join A` with the key lists swapped.
pub struct JoinCommuteRule {
    pattern: ArcExpression,
}

impl JoinCommuteRule {
    pub fn new() -> Self {
        Self {
            pattern: Expression::new(equi_join_op(), vec![leaf(0), leaf(1)]),
        }
    }
}

impl Rule for JoinCommuteRule {
    fn name(&self) -> &'static str {
        "join_commute"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn next_substitute(
        &self,
        _space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Operator::EquiJoin {
            left_keys,
            right_keys,
        } = binding.operator()
        else {
            return Err(bad_pattern(self.name(), binding));
        };
        Ok(vec![Expression::new(
            Operator::EquiJoin {
                left_keys: right_keys.clone(),
                right_keys: left_keys.clone(),
            },
            vec![binding.input(1).clone(), binding.input(0).clone()],
        )])
    }
}

/// `(A join B) join C` becomes `A join (B join C)` when every outer left
/// key comes from `B`; otherwise the shape is not associable and the rule
/// produces nothing.
pub struct JoinAssocRule {
    pattern: ArcExpression,
}

impl JoinAssocRule {
    pub fn new() -> Self {
        Self {
            pattern: Expression::new(
                equi_join_op(),
                vec![
                    ExprChild::Expr(Expression::new(equi_join_op(), vec![leaf(0), leaf(1)])),
                    leaf(2),
                ],
            ),
        }
    }
}

impl Rule for JoinAssocRule {
    fn name(&self) -> &'static str {
        "join_assoc"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn next_substitute(
        &self,
        space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Operator::EquiJoin {
            left_keys: outer_left,
            right_keys: outer_right,
        } = binding.operator()
        else {
            return Err(bad_pattern(self.name(), binding));
        };
        let Some(inner) = binding.input(0).as_expr() else {
            return Err(bad_pattern(self.name(), binding));
        };
        let Operator::EquiJoin {
            left_keys: a_keys,
            right_keys: b_keys,
        } = inner.operator()
        else {
            return Err(bad_pattern(self.name(), binding));
        };
        let (Some(group_a), Some(group_b), Some(group_c)) = (
            inner.input(0).as_group(),
            inner.input(1).as_group(),
            binding.input(1).as_group(),
        ) else {
            return Err(bad_pattern(self.name(), binding));
        };

        // The outer condition must reference only B so it can descend into
        // the new inner join.
        let b_schema = &space.group(group_b).logical.schema;
        if outer_left.is_empty() || !b_schema.contains_all(outer_left.iter()) {
            return Ok(Vec::new());
        }

        let new_inner = Expression::new(
            Operator::EquiJoin {
                left_keys: outer_left.clone(),
                right_keys: outer_right.clone(),
            },
            vec![ExprChild::Group(group_b), ExprChild::Group(group_c)],
        );
        let new_outer = Expression::new(
            Operator::EquiJoin {
                left_keys: a_keys.clone(),
                right_keys: b_keys.clone(),
            },
            vec![ExprChild::Group(group_a), ExprChild::Expr(new_inner)],
        );
        Ok(vec![new_outer])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascades::SearchSpace;
    use crate::nodes::ColumnRef;
    use crate::properties::LogicalPropsBuilder;
    use crate::rules::bind;
    use crate::test_fixtures::{fixture_catalog, get, join};

    #[test]
    fn commute_swaps_inputs_and_keys() {
        let mut space = SearchSpace::new(LogicalPropsBuilder::new(fixture_catalog()));
        let (_, inserted) = space
            .insert(&join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let rule = JoinCommuteRule::new();
        let bindings = bind(&space, rule.pattern(), &mexpr);
        let subs = rule.next_substitute(&space, &bindings[0]).unwrap();
        assert_eq!(subs.len(), 1);
        let Operator::EquiJoin {
            left_keys,
            right_keys,
        } = subs[0].operator()
        else {
            panic!("substitute is not a join");
        };
        assert_eq!(left_keys[0].alias, "R");
        assert_eq!(right_keys[0].alias, "S");
        assert_eq!(subs[0].input(0).as_group(), Some(mexpr.children[1]));
        assert_eq!(subs[0].input(1).as_group(), Some(mexpr.children[0]));
    }

    #[test]
    fn assoc_requires_outer_keys_from_b() {
        let mut space = SearchSpace::new(LogicalPropsBuilder::new(fixture_catalog()));
        // (S join R on sid) join B on R.bid = B.bid; R is the B-side, so
        // the rule applies.
        let inner = join(get("Sailors", "S"), get("Reserves", "R"));
        let outer = Expression::node(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Reserves", "R", "bid")],
                right_keys: vec![ColumnRef::new("Boats", "B", "bid")],
            },
            vec![inner, get("Boats", "B")],
        );
        let (_, inserted) = space.insert(&outer).unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let rule = JoinAssocRule::new();
        let bindings = bind(&space, rule.pattern(), &mexpr);
        assert_eq!(bindings.len(), 1);
        let subs = rule.next_substitute(&space, &bindings[0]).unwrap();
        assert_eq!(subs.len(), 1);
        // New shape: S join (R join B).
        let Operator::EquiJoin { left_keys, .. } = subs[0].operator() else {
            panic!("substitute is not a join");
        };
        assert_eq!(left_keys[0].alias, "S");
        let new_inner = subs[0].input(1).as_expr().unwrap();
        let Operator::EquiJoin { left_keys, .. } = new_inner.operator() else {
            panic!("inner substitute is not a join");
        };
        assert_eq!(left_keys[0].alias, "R");
    }

    #[test]
    fn assoc_skips_when_outer_keys_come_from_a() {
        let mut space = SearchSpace::new(LogicalPropsBuilder::new(fixture_catalog()));
        // (R join S) join B on R.bid = B.bid; now R sits on the A side.
        let inner = Expression::node(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Reserves", "R", "sid")],
                right_keys: vec![ColumnRef::new("Sailors", "S", "sid")],
            },
            vec![get("Reserves", "R"), get("Sailors", "S")],
        );
        let outer = Expression::node(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Reserves", "R", "bid")],
                right_keys: vec![ColumnRef::new("Boats", "B", "bid")],
            },
            vec![inner, get("Boats", "B")],
        );
        let (_, inserted) = space.insert(&outer).unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let rule = JoinAssocRule::new();
        let bindings = bind(&space, rule.pattern(), &mexpr);
        assert_eq!(bindings.len(), 1);
        assert!(rule.next_substitute(&space, &bindings[0]).unwrap().is_empty());
    }
}
