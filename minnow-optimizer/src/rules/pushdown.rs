// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Push-down transformations: predicates through joins, projections into
//! join inputs.

use crate::cascades::SearchSpace;
use crate::error::OptimizerError;
use crate::nodes::{ArcExpression, ColumnRef, ExprChild, Expression, Operator};
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

struct JoinBinding {
    left_keys: Vec<ColumnRef>,
    right_keys: Vec<ColumnRef>,
    left: crate::cascades::GroupId,
    right: crate::cascades::GroupId,
}

fn destructure_join(
    rule: &'static str,
    binding: &Expression,
    join: &Expression,
) -> Result<JoinBinding, OptimizerError> {
    let Operator::EquiJoin {
        left_keys,
        right_keys,
    } = join.operator()
    else {
        return Err(bad_pattern(rule, binding));
    };
    let (Some(left), Some(right)) = (join.input(0).as_group(), join.input(1).as_group()) else {
        return Err(bad_pattern(rule, binding));
    };
    Ok(JoinBinding {
        left_keys: left_keys.clone(),
        right_keys: right_keys.clone(),
        left,
        right,
    })
}

/// `Select(A join B, p)` becomes `Select(A, p) join B` (or the mirror
/// image) when the predicate references only one side.
pub struct SelectPushdownRule {
    pattern: ArcExpression,
}

impl SelectPushdownRule {
    pub fn new() -> Self {
        Self {
            pattern: Expression::new(
                Operator::Select,
                vec![
                    ExprChild::Expr(Expression::new(equi_join_op(), vec![leaf(0), leaf(1)])),
                    leaf(2),
                ],
            ),
        }
    }
}

impl Rule for SelectPushdownRule {
    fn name(&self) -> &'static str {
        "select_pushdown"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn next_substitute(
        &self,
        space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Some(join) = binding.input(0).as_expr() else {
            return Err(bad_pattern(self.name(), binding));
        };
        let join = destructure_join(self.name(), binding, join)?;
        let Some(predicate) = binding.input(1).as_group() else {
            return Err(bad_pattern(self.name(), binding));
        };

        // The predicate group's schema lists exactly the columns the
        // predicate references.
        let referenced = &space.group(predicate).logical.schema;
        if referenced.is_empty() {
            return Ok(Vec::new());
        }
        let left_schema = &space.group(join.left).logical.schema;
        let right_schema = &space.group(join.right).logical.schema;

        let rebuild = |into_left: bool| {
            let select_side = if into_left { join.left } else { join.right };
            let pushed = Expression::new(
                Operator::Select,
                vec![ExprChild::Group(select_side), ExprChild::Group(predicate)],
            );
            let (new_left, new_right) = if into_left {
                (ExprChild::Expr(pushed), ExprChild::Group(join.right))
            } else {
                (ExprChild::Group(join.left), ExprChild::Expr(pushed))
            };
            Expression::new(
                Operator::EquiJoin {
                    left_keys: join.left_keys.clone(),
                    right_keys: join.right_keys.clone(),
                },
                vec![new_left, new_right],
            )
        };

        if left_schema.contains_all(referenced.columns.iter().map(|m| &m.column)) {
            Ok(vec![rebuild(true)])
        } else if right_schema.contains_all(referenced.columns.iter().map(|m| &m.column)) {
            Ok(vec![rebuild(false)])
        } else {
            Ok(Vec::new())
        }
    }
}

/// `Project(A join B)` narrows both join inputs to the columns the
/// projection and the join condition need. A no-op guard keeps the rule
/// from spinning once the inputs are already narrow.
pub struct ProjectPushdownRule {
    pattern: ArcExpression,
}

impl ProjectPushdownRule {
    pub fn new() -> Self {
        Self {
            pattern: Expression::new(
                Operator::Project(Vec::new()),
                vec![ExprChild::Expr(Expression::new(
                    equi_join_op(),
                    vec![leaf(0), leaf(1)],
                ))],
            ),
        }
    }
}

impl Rule for ProjectPushdownRule {
    fn name(&self) -> &'static str {
        "project_pushdown"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn next_substitute(
        &self,
        space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Operator::Project(columns) = binding.operator() else {
            return Err(bad_pattern(self.name(), binding));
        };
        let Some(join) = binding.input(0).as_expr() else {
            return Err(bad_pattern(self.name(), binding));
        };
        let join = destructure_join(self.name(), binding, join)?;

        let needed = |side: crate::cascades::GroupId, keys: &[ColumnRef]| {
            let schema = &space.group(side).logical.schema;
            schema
                .columns
                .iter()
                .map(|m| m.column.clone())
                .filter(|c| columns.contains(c) || keys.contains(c))
                .collect::<Vec<_>>()
        };
        let need_left = needed(join.left, &join.left_keys);
        let need_right = needed(join.right, &join.right_keys);
        if need_left.len() == space.group(join.left).logical.schema.len()
            && need_right.len() == space.group(join.right).logical.schema.len()
        {
            return Ok(Vec::new());
        }

        let trimmed = Expression::new(
            Operator::EquiJoin {
                left_keys: join.left_keys.clone(),
                right_keys: join.right_keys.clone(),
            },
            vec![
                ExprChild::Expr(Expression::new(
                    Operator::Project(need_left),
                    vec![ExprChild::Group(join.left)],
                )),
                ExprChild::Expr(Expression::new(
                    Operator::Project(need_right),
                    vec![ExprChild::Group(join.right)],
                )),
            ],
        );
        Ok(vec![Expression::new(
            Operator::Project(columns.clone()),
            vec![ExprChild::Expr(trimmed)],
        )])
    }
}
