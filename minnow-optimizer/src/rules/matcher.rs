// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Binds rule patterns against multi-expressions.
//!
//! A binding is the pattern tree made concrete: pattern operators are
//! replaced by the operators actually matched (so rules can read key lists
//! and the like), and `Leaf(i)` positions become group children. Nested
//! pattern nodes enumerate every logical member of the corresponding input
//! group, so the result is the full cross product of alternatives.

use itertools::Itertools;

use crate::cascades::{MultiExpr, SearchSpace};
use crate::nodes::{ArcExpression, ExprChild, Expression, Operator};
use crate::rules::Rule;

/// Whether a rule's pattern root matches an operator, by variant.
pub fn root_matches(rule: &dyn Rule, op: &Operator) -> bool {
    std::mem::discriminant(rule.pattern().operator()) == std::mem::discriminant(op)
}

/// All bindings of `pattern` against `mexpr`. Empty when the root does not
/// match or some nested pattern position has no matching member.
pub fn bind(space: &SearchSpace, pattern: &Expression, mexpr: &MultiExpr) -> Vec<ArcExpression> {
    if std::mem::discriminant(pattern.operator()) != std::mem::discriminant(&mexpr.op)
        || pattern.size() != mexpr.children.len()
    {
        return Vec::new();
    }
    // A childless pattern binds exactly once: the root alone.
    if pattern.size() == 0 {
        return vec![Expression::new(mexpr.op.clone(), Vec::new())];
    }
    let mut alternatives: Vec<Vec<ExprChild>> = Vec::with_capacity(pattern.size());
    for (slot, &input) in pattern.children.iter().zip(&mexpr.children) {
        let sub_pattern = match slot {
            ExprChild::Expr(p) => p,
            ExprChild::Group(_) => return Vec::new(),
        };
        if sub_pattern.operator().is_leaf() {
            alternatives.push(vec![ExprChild::Group(space.canonical(input))]);
            continue;
        }
        let mut matched = Vec::new();
        for &member in space.group(input).exprs() {
            let candidate = space.mexpr(member);
            if !candidate.op.is_logical() {
                continue;
            }
            matched.extend(
                bind(space, sub_pattern, candidate)
                    .into_iter()
                    .map(ExprChild::Expr),
            );
        }
        if matched.is_empty() {
            return Vec::new();
        }
        alternatives.push(matched);
    }
    alternatives
        .into_iter()
        .multi_cartesian_product()
        .map(|children| Expression::new(mexpr.op.clone(), children))
        .collect()
}
