// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The rule catalogue: transformation rules (logical to logical),
//! implementation rules (logical to physical), and the pattern matcher
//! that binds rule patterns against the memo.

mod joins;
mod matcher;
mod physical;
mod pushdown;

use std::sync::Arc;

use minnow_catalog::Catalog;

use crate::cascades::{MultiExpr, SearchContext, SearchSpace};
use crate::error::OptimizerError;
use crate::nodes::{ArcExpression, Expression};

pub use joins::{JoinAssocRule, JoinCommuteRule};
pub use matcher::{bind, root_matches};
pub use physical::{
    DistinctToHashDistinctRule, EquiJoinToHashJoinRule, EquiJoinToNestedLoopsRule,
    EquiJoinToSortMergeRule, GetTableToFileScanRule, GetTableToIndexScanRule,
    ProjectToProjectListRule, SelectToFilterRule,
};
pub use pushdown::{ProjectPushdownRule, SelectPushdownRule};

pub type RuleId = usize;

/// Priority of a rule application in a given context. `None` suppresses
/// the application; higher promises fire first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Promise {
    None,
    Physical,
    Logical,
    Hash,
}

/// A rewrite over the memo. The pattern is an expression tree whose
/// `Leaf(i)` positions bind to input groups; `next_substitute` turns each
/// binding into replacement expressions for the matched group.
pub trait Rule: 'static + Send + Sync {
    fn name(&self) -> &'static str;

    fn pattern(&self) -> &ArcExpression;

    fn promise(
        &self,
        _space: &SearchSpace,
        _mexpr: &MultiExpr,
        _ctx: &SearchContext,
    ) -> Promise {
        if self.is_impl_rule() {
            Promise::Physical
        } else {
            Promise::Logical
        }
    }

    fn next_substitute(
        &self,
        space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError>;

    /// Implementation rules produce physical substitutes and only fire
    /// during optimization, never during exploration.
    fn is_impl_rule(&self) -> bool {
        false
    }
}

/// Owns the rule set for one optimizer instance and hands out the bit ids
/// used for fired-rule bookkeeping.
pub struct RuleManager {
    rules: Vec<Arc<dyn Rule>>,
    disabled: u64,
}

impl RuleManager {
    /// `fired_rules` bitsets are 64 bits wide.
    pub const MAX_RULES: usize = 64;

    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        assert!(
            rules.len() <= Self::MAX_RULES,
            "at most {} rules are supported",
            Self::MAX_RULES
        );
        Self { rules, disabled: 0 }
    }

    /// The standard catalogue: transformation rules first, implementation
    /// rules after, so ids stay stable across runs.
    pub fn standard(catalog: Arc<Catalog>) -> Self {
        Self::new(vec![
            Arc::new(JoinCommuteRule::new()),
            Arc::new(JoinAssocRule::new()),
            Arc::new(SelectPushdownRule::new()),
            Arc::new(ProjectPushdownRule::new()),
            Arc::new(GetTableToFileScanRule::new()),
            Arc::new(GetTableToIndexScanRule::new(catalog)),
            Arc::new(EquiJoinToNestedLoopsRule::new()),
            Arc::new(EquiJoinToHashJoinRule::new()),
            Arc::new(EquiJoinToSortMergeRule::new()),
            Arc::new(SelectToFilterRule::new()),
            Arc::new(ProjectToProjectListRule::new()),
            Arc::new(DistinctToHashDistinctRule::new()),
        ])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, id: RuleId) -> &Arc<dyn Rule> {
        &self.rules[id]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Arc<dyn Rule>)> {
        self.rules.iter().enumerate()
    }

    pub fn disable(&mut self, id: RuleId) {
        self.disabled |= 1 << id;
    }

    pub fn enable(&mut self, id: RuleId) {
        self.disabled &= !(1 << id);
    }

    pub fn is_enabled(&self, id: RuleId) -> bool {
        self.disabled & (1 << id) == 0
    }

    /// Find a rule id by name; handy for tests that disable rules.
    pub fn find(&self, name: &str) -> Option<RuleId> {
        self.rules.iter().position(|r| r.name() == name)
    }
}

/// Shorthand for a `Leaf(i)` pattern position.
pub(crate) fn leaf(i: usize) -> crate::nodes::ExprChild {
    crate::nodes::ExprChild::Expr(Expression::leaf(crate::nodes::Operator::Leaf(i)))
}
