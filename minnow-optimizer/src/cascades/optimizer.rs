// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The top-level driver: inserts the query into a fresh search space,
//! drains the task stack, and reads the winning plan back out.

use std::collections::HashSet;
use std::sync::Arc;

use minnow_catalog::Catalog;
use tracing::trace;

use super::memo::SearchSpace;
use super::tasks::{OptimizeGroupTask, Task};
use crate::cost::{Cost, CostModel, PageCostModel};
use crate::error::{Error, OptimizerError, QueryError};
use crate::explain::{ExplainNode, ExplainedPlan};
use crate::nodes::{ArcExpression, Expression};
use crate::properties::{LogicalProps, LogicalPropsBuilder, PhysicalProps};
use crate::rules::RuleManager;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct GroupId(pub(crate) usize);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct MultiExprId(pub(crate) usize);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}", self.0)
    }
}

impl std::fmt::Display for MultiExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a (sub-)search is asked for: required physical properties plus the
/// cost bound it must beat. Tighter bounds prune deeper.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub required: PhysicalProps,
    pub upper_bound: Cost,
}

impl SearchContext {
    pub fn unbounded(required: PhysicalProps) -> Self {
        Self {
            required,
            upper_bound: Cost::infinity(),
        }
    }
}

/// A cost-based optimizer instance: rule set, cost model, and the search
/// state of the most recent `optimize` call.
pub struct Optimizer {
    catalog: Arc<Catalog>,
    rules: RuleManager,
    cost: Box<dyn CostModel>,
    space: SearchSpace,
    tasks: Vec<Box<dyn Task>>,
    entered_inputs: HashSet<(MultiExprId, PhysicalProps)>,
    root: Option<GroupId>,
}

impl Optimizer {
    /// An optimizer with the standard rule catalogue and the page cost
    /// model.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let rules = RuleManager::standard(catalog.clone());
        let cost = Box::new(PageCostModel::new(catalog.clone()));
        Self::with_parts(catalog, rules, cost)
    }

    pub fn with_parts(
        catalog: Arc<Catalog>,
        rules: RuleManager,
        cost: Box<dyn CostModel>,
    ) -> Self {
        let space = SearchSpace::new(LogicalPropsBuilder::new(catalog.clone()));
        Self {
            catalog,
            rules,
            cost,
            space,
            tasks: Vec::new(),
            entered_inputs: HashSet::new(),
            root: None,
        }
    }

    /// Optimize under no required properties.
    pub fn optimize(&mut self, query: &ArcExpression) -> Result<ArcExpression, Error> {
        self.optimize_with_props(query, PhysicalProps::any())
    }

    /// Optimize with required physical properties at the root.
    pub fn optimize_with_props(
        &mut self,
        query: &ArcExpression,
        required: PhysicalProps,
    ) -> Result<ArcExpression, Error> {
        let root = self.run(query, required.clone())?;
        let mut visiting = Vec::new();
        Ok(self.extract(root, &required, &mut visiting)?)
    }

    /// Like `optimize`, but returns the plan annotated with per-node costs,
    /// cardinalities, and required properties.
    pub fn explain(&mut self, query: &ArcExpression) -> Result<ExplainedPlan, Error> {
        self.explain_with_props(query, PhysicalProps::any())
    }

    pub fn explain_with_props(
        &mut self,
        query: &ArcExpression,
        required: PhysicalProps,
    ) -> Result<ExplainedPlan, Error> {
        let root = self.run(query, required.clone())?;
        let mut visiting = Vec::new();
        let root_node = self.explain_node(root, &required, &mut visiting)?;
        Ok(ExplainedPlan { root: root_node })
    }

    /// The search state of the most recent call; `dump()` it for the memo.
    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Root group of the most recent call.
    pub fn root(&self) -> Option<GroupId> {
        self.root.map(|g| self.space.canonical(g))
    }

    pub fn dump(&self) -> String {
        self.space.dump()
    }

    pub fn rules_mut(&mut self) -> &mut RuleManager {
        &mut self.rules
    }

    fn run(&mut self, query: &ArcExpression, required: PhysicalProps) -> Result<GroupId, Error> {
        self.space = SearchSpace::new(LogicalPropsBuilder::new(self.catalog.clone()));
        self.tasks.clear();
        self.entered_inputs.clear();

        let (root, _) = self.space.insert(query)?;
        self.root = Some(root);
        trace!(event = "optimize_begin", root = %root, required = %required);
        self.tasks.push(Box::new(OptimizeGroupTask::new(
            root,
            SearchContext::unbounded(required),
            true,
        )));
        while let Some(task) = self.tasks.pop() {
            trace!(event = "task_pop", task = %task.describe());
            let follow_ups = task.perform(self)?;
            for follow_up in follow_ups {
                self.tasks.push(follow_up);
            }
        }
        trace!(event = "optimize_end", groups = self.space.group_count(), exprs = self.space.expr_count());
        Ok(root)
    }

    fn no_plan(&self, group: GroupId) -> QueryError {
        let operator = self
            .space
            .group(group)
            .exprs()
            .iter()
            .map(|&e| &self.space.mexpr(e).op)
            .find(|op| op.is_logical() || op.is_element())
            .map(|op| op.to_string())
            .unwrap_or_else(|| "<empty group>".to_string());
        QueryError::NoPlan {
            operator,
            group,
        }
    }

    fn winner_of(
        &self,
        group: GroupId,
        required: &PhysicalProps,
        visiting: &mut Vec<(GroupId, PhysicalProps)>,
    ) -> Result<super::memo::WinnerInfo, QueryError> {
        let key = (group, required.clone());
        if visiting.contains(&key) {
            return Err(self.no_plan(group));
        }
        self.space
            .group(group)
            .winner(required)
            .filter(|w| w.ready)
            .and_then(|w| w.best.clone())
            .ok_or_else(|| self.no_plan(group))
    }

    fn extract(
        &self,
        group: GroupId,
        required: &PhysicalProps,
        visiting: &mut Vec<(GroupId, PhysicalProps)>,
    ) -> Result<ArcExpression, QueryError> {
        let group = self.space.canonical(group);
        let info = self.winner_of(group, required, visiting)?;
        visiting.push((group, required.clone()));
        let mexpr = self.space.mexpr(info.expr).clone();
        let mut children = Vec::with_capacity(mexpr.children.len());
        for (&child, child_props) in mexpr.children.iter().zip(&info.input_props) {
            children.push(self.extract(child, child_props, visiting)?);
        }
        visiting.pop();
        Ok(Expression::node(mexpr.op, children))
    }

    fn explain_node(
        &self,
        group: GroupId,
        required: &PhysicalProps,
        visiting: &mut Vec<(GroupId, PhysicalProps)>,
    ) -> Result<ExplainNode, QueryError> {
        let group = self.space.canonical(group);
        let info = self.winner_of(group, required, visiting)?;
        visiting.push((group, required.clone()));
        let mexpr = self.space.mexpr(info.expr).clone();
        let mut children = Vec::with_capacity(mexpr.children.len());
        for (&child, child_props) in mexpr.children.iter().zip(&info.input_props) {
            children.push(self.explain_node(child, child_props, visiting)?);
        }
        visiting.pop();
        Ok(ExplainNode {
            op: mexpr.op,
            cost: info.cost,
            rows: self.space.group(group).logical.cardinality,
            required: required.clone(),
            children,
        })
    }

    // Task-facing API.

    pub(crate) fn space_mut(&mut self) -> &mut SearchSpace {
        &mut self.space
    }

    pub(crate) fn rules(&self) -> &RuleManager {
        &self.rules
    }

    /// Local cost of one multi-expression given its inputs' logical
    /// properties.
    pub(crate) fn local_cost(&self, expr: MultiExprId) -> Cost {
        let mexpr = self.space.mexpr(expr);
        let child_props: Vec<Arc<LogicalProps>> = mexpr
            .children
            .iter()
            .map(|&g| self.space.group(g).logical.clone())
            .collect();
        let refs: Vec<&LogicalProps> = child_props.iter().map(|p| p.as_ref()).collect();
        self.cost.local_cost(&mexpr.op, &refs)
    }

    /// Claims the optimization pass for `(group, props)`; false when one
    /// is already in flight or finished.
    pub(crate) fn begin_optimize(&mut self, group: GroupId, required: &PhysicalProps) -> bool {
        self.space
            .group_mut(group)
            .pending
            .insert(required.clone())
    }

    /// Claims the exploration pass for a group.
    pub(crate) fn begin_explore(&mut self, group: GroupId) -> bool {
        let group = self.space.group_mut(group);
        if group.exploring {
            return false;
        }
        group.exploring = true;
        true
    }

    /// Claims the input-costing pass for `(expression, props)`.
    pub(crate) fn enter_inputs(&mut self, expr: MultiExprId, required: &PhysicalProps) -> bool {
        self.entered_inputs.insert((expr, required.clone()))
    }

    /// Raise the completion flag a `last` task carries: `explored` for
    /// exploration passes, the winner's `ready` bit otherwise. A winner
    /// must never be finalized twice.
    pub(crate) fn finalize(
        &mut self,
        group: GroupId,
        ctx: &SearchContext,
        exploring: bool,
    ) -> Result<(), OptimizerError> {
        let group = self.space.canonical(group);
        if exploring {
            trace!(event = "group_explored", group = %group);
            self.space.group_mut(group).explored = true;
            return Ok(());
        }
        let entry = self.space.winner_entry(group, ctx.required.clone());
        if entry.ready {
            return Err(OptimizerError::WinnerFinalizedTwice { group });
        }
        entry.ready = true;
        trace!(event = "group_optimized", group = %group, required = %ctx.required);
        Ok(())
    }
}
