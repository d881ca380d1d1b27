// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::trace;

use super::{ApplyRuleTask, ExploreGroupTask, OptimizeInputsTask, Task};
use crate::cascades::optimizer::{MultiExprId, Optimizer, SearchContext};
use crate::error::Error;
use crate::nodes::ExprChild;
use crate::rules::{root_matches, Promise, RuleId};

/// Enumerates the rule applications ("moves") available on one
/// multi-expression, sorted by descending promise, and schedules input
/// exploration for every nested pattern position so bindings see all
/// alternatives.
pub(crate) struct OptimizeExpressionTask {
    expr: MultiExprId,
    ctx: SearchContext,
    last: bool,
    exploring: bool,
}

impl OptimizeExpressionTask {
    pub fn new(expr: MultiExprId, ctx: SearchContext, last: bool, exploring: bool) -> Self {
        Self {
            expr,
            ctx,
            last,
            exploring,
        }
    }
}

impl Task for OptimizeExpressionTask {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error> {
        let expr = optimizer.space().resolve(self.expr);
        let mexpr = optimizer.space().mexpr(expr).clone();
        trace!(event = "task_begin", task = "optimize_expression", expr = %expr, op = %mexpr.op, exploring = self.exploring);

        // Item operators are cost-trivial and skip the rule machinery.
        if mexpr.op.is_element() {
            return Ok(vec![Box::new(OptimizeInputsTask::new(
                expr,
                self.ctx.clone(),
                self.last,
            ))]);
        }

        let mut moves: Vec<(Promise, RuleId)> = Vec::new();
        for (rule_id, rule) in optimizer.rules().rules() {
            if !optimizer.rules().is_enabled(rule_id) {
                continue;
            }
            if self.exploring && rule.is_impl_rule() {
                continue;
            }
            if optimizer.space().is_rule_fired(expr, rule_id) {
                continue;
            }
            if !root_matches(rule.as_ref(), &mexpr.op) {
                continue;
            }
            let promise = rule.promise(optimizer.space(), &mexpr, &self.ctx);
            if promise == Promise::None {
                continue;
            }
            moves.push((promise, rule_id));
        }
        // Follow-ups run in reverse push order, so sorting ascending by
        // promise makes the best move fire first. Lower rule ids win ties.
        moves.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        let mut first = true;
        for &(promise, rule_id) in &moves {
            trace!(event = "enqueue_move", expr = %expr, rule = optimizer.rules().rule(rule_id).name(), promise = ?promise);
            tasks.push(Box::new(ApplyRuleTask::new(
                expr,
                rule_id,
                self.ctx.clone(),
                first && self.last,
                self.exploring,
            )));
            first = false;
        }

        // Nested (non-leaf) pattern positions need their input group
        // explored before the rule binds against it. These run before any
        // `ApplyRule` because they are pushed after.
        let mut to_explore = Vec::new();
        for &(_, rule_id) in &moves {
            let pattern = optimizer.rules().rule(rule_id).pattern().clone();
            for (slot, &input) in pattern.children.iter().zip(&mexpr.children) {
                let nested = match slot {
                    ExprChild::Expr(p) => !p.operator().is_leaf(),
                    ExprChild::Group(_) => false,
                };
                if !nested {
                    continue;
                }
                let input = optimizer.space().canonical(input);
                if !optimizer.space().group(input).explored && !to_explore.contains(&input) {
                    to_explore.push(input);
                }
            }
        }
        for group in to_explore {
            tasks.push(Box::new(ExploreGroupTask::new(group, self.ctx.clone())));
        }

        if tasks.is_empty() && self.last {
            let group = optimizer.space().mexpr_group(expr);
            optimizer.finalize(group, &self.ctx, self.exploring)?;
        }
        trace!(event = "task_finish", task = "optimize_expression", expr = %expr, moves = moves.len());
        Ok(tasks)
    }

    fn describe(&self) -> String {
        format!(
            "optimize_expression {} exploring={}",
            self.expr, self.exploring
        )
    }
}
