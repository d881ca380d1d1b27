// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::trace;

use super::{OptimizeExpressionTask, OptimizeInputsTask, Task};
use crate::cascades::memo::Inserted;
use crate::cascades::optimizer::{MultiExprId, Optimizer, SearchContext};
use crate::error::Error;
use crate::rules::{bind, RuleId};

/// Fires one rule on one multi-expression: binds the pattern, inserts
/// every substitute into the expression's group, and schedules follow-up
/// work for whatever is new.
pub(crate) struct ApplyRuleTask {
    expr: MultiExprId,
    rule: RuleId,
    ctx: SearchContext,
    last: bool,
    exploring: bool,
}

impl ApplyRuleTask {
    pub fn new(
        expr: MultiExprId,
        rule: RuleId,
        ctx: SearchContext,
        last: bool,
        exploring: bool,
    ) -> Self {
        Self {
            expr,
            rule,
            ctx,
            last,
            exploring,
        }
    }
}

impl Task for ApplyRuleTask {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error> {
        let expr = optimizer.space().resolve(self.expr);
        let rule = optimizer.rules().rule(self.rule).clone();
        trace!(event = "task_begin", task = "apply_rule", expr = %expr, rule = rule.name());

        // The same move can be enqueued twice when two parents request
        // exploration of one group; the bit makes the second a no-op.
        if optimizer.space().is_rule_fired(expr, self.rule) {
            trace!(event = "task_skip", task = "apply_rule", expr = %expr, rule = rule.name(), result = "already fired");
            if self.last {
                let group = optimizer.space().mexpr_group(expr);
                optimizer.finalize(group, &self.ctx, self.exploring)?;
            }
            return Ok(Vec::new());
        }

        let mexpr = optimizer.space().mexpr(expr).clone();
        let group = optimizer.space().mexpr_group(expr);
        let bindings = bind(optimizer.space(), rule.pattern(), &mexpr);
        optimizer
            .space_mut()
            .mark_rule_fired(expr, self.rule, rule.name())?;

        let mut new_exprs = Vec::new();
        for binding in &bindings {
            for substitute in rule.next_substitute(optimizer.space(), binding)? {
                let (_, inserted) = optimizer.space_mut().insert_into(&substitute, group)?;
                if let Inserted::New(id) = inserted {
                    trace!(event = "rule_produced", rule = rule.name(), expr = %id, op = %optimizer.space().mexpr(id).op);
                    new_exprs.push(id);
                }
            }
        }

        // New logical members re-enter the rule loop; new physical members
        // go straight to input optimization. Earliest-inserted runs first,
        // the one that runs last inherits `last`.
        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        let mut first = true;
        for &id in new_exprs.iter().rev() {
            if optimizer.space().mexpr(id).op.is_physical() {
                tasks.push(Box::new(OptimizeInputsTask::new(
                    id,
                    self.ctx.clone(),
                    first && self.last,
                )));
            } else {
                tasks.push(Box::new(OptimizeExpressionTask::new(
                    id,
                    self.ctx.clone(),
                    first && self.last,
                    self.exploring,
                )));
            }
            first = false;
        }
        if tasks.is_empty() && self.last {
            optimizer.finalize(group, &self.ctx, self.exploring)?;
        }
        trace!(event = "task_finish", task = "apply_rule", expr = %expr, rule = rule.name(), produced = new_exprs.len());
        Ok(tasks)
    }

    fn describe(&self) -> String {
        format!("apply_rule {} rule={}", self.expr, self.rule)
    }
}
