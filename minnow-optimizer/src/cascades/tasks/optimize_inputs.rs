// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::trace;

use super::{OptimizeGroupTask, Task};
use crate::cascades::memo::WinnerInfo;
use crate::cascades::optimizer::{GroupId, MultiExprId, Optimizer, SearchContext};
use crate::error::Error;
use crate::properties::child_requirements;

/// Where a resumable input pass picks back up.
#[derive(Debug, Clone, Copy, Default)]
struct Continuation {
    next_child: usize,
    /// Set when the pass already yielded to `OptimizeGroup` for
    /// `next_child`; a second miss means the input cannot be planned.
    returned: bool,
}

/// Costs one physical multi-expression: optimizes each input group under
/// the properties that input must deliver, sums the costs against the
/// bound, and updates the winner entry. Carries the branch-and-bound
/// pruning.
pub(crate) struct OptimizeInputsTask {
    expr: MultiExprId,
    ctx: SearchContext,
    last: bool,
    continue_from: Option<Continuation>,
}

impl OptimizeInputsTask {
    pub fn new(expr: MultiExprId, ctx: SearchContext, last: bool) -> Self {
        Self {
            expr,
            ctx,
            last,
            continue_from: None,
        }
    }

    fn resume_at(&self, next_child: usize, returned: bool) -> Self {
        Self {
            expr: self.expr,
            ctx: self.ctx.clone(),
            last: self.last,
            continue_from: Some(Continuation {
                next_child,
                returned,
            }),
        }
    }

    fn finish(
        &self,
        optimizer: &mut Optimizer,
        group: GroupId,
    ) -> Result<Vec<Box<dyn Task>>, Error> {
        if self.last {
            optimizer.finalize(group, &self.ctx, false)?;
        }
        Ok(Vec::new())
    }

    fn prune(
        &self,
        optimizer: &mut Optimizer,
        group: GroupId,
        reason: &'static str,
    ) -> Result<Vec<Box<dyn Task>>, Error> {
        trace!(event = "task_prune", task = "optimize_inputs", expr = %self.expr, reason = reason);
        self.finish(optimizer, group)
    }
}

impl Task for OptimizeInputsTask {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error> {
        let expr = optimizer.space().resolve(self.expr);
        let mexpr = optimizer.space().mexpr(expr).clone();
        let group = optimizer.space().mexpr_group(expr);
        trace!(event = "task_begin", task = "optimize_inputs", expr = %expr, op = %mexpr.op, required = %self.ctx.required, continue_from = ?self.continue_from);

        if self.continue_from.is_none() && !optimizer.enter_inputs(expr, &self.ctx.required) {
            // Merges can replay a member under the same requirement; one
            // pass per (expression, properties) pair is enough.
            return self.prune(optimizer, group, "already entered");
        }

        let Some(child_reqs) = child_requirements(&mexpr.op, &self.ctx.required) else {
            return self.prune(optimizer, group, "cannot deliver required order");
        };

        let cont = self.continue_from.unwrap_or_default();

        // The context bound tightens as winners land.
        let mut bound = self.ctx.upper_bound;
        if let Some(winner) = optimizer.space().group(group).winner(&self.ctx.required) {
            if let Some(best) = &winner.best {
                bound = bound.min(best.cost);
            }
        }

        let mut partial = optimizer.local_cost(expr);
        for i in 0..cont.next_child {
            let child = optimizer.space().canonical(mexpr.children[i]);
            let best = optimizer
                .space()
                .group(child)
                .winner(&child_reqs[i])
                .and_then(|w| w.best.as_ref());
            match best {
                Some(info) => partial = partial + info.cost,
                None => return self.prune(optimizer, group, "input has no plan"),
            }
        }
        if partial >= bound {
            return self.prune(optimizer, group, "bound exceeded");
        }

        if cont.next_child < mexpr.children.len() {
            let idx = cont.next_child;
            let child = optimizer.space().canonical(mexpr.children[idx]);
            let required = child_reqs[idx].clone();
            let ready = optimizer
                .space()
                .group(child)
                .winner(&required)
                .map(|w| w.ready)
                .unwrap_or(false);
            if ready {
                return Ok(vec![Box::new(self.resume_at(idx + 1, false))]);
            }
            if cont.returned {
                // The input pass came back without a ready winner, which
                // only happens on a cyclic dependency. Give up on this
                // member.
                return self.prune(optimizer, group, "input unavailable");
            }
            let child_ctx = SearchContext {
                required,
                upper_bound: bound.saturating_sub(partial),
            };
            trace!(event = "task_yield", task = "optimize_inputs", expr = %expr, input = %child, required = %child_ctx.required);
            return Ok(vec![
                Box::new(self.resume_at(idx, true)),
                Box::new(OptimizeGroupTask::new(child, child_ctx, true)),
            ]);
        }

        let total = partial;
        let entry = optimizer
            .space_mut()
            .winner_entry(group, self.ctx.required.clone());
        let better = entry.best.as_ref().map(|b| total < b.cost).unwrap_or(true);
        if better {
            trace!(event = "new_winner", group = %group, expr = %expr, cost = %total, required = %self.ctx.required);
            entry.best = Some(WinnerInfo {
                expr,
                cost: total,
                input_props: child_reqs,
            });
        }
        self.finish(optimizer, group)
    }

    fn describe(&self) -> String {
        format!("optimize_inputs {} required={}", self.expr, self.ctx.required)
    }
}
