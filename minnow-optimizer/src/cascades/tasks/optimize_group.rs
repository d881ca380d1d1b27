// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::trace;

use super::{OptimizeExpressionTask, OptimizeInputsTask, Task};
use crate::cascades::optimizer::{GroupId, Optimizer, SearchContext};
use crate::error::Error;
use crate::nodes::{ExprChild, Expression, Operator};
use crate::properties::DataOrder;

/// Finds the cheapest plan in a group for a required-property context.
/// Schedules `OptimizeExpression` for rule-driven members (logical and
/// item operators) and `OptimizeInputs` for physical members that already
/// exist from earlier passes.
pub(crate) struct OptimizeGroupTask {
    group: GroupId,
    ctx: SearchContext,
    last: bool,
}

impl OptimizeGroupTask {
    pub fn new(group: GroupId, ctx: SearchContext, last: bool) -> Self {
        Self { group, ctx, last }
    }
}

impl Task for OptimizeGroupTask {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error> {
        let group = optimizer.space().canonical(self.group);
        trace!(event = "task_begin", task = "optimize_group", group = %group, required = %self.ctx.required);

        if let Some(winner) = optimizer.space().group(group).winner(&self.ctx.required) {
            if winner.ready {
                trace!(event = "task_finish", task = "optimize_group", group = %group, result = "already optimized");
                return Ok(Vec::new());
            }
        }
        // A pass for these properties is already in flight further up the
        // stack; scheduling a second one would finalize the winner twice.
        if !optimizer.begin_optimize(group, &self.ctx.required) {
            trace!(event = "task_skip", task = "optimize_group", group = %group, result = "in flight");
            return Ok(Vec::new());
        }

        // A non-trivial order requirement gets its enforcer interned up
        // front so it is costed alongside the native members.
        if let DataOrder::Ordered(keys) = &self.ctx.required.order {
            let enforcer = Expression::new(
                Operator::Sort(keys.clone()),
                vec![ExprChild::Group(group)],
            );
            optimizer.space_mut().insert_into(&enforcer, group)?;
        }

        let members = optimizer.space().group(group).exprs().to_vec();
        let mut rule_side = Vec::new();
        let mut physical_side = Vec::new();
        for &member in &members {
            if optimizer.space().mexpr(member).op.is_physical() {
                physical_side.push(member);
            } else {
                rule_side.push(member);
            }
        }

        // Earliest-inserted members run first, physical members before
        // logical ones so early winners tighten the bound; the follow-up
        // that runs last inherits this task's `last` flag.
        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        let mut first = true;
        for &member in rule_side.iter().rev() {
            tasks.push(Box::new(OptimizeExpressionTask::new(
                member,
                self.ctx.clone(),
                first && self.last,
                false,
            )));
            first = false;
        }
        for &member in physical_side.iter().rev() {
            tasks.push(Box::new(OptimizeInputsTask::new(
                member,
                self.ctx.clone(),
                first && self.last,
            )));
            first = false;
        }
        trace!(event = "task_finish", task = "optimize_group", group = %group, members = members.len());
        Ok(tasks)
    }

    fn describe(&self) -> String {
        format!(
            "optimize_group {} required={}",
            self.group, self.ctx.required
        )
    }
}
