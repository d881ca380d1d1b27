// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::trace;

use super::{OptimizeExpressionTask, Task};
use crate::cascades::optimizer::{GroupId, Optimizer, SearchContext};
use crate::error::Error;

/// Enriches a group with equivalent logical alternatives by firing only
/// transformation rules, so pattern matching in `ApplyRule` sees every
/// member. No physical plans are produced.
pub(crate) struct ExploreGroupTask {
    group: GroupId,
    ctx: SearchContext,
}

impl ExploreGroupTask {
    pub fn new(group: GroupId, ctx: SearchContext) -> Self {
        Self { group, ctx }
    }
}

impl Task for ExploreGroupTask {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error> {
        let group = optimizer.space().canonical(self.group);
        trace!(event = "task_begin", task = "explore_group", group = %group);

        if optimizer.space().group(group).explored {
            trace!(event = "task_skip", task = "explore_group", group = %group, result = "already explored");
            return Ok(Vec::new());
        }
        if !optimizer.begin_explore(group) {
            trace!(event = "task_skip", task = "explore_group", group = %group, result = "in flight");
            return Ok(Vec::new());
        }

        let members: Vec<_> = optimizer
            .space()
            .group(group)
            .exprs()
            .iter()
            .copied()
            .filter(|&m| optimizer.space().mexpr(m).op.is_logical())
            .collect();
        if members.is_empty() {
            optimizer.space_mut().group_mut(group).explored = true;
            trace!(event = "task_finish", task = "explore_group", group = %group, result = "nothing to explore");
            return Ok(Vec::new());
        }

        // Earliest-inserted members fire first; the member task that runs
        // last raises the `explored` flag at the end of its chain.
        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        let mut first = true;
        for &member in members.iter().rev() {
            tasks.push(Box::new(OptimizeExpressionTask::new(
                member,
                self.ctx.clone(),
                first,
                true,
            )));
            first = false;
        }
        trace!(event = "task_finish", task = "explore_group", group = %group, members = members.len());
        Ok(tasks)
    }

    fn describe(&self) -> String {
        format!("explore_group {}", self.group)
    }
}
