// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Task types driving the search.
//!
//! Tasks run off a single LIFO stack; a task returns its follow-up work as
//! a list whose elements are pushed in order, so the **last** element runs
//! first. Completion bookkeeping rides on the `last` flag: the task that
//! runs last in a group's fan-out raises the group's `optimized` (or
//! `explored`) state, and every hand-off below keeps the flag on the
//! follow-up that will run last.

mod apply_rule;
mod explore_group;
mod optimize_expression;
mod optimize_group;
mod optimize_inputs;

use super::optimizer::Optimizer;
use crate::error::Error;

pub(crate) use apply_rule::ApplyRuleTask;
pub(crate) use explore_group::ExploreGroupTask;
pub(crate) use optimize_expression::OptimizeExpressionTask;
pub(crate) use optimize_group::OptimizeGroupTask;
pub(crate) use optimize_inputs::OptimizeInputsTask;

pub(crate) trait Task: 'static {
    fn perform(&self, optimizer: &mut Optimizer) -> Result<Vec<Box<dyn Task>>, Error>;

    fn describe(&self) -> String;
}
