// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Plan explanation: the chosen physical tree annotated with per-node
//! costs, cardinality estimates, and required properties.

use pretty_xmlish::{Pretty, PrettyConfig};

use crate::cost::Cost;
use crate::nodes::Operator;
use crate::properties::PhysicalProps;

#[derive(Debug, Clone)]
pub struct ExplainNode {
    pub op: Operator,
    /// Total cost of the sub-plan rooted here.
    pub cost: Cost,
    /// Estimated output cardinality.
    pub rows: f64,
    pub required: PhysicalProps,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    fn pretty(&self) -> Pretty<'static> {
        let fields = vec![
            ("cost", Pretty::display(&self.cost)),
            ("rows", Pretty::display(&format!("{:.0}", self.rows))),
            ("order", Pretty::display(&self.required)),
        ];
        Pretty::simple_record(
            self.op.to_string(),
            fields,
            self.children.iter().map(|c| c.pretty()).collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExplainedPlan {
    pub root: ExplainNode,
}

impl ExplainedPlan {
    /// Total cost of the whole plan.
    pub fn cost(&self) -> Cost {
        self.root.cost
    }
}

impl std::fmt::Display for ExplainedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut config = PrettyConfig {
            need_boundaries: false,
            reduced_spaces: false,
            width: 300,
            ..Default::default()
        };
        let mut out = String::new();
        config.unicode(&mut out, &self.root.pretty());
        write!(f, "{out}")
    }
}
