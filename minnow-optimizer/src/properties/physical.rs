// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use serde::{Deserialize, Serialize};

use crate::nodes::{Direction, Operator, SortKey};

/// The tuple order a plan delivers or a caller requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataOrder {
    /// No requirement / no known order.
    Any,
    Ordered(Vec<SortKey>),
}

impl DataOrder {
    /// A delivered order satisfies a required one iff the requirement is
    /// `Any` or a prefix of the delivered keys.
    pub fn satisfies(&self, required: &DataOrder) -> bool {
        match required {
            DataOrder::Any => true,
            DataOrder::Ordered(want) => match self {
                DataOrder::Any => false,
                DataOrder::Ordered(have) => {
                    have.len() >= want.len() && have[..want.len()] == want[..]
                }
            },
        }
    }
}

impl std::fmt::Display for DataOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataOrder::Any => write!(f, "any"),
            DataOrder::Ordered(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
        }
    }
}

/// Physical properties required of a sub-plan. Ordering is the only
/// property tracked; partitioning would slot in beside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalProps {
    pub order: DataOrder,
}

impl Default for DataOrder {
    fn default() -> Self {
        DataOrder::Any
    }
}

impl PhysicalProps {
    pub fn any() -> Self {
        Self {
            order: DataOrder::Any,
        }
    }

    pub fn ordered(keys: Vec<SortKey>) -> Self {
        Self {
            order: DataOrder::Ordered(keys),
        }
    }

    pub fn is_any(&self) -> bool {
        self.order == DataOrder::Any
    }

    pub fn satisfied_by(&self, delivered: &DataOrder) -> bool {
        delivered.satisfies(&self.order)
    }
}

impl std::fmt::Display for PhysicalProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.order)
    }
}

fn ascending(columns: &[crate::nodes::ColumnRef]) -> DataOrder {
    DataOrder::Ordered(
        columns
            .iter()
            .cloned()
            .map(|column| SortKey {
                column,
                direction: Direction::Asc,
            })
            .collect(),
    )
}

/// The order a physical operator delivers on its own, independent of any
/// requirement pushed onto its inputs.
pub fn delivered_order(op: &Operator) -> DataOrder {
    match op {
        Operator::IndexScan { key_columns, .. } => ascending(key_columns),
        Operator::SortMergeJoin { left_keys, .. } => ascending(left_keys),
        Operator::Sort(keys) => DataOrder::Ordered(keys.clone()),
        _ => DataOrder::Any,
    }
}

/// The physical properties each input must deliver for `op` to satisfy
/// `required`, or `None` when `op` cannot satisfy it at all.
///
/// `Filter` and `ProjectList` preserve their input's order and therefore
/// forward the requirement; everything else either delivers a concrete
/// order or none.
pub fn child_requirements(op: &Operator, required: &PhysicalProps) -> Option<Vec<PhysicalProps>> {
    match op {
        Operator::FileScan(_) | Operator::IndexScan { .. } => {
            required.satisfied_by(&delivered_order(op)).then(Vec::new)
        }
        Operator::NestedLoopsJoin { .. } | Operator::HashJoin { .. } => required
            .is_any()
            .then(|| vec![PhysicalProps::any(), PhysicalProps::any()]),
        Operator::SortMergeJoin {
            left_keys,
            right_keys,
        } => required.satisfied_by(&delivered_order(op)).then(|| {
            vec![
                PhysicalProps {
                    order: ascending(left_keys),
                },
                PhysicalProps {
                    order: ascending(right_keys),
                },
            ]
        }),
        Operator::Filter => Some(vec![required.clone(), PhysicalProps::any()]),
        Operator::ProjectList(columns) => {
            let covered = match &required.order {
                DataOrder::Any => true,
                DataOrder::Ordered(keys) => keys.iter().all(|k| columns.contains(&k.column)),
            };
            covered.then(|| vec![required.clone()])
        }
        Operator::HashDistinct => required.is_any().then(|| vec![PhysicalProps::any()]),
        Operator::Sort(_) => required
            .satisfied_by(&delivered_order(op))
            .then(|| vec![PhysicalProps::any()]),
        Operator::Attr(_) | Operator::Const(_) => required.is_any().then(Vec::new),
        Operator::Cmp(_) | Operator::Logic(_) => required
            .is_any()
            .then(|| vec![PhysicalProps::any(), PhysicalProps::any()]),
        // Logical operators and pattern leaves are never costed.
        _ => None,
    }
}
