// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Implementation rules: one physical counterpart (or several, for access
//! paths) per logical operator. Substitutes always keep the original's
//! input groups.

use std::sync::Arc;

use minnow_catalog::Catalog;

use crate::cascades::{MultiExpr, SearchContext, SearchSpace};
use crate::error::OptimizerError;
use crate::nodes::{ArcExpression, ColumnRef, Expression, Operator, TableRef};
use crate::rules::{leaf, Promise, Rule};

fn equi_join_op() -> Operator {
    Operator::EquiJoin {
        left_keys: Vec::new(),
        right_keys: Vec::new(),
    }
}

fn bad_pattern(rule: &'static str, binding: &Expression) -> OptimizerError {
    OptimizerError::BadPattern {
        rule,
        message: format!("unexpected binding shape {binding}"),
    }
}

macro_rules! define_join_impl_rule {
    ($rule:ident, $name:literal, $physical:ident, $promise:expr) => {
        pub struct $rule {
            pattern: ArcExpression,
        }

        impl $rule {
            pub fn new() -> Self {
                Self {
                    pattern: Expression::new(equi_join_op(), vec![leaf(0), leaf(1)]),
                }
            }
        }

        impl Rule for $rule {
            fn name(&self) -> &'static str {
                $name
            }

            fn pattern(&self) -> &ArcExpression {
                &self.pattern
            }

            fn is_impl_rule(&self) -> bool {
                true
            }

            fn promise(
                &self,
                _space: &SearchSpace,
                mexpr: &MultiExpr,
                _ctx: &SearchContext,
            ) -> Promise {
                let Operator::EquiJoin { left_keys, .. } = &mexpr.op else {
                    return Promise::None;
                };
                let promise: fn(&[ColumnRef]) -> Promise = $promise;
                promise(left_keys)
            }

            fn next_substitute(
                &self,
                _space: &SearchSpace,
                binding: &Expression,
            ) -> Result<Vec<ArcExpression>, OptimizerError> {
                let Operator::EquiJoin {
                    left_keys,
                    right_keys,
                } = binding.operator()
                else {
                    return Err(bad_pattern(self.name(), binding));
                };
                Ok(vec![Expression::new(
                    Operator::$physical {
                        left_keys: left_keys.clone(),
                        right_keys: right_keys.clone(),
                    },
                    binding.children.clone(),
                )])
            }
        }
    };
}

// Nested loops handles anything, including cross products. Hash and merge
// joins need at least one key pair, so a cross product demotes their
// promise to `None`.
define_join_impl_rule!(
    EquiJoinToNestedLoopsRule,
    "equi_join_to_nested_loops",
    NestedLoopsJoin,
    |_keys| Promise::Physical
);
define_join_impl_rule!(
    EquiJoinToHashJoinRule,
    "equi_join_to_hash_join",
    HashJoin,
    |keys| if keys.is_empty() {
        Promise::None
    } else {
        Promise::Hash
    }
);
define_join_impl_rule!(
    EquiJoinToSortMergeRule,
    "equi_join_to_sort_merge",
    SortMergeJoin,
    |keys| if keys.is_empty() {
        Promise::None
    } else {
        Promise::Physical
    }
);

pub struct GetTableToFileScanRule {
    pattern: ArcExpression,
}

impl GetTableToFileScanRule {
    pub fn new() -> Self {
        Self {
            pattern: Expression::leaf(Operator::GetTable(TableRef::new("", ""))),
        }
    }
}

impl Rule for GetTableToFileScanRule {
    fn name(&self) -> &'static str {
        "get_table_to_file_scan"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn is_impl_rule(&self) -> bool {
        true
    }

    fn next_substitute(
        &self,
        _space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Operator::GetTable(table_ref) = binding.operator() else {
            return Err(bad_pattern(self.name(), binding));
        };
        Ok(vec![Expression::leaf(Operator::FileScan(
            table_ref.clone(),
        ))])
    }
}

/// One `IndexScan` substitute per ordered (btree) index on the table.
pub struct GetTableToIndexScanRule {
    pattern: ArcExpression,
    catalog: Arc<Catalog>,
}

impl GetTableToIndexScanRule {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            pattern: Expression::leaf(Operator::GetTable(TableRef::new("", ""))),
            catalog,
        }
    }
}

impl Rule for GetTableToIndexScanRule {
    fn name(&self) -> &'static str {
        "get_table_to_index_scan"
    }

    fn pattern(&self) -> &ArcExpression {
        &self.pattern
    }

    fn is_impl_rule(&self) -> bool {
        true
    }

    fn next_substitute(
        &self,
        _space: &SearchSpace,
        binding: &Expression,
    ) -> Result<Vec<ArcExpression>, OptimizerError> {
        let Operator::GetTable(table_ref) = binding.operator() else {
            return Err(bad_pattern(self.name(), binding));
        };
        let Some(table) = self.catalog.table(&table_ref.table) else {
            return Ok(Vec::new());
        };
        Ok(table
            .indexes()
            .iter()
            .filter(|index| index.kind.is_ordered())
            .map(|index| {
                Expression::leaf(Operator::IndexScan {
                    table: table_ref.clone(),
                    index: index.name.clone(),
                    key_columns: index
                        .key_columns
                        .iter()
                        .map(|c| ColumnRef::new(&table_ref.table, &table_ref.alias, c))
                        .collect(),
                })
            })
            .collect())
    }
}

macro_rules! define_unary_impl_rule {
    ($rule:ident, $name:literal, $pattern_op:expr, $doc:literal) => {
        #[doc = $doc]
        pub struct $rule {
            pattern: ArcExpression,
        }

        impl $rule {
            pub fn new() -> Self {
                let op: Operator = $pattern_op;
                let children = (0..op.arity()).map(leaf).collect();
                Self {
                    pattern: Expression::new(op, children),
                }
            }
        }

        impl Rule for $rule {
            fn name(&self) -> &'static str {
                $name
            }

            fn pattern(&self) -> &ArcExpression {
                &self.pattern
            }

            fn is_impl_rule(&self) -> bool {
                true
            }

            fn next_substitute(
                &self,
                _space: &SearchSpace,
                binding: &Expression,
            ) -> Result<Vec<ArcExpression>, OptimizerError> {
                let physical = match binding.operator() {
                    Operator::Select => Operator::Filter,
                    Operator::Project(columns) => Operator::ProjectList(columns.clone()),
                    Operator::Distinct => Operator::HashDistinct,
                    _ => return Err(bad_pattern(self.name(), binding)),
                };
                Ok(vec![Expression::new(
                    physical,
                    binding.children.clone(),
                )])
            }
        }
    };
}

define_unary_impl_rule!(
    SelectToFilterRule,
    "select_to_filter",
    Operator::Select,
    "`Select` evaluates its predicate as a `Filter`."
);
define_unary_impl_rule!(
    ProjectToProjectListRule,
    "project_to_project_list",
    Operator::Project(Vec::new()),
    "`Project` narrows tuples as a `ProjectList`."
);
define_unary_impl_rule!(
    DistinctToHashDistinctRule,
    "distinct_to_hash_distinct",
    Operator::Distinct,
    "`Distinct` deduplicates through a hash table."
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascades::SearchSpace;
    use crate::cost::Cost;
    use crate::properties::{LogicalPropsBuilder, PhysicalProps};
    use crate::rules::bind;
    use crate::test_fixtures::{cross_join, fixture_catalog, get, join};

    fn space() -> SearchSpace {
        SearchSpace::new(LogicalPropsBuilder::new(fixture_catalog()))
    }

    fn any_ctx() -> SearchContext {
        SearchContext {
            required: PhysicalProps::any(),
            upper_bound: Cost::infinity(),
        }
    }

    #[test]
    fn hash_join_keeps_input_groups_and_keys() {
        let mut space = space();
        let (_, inserted) = space
            .insert(&join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let rule = EquiJoinToHashJoinRule::new();
        let bindings = bind(&space, rule.pattern(), &mexpr);
        let subs = rule.next_substitute(&space, &bindings[0]).unwrap();
        assert_eq!(subs.len(), 1);
        let Operator::HashJoin {
            left_keys,
            right_keys,
        } = subs[0].operator()
        else {
            panic!("substitute is not a hash join");
        };
        assert_eq!(left_keys[0].column, "sid");
        assert_eq!(right_keys[0].column, "sid");
        assert_eq!(subs[0].input(0).as_group(), Some(mexpr.children[0]));
        assert_eq!(subs[0].input(1).as_group(), Some(mexpr.children[1]));
    }

    #[test]
    fn cross_product_demotes_hash_join_to_none() {
        let mut space = space();
        let (_, inserted) = space
            .insert(&cross_join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let hash = EquiJoinToHashJoinRule::new();
        let nested = EquiJoinToNestedLoopsRule::new();
        assert_eq!(hash.promise(&space, &mexpr, &any_ctx()), Promise::None);
        assert_eq!(
            nested.promise(&space, &mexpr, &any_ctx()),
            Promise::Physical
        );
    }

    #[test]
    fn index_scan_emitted_per_btree_index() {
        let mut space = space();
        let (_, inserted) = space.insert(&get("Sailors", "S")).unwrap();
        let mexpr = space.mexpr(inserted.id()).clone();
        let rule = GetTableToIndexScanRule::new(fixture_catalog());
        let bindings = bind(&space, rule.pattern(), &mexpr);
        let subs = rule.next_substitute(&space, &bindings[0]).unwrap();
        assert_eq!(subs.len(), 1);
        let Operator::IndexScan { key_columns, .. } = subs[0].operator() else {
            panic!("substitute is not an index scan");
        };
        assert_eq!(key_columns[0].column, "sid");
        assert_eq!(key_columns[0].alias, "S");
    }
}
