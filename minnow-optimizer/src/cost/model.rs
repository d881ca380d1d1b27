// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use minnow_catalog::Catalog;

use crate::cost::{Cost, CostModel};
use crate::nodes::Operator;
use crate::properties::LogicalProps;

/// Cost of reading one page sequentially.
pub const PAGE_IO: f64 = 1.0;
/// Cost of touching one tuple.
pub const CPU_PER_TUPLE: f64 = 0.01;

/// Page- and tuple-count cost model over catalog statistics.
///
/// Scans pay IO by page count; joins, sorts and the other pipeline
/// operators pay CPU by tuple count. Item operators are free: their cost is
/// folded into the operators that evaluate them.
pub struct PageCostModel {
    catalog: Arc<Catalog>,
}

impl PageCostModel {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    fn table_pages(&self, table: &str) -> f64 {
        self.catalog
            .table(table)
            .map(|t| t.stats.pages as f64)
            .unwrap_or(1.0)
    }

    fn index_pages(&self, table: &str, index: &str) -> f64 {
        self.catalog
            .table(table)
            .and_then(|t| t.index(index))
            .map(|i| i.stats.pages as f64)
            .unwrap_or(1.0)
    }

    fn index_clustered(&self, table: &str, index: &str) -> bool {
        self.catalog
            .table(table)
            .and_then(|t| t.index(index))
            .map(|i| i.clustered)
            .unwrap_or(false)
    }
}

impl CostModel for PageCostModel {
    fn local_cost(&self, op: &Operator, children: &[&LogicalProps]) -> Cost {
        let rows = |i: usize| children.get(i).map(|c| c.cardinality).unwrap_or(0.0);
        match op {
            Operator::FileScan(table_ref) => {
                Cost::new(self.table_pages(&table_ref.table) * PAGE_IO)
            }
            Operator::IndexScan { table, index, .. } => {
                let pages = self.index_pages(&table.table, index);
                let mut cost = pages * PAGE_IO;
                if !self.index_clustered(&table.table, index) {
                    // One stray heap fetch per tuple.
                    let cardinality = self
                        .catalog
                        .table(&table.table)
                        .map(|t| t.stats.cardinality as f64)
                        .unwrap_or(0.0);
                    cost += cardinality * CPU_PER_TUPLE;
                }
                Cost::new(cost)
            }
            Operator::NestedLoopsJoin { .. } => Cost::new(rows(0) * rows(1) * CPU_PER_TUPLE),
            // Left input is the build side: scanned once to build, once
            // more amortized for the table itself.
            Operator::HashJoin { .. } => Cost::new((2.0 * rows(0) + rows(1)) * CPU_PER_TUPLE),
            Operator::SortMergeJoin { .. } => Cost::new((rows(0) + rows(1)) * CPU_PER_TUPLE),
            Operator::Sort(_) => {
                let n = rows(0).max(1.0);
                Cost::new(n * n.ln().max(1.0) * CPU_PER_TUPLE)
            }
            Operator::Filter | Operator::ProjectList(_) | Operator::HashDistinct => {
                Cost::new(rows(0) * CPU_PER_TUPLE)
            }
            Operator::Attr(_) | Operator::Const(_) | Operator::Cmp(_) | Operator::Logic(_) => {
                Cost::zero()
            }
            // Logical operators carry no cost of their own; pricing one is
            // a scheduling bug, so make it unplaceable rather than cheap.
            _ => Cost::infinity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::TableRef;
    use crate::properties::Schema;
    use minnow_catalog::{
        CatalogBuilder, ColumnStatistics, DataType, Index, IndexKind, IndexStatistics, Table,
        TableStatistics, DEFAULT_PAGE_SIZE,
    };

    fn catalog() -> Arc<Catalog> {
        let sailors = Table::new(
            "Sailors",
            TableStatistics {
                cardinality: 750,
                pages: 18,
                width_fraction: 0.01,
            },
        )
        .with_column("sid", DataType::Int, ColumnStatistics::unknown(0.001))
        .unwrap()
        .with_index(Index {
            name: "sailors_sid".to_string(),
            kind: IndexKind::BTree,
            clustered: true,
            key_columns: vec!["sid".to_string()],
            stats: IndexStatistics {
                pages: 3,
                distinct: 750,
            },
        })
        .unwrap();
        Arc::new(
            CatalogBuilder::new(DEFAULT_PAGE_SIZE)
                .table(sailors)
                .unwrap()
                .build(),
        )
    }

    fn props(cardinality: f64) -> LogicalProps {
        LogicalProps {
            schema: Schema::default(),
            cardinality,
            max_cardinality: cardinality,
            unique_keys: Vec::new(),
            fds: Vec::new(),
            selectivity: None,
        }
    }

    #[test]
    fn file_scan_costs_pages_times_page_io() {
        let model = PageCostModel::new(catalog());
        let cost = model.local_cost(&Operator::FileScan(TableRef::new("Sailors", "S")), &[]);
        assert_eq!(cost.value(), 18.0 * PAGE_IO);
    }

    #[test]
    fn clustered_index_scan_costs_index_pages() {
        let model = PageCostModel::new(catalog());
        let cost = model.local_cost(
            &Operator::IndexScan {
                table: TableRef::new("Sailors", "S"),
                index: "sailors_sid".to_string(),
                key_columns: Vec::new(),
            },
            &[],
        );
        assert_eq!(cost.value(), 3.0 * PAGE_IO);
    }

    #[test]
    fn hash_join_prefers_small_build_side() {
        let model = PageCostModel::new(catalog());
        let small = props(750.0);
        let large = props(1500.0);
        let op = Operator::HashJoin {
            left_keys: Vec::new(),
            right_keys: Vec::new(),
        };
        let build_small = model.local_cost(&op, &[&small, &large]);
        let build_large = model.local_cost(&op, &[&large, &small]);
        assert!(build_small < build_large);
    }

    #[test]
    fn logical_operators_are_unpriceable() {
        let model = PageCostModel::new(catalog());
        assert!(model
            .local_cost(&Operator::Select, &[&props(1.0), &props(1.0)])
            .is_infinity());
    }
}
