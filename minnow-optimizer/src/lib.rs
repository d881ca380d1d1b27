// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cost-based query optimizer for minnowdb.
//!
//! A top-down, rule-driven search engine in the Cascades/Columbia lineage:
//! logical query expressions are interned into a memoized search space,
//! transformation and implementation rules expand it, and a LIFO task
//! scheduler with branch-and-bound pruning selects the cheapest physical
//! plan satisfying the caller's required physical properties.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # fn main() -> Result<(), minnow_optimizer::Error> {
//! let catalog = Arc::new(minnow_catalog::load_catalog_path("catalog.xml")?);
//! let query = minnow_optimizer::bind_query(
//!     &catalog,
//!     "EQJOIN(S.sid, R.sid, GET(Sailors, S), GET(Reserves, R))",
//! )?;
//! let mut optimizer = minnow_optimizer::Optimizer::new(catalog);
//! let plan = optimizer.optimize(&query)?;
//! println!("{plan}");
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod cascades;
pub mod cost;
pub mod error;
pub mod explain;
pub mod nodes;
pub mod parser;
pub mod properties;
pub mod rules;

use std::sync::Arc;

use minnow_catalog::Catalog;

pub use cascades::{GroupId, MultiExprId, Optimizer, SearchContext};
pub use cost::{Cost, CostModel, PageCostModel};
pub use error::{Error, OptimizerError, QueryError};
pub use explain::{ExplainNode, ExplainedPlan};
pub use nodes::{ArcExpression, Expression, Operator};
pub use properties::{DataOrder, PhysicalProps};

/// Parse a textual query and bind it against the catalog.
pub fn bind_query(catalog: &Arc<Catalog>, text: &str) -> Result<ArcExpression, QueryError> {
    let ast = parser::parse(text)?;
    binder::Binder::new(catalog.clone()).bind(&ast)
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::sync::Arc;

    use minnow_catalog::{
        Catalog, CatalogBuilder, ColumnStatistics, DataType, Index, IndexKind, IndexStatistics,
        Table, TableStatistics, DEFAULT_PAGE_SIZE,
    };

    use crate::nodes::{ArcExpression, ColumnRef, Expression, Operator, TableRef};

    fn column_stats(distinct: u64, width: f64) -> ColumnStatistics {
        ColumnStatistics {
            n: 0,
            distinct,
            min: None,
            max: None,
            width_fraction: width,
        }
    }

    /// The Sailors/Boats/Reserves schema used throughout the unit tests.
    pub fn fixture_catalog() -> Arc<Catalog> {
        let sailors = Table::new(
            "Sailors",
            TableStatistics {
                cardinality: 750,
                pages: 18,
                width_fraction: 37.0 / 4096.0,
            },
        )
        .with_column("sid", DataType::Int, column_stats(750, 4.0 / 4096.0))
        .unwrap()
        .with_column(
            "sname",
            DataType::VarChar(25),
            column_stats(700, 25.0 / 4096.0),
        )
        .unwrap()
        .with_column("rating", DataType::Int, column_stats(10, 4.0 / 4096.0))
        .unwrap()
        .with_column("age", DataType::Float, column_stats(40, 4.0 / 4096.0))
        .unwrap()
        .with_primary_key(vec!["sid".to_string()])
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

        let boats = Table::new(
            "Boats",
            TableStatistics {
                cardinality: 100,
                pages: 4,
                width_fraction: 39.0 / 4096.0,
            },
        )
        .with_column("bid", DataType::Int, column_stats(100, 4.0 / 4096.0))
        .unwrap()
        .with_column(
            "bname",
            DataType::VarChar(25),
            column_stats(95, 25.0 / 4096.0),
        )
        .unwrap()
        .with_column(
            "color",
            DataType::VarChar(10),
            column_stats(10, 10.0 / 4096.0),
        )
        .unwrap()
        .with_primary_key(vec!["bid".to_string()])
        .unwrap();

        let reserves = Table::new(
            "Reserves",
            TableStatistics {
                cardinality: 1500,
                pages: 30,
                width_fraction: 16.0 / 4096.0,
            },
        )
        .with_column("sid", DataType::Int, column_stats(750, 4.0 / 4096.0))
        .unwrap()
        .with_column("bid", DataType::Int, column_stats(100, 4.0 / 4096.0))
        .unwrap()
        .with_column("day", DataType::Date, column_stats(365, 8.0 / 4096.0))
        .unwrap();

        Arc::new(
            CatalogBuilder::new(DEFAULT_PAGE_SIZE)
                .table(sailors)
                .unwrap()
                .table(boats)
                .unwrap()
                .table(reserves)
                .unwrap()
                .build(),
        )
    }

    pub fn get(table: &str, alias: &str) -> ArcExpression {
        Expression::leaf(Operator::GetTable(TableRef::new(table, alias)))
    }

    /// `S.sid = R.sid` equi-join over two inputs.
    pub fn join(left: ArcExpression, right: ArcExpression) -> ArcExpression {
        Expression::node(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Sailors", "S", "sid")],
                right_keys: vec![ColumnRef::new("Reserves", "R", "sid")],
            },
            vec![left, right],
        )
    }

    /// Cross product: an equi-join with empty key lists.
    pub fn cross_join(left: ArcExpression, right: ArcExpression) -> ArcExpression {
        Expression::node(
            Operator::EquiJoin {
                left_keys: Vec::new(),
                right_keys: Vec::new(),
            },
            vec![left, right],
        )
    }
}
