//! Shared Sailors/Boats/Reserves catalog for the end-to-end scenarios.
//!
//! Deliberately index-free on the ordered access paths: the enforcer
//! scenario needs a required order no physical plan delivers natively.

use std::sync::Arc;

use minnow_catalog::{
    Catalog, CatalogBuilder, ColumnStatistics, DataType, Index, IndexKind, IndexStatistics, Table,
    TableStatistics, DEFAULT_PAGE_SIZE,
};

/// Call from a failing test to watch the task schedule.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn column_stats(distinct: u64, width: f64) -> ColumnStatistics {
    ColumnStatistics {
        n: 0,
        distinct,
        min: None,
        max: None,
        width_fraction: width,
    }
}

pub fn catalog() -> Arc<Catalog> {
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

    // A hash index exists but delivers no order, so it never becomes an
    // index scan.
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
    .unwrap()
    .with_index(Index {
        name: "reserves_sid_hash".to_string(),
        kind: IndexKind::StaticHash,
        clustered: false,
        key_columns: vec!["sid".to_string()],
        stats: IndexStatistics {
            pages: 8,
            distinct: 750,
        },
    })
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
