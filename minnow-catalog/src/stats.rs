// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Statistics attached to tables, columns, and indexes.
//!
//! Widths are stored as a fraction of the page size so cost arithmetic stays
//! well-conditioned across page sizes.

use serde::{Deserialize, Serialize};

use crate::types::Datum;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    /// Number of tuples in the table.
    pub cardinality: u64,
    /// Number of heap pages the table occupies.
    pub pages: u64,
    /// Tuple width as a fraction of the page size.
    pub width_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of non-null values.
    pub n: u64,
    /// Number of distinct values.
    pub distinct: u64,
    pub min: Option<Datum>,
    pub max: Option<Datum>,
    /// Column width as a fraction of the page size.
    pub width_fraction: f64,
}

impl ColumnStatistics {
    /// Placeholder statistics for a column no one has analyzed yet.
    pub fn unknown(width_fraction: f64) -> Self {
        Self {
            n: 0,
            distinct: 1,
            min: None,
            max: None,
            width_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    /// Number of pages in the index structure.
    pub pages: u64,
    /// Number of distinct keys.
    pub distinct: u64,
}
