// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use thiserror::Error;

/// Errors raised while constructing or loading a catalog. All of them fire at
/// catalog-build time, never during optimization.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table `{0}` already exists")]
    DuplicateTable(String),

    #[error("column `{column}` already exists in table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("index `{index}` already exists on table `{table}`")]
    DuplicateIndex { table: String, index: String },

    #[error("unknown column `{column}` referenced by table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("unknown column type `{0}`")]
    UnknownType(String),

    #[error("unknown index type `{0}`")]
    UnknownIndexType(String),

    #[error("cannot parse `{text}` as a {ty} statistic")]
    BadStatistic { text: String, ty: &'static str },

    #[error("malformed catalog document: {0}")]
    Malformed(#[from] quick_xml::DeError),

    #[error("cannot read catalog file: {0}")]
    Io(#[from] std::io::Error),
}
