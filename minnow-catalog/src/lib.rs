// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only system catalog for minnowdb.
//!
//! The optimizer consumes table, column and index descriptors together with
//! their statistics; nothing here is mutated after construction. Catalogs
//! are built programmatically through [`CatalogBuilder`] or loaded from the
//! `<systemCatalog>` XML document via [`load_catalog_str`].

mod error;
mod schema;
mod stats;
mod types;
mod xml;

pub use error::CatalogError;
pub use schema::{
    Catalog, CatalogBuilder, Column, ForeignKey, Index, IndexKind, Table, DEFAULT_PAGE_SIZE,
};
pub use stats::{ColumnStatistics, IndexStatistics, TableStatistics};
pub use types::{DataType, Datum};
pub use xml::{load_catalog_path, load_catalog_str};
