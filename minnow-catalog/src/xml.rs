// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Loader for the `<systemCatalog>` XML document.
//!
//! The document is deserialized into a passive description first and then
//! validated into the runtime [`Catalog`], so all structural errors surface
//! with the usual [`CatalogError`] variants rather than serde noise.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::schema::{Catalog, CatalogBuilder, ForeignKey, Index, IndexKind, Table};
use crate::stats::{ColumnStatistics, IndexStatistics, TableStatistics};
use crate::types::{DataType, Datum};

#[derive(Debug, Deserialize)]
struct SystemCatalogDoc {
    #[serde(rename = "@pageSize")]
    page_size: u32,
    #[serde(rename = "table", default)]
    tables: Vec<TableDoc>,
}

#[derive(Debug, Deserialize)]
struct TableDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@cardinality")]
    cardinality: u64,
    #[serde(rename = "@pages")]
    pages: u64,
    #[serde(rename = "column", default)]
    columns: Vec<ColumnDoc>,
    #[serde(rename = "primaryKey")]
    primary_key: Option<KeyColumnsDoc>,
    #[serde(rename = "foreignKey", default)]
    foreign_keys: Vec<ForeignKeyDoc>,
    #[serde(rename = "index", default)]
    indexes: Vec<IndexDoc>,
}

#[derive(Debug, Deserialize)]
struct ColumnDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@type")]
    type_name: String,
    #[serde(rename = "@cardinality", default)]
    cardinality: Option<u64>,
    #[serde(rename = "@distinct", default)]
    distinct: Option<u64>,
    #[serde(rename = "@min", default)]
    min: Option<String>,
    #[serde(rename = "@max", default)]
    max: Option<String>,
    /// Width in bytes; defaults to the type's storage width.
    #[serde(rename = "@width", default)]
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct KeyColumnsDoc {
    #[serde(rename = "keyColumn", default)]
    key_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ForeignKeyDoc {
    #[serde(rename = "@table")]
    table: String,
    #[serde(rename = "keyColumn", default)]
    key_columns: Vec<String>,
    #[serde(rename = "refColumn", default)]
    ref_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IndexDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@type")]
    type_name: String,
    #[serde(rename = "@clustered", default)]
    clustered: bool,
    #[serde(rename = "@pages")]
    pages: u64,
    #[serde(rename = "@cardinality")]
    cardinality: u64,
    #[serde(rename = "keyColumn", default)]
    key_columns: Vec<String>,
}

/// Load a catalog from XML text.
pub fn load_catalog_str(xml: &str) -> Result<Catalog, CatalogError> {
    let doc: SystemCatalogDoc = quick_xml::de::from_str(xml)?;
    let page_size = doc.page_size as f64;
    let mut builder = CatalogBuilder::new(doc.page_size);
    for table_doc in doc.tables {
        let mut width_bytes = 0u64;
        let mut table = Table::new(
            table_doc.name.clone(),
            TableStatistics {
                cardinality: table_doc.cardinality,
                pages: table_doc.pages,
                width_fraction: 0.0,
            },
        );
        for column in table_doc.columns {
            let data_type = DataType::parse(&column.type_name)?;
            let width = column.width.unwrap_or_else(|| data_type.byte_width());
            width_bytes += width as u64;
            let min = column
                .min
                .as_deref()
                .map(|text| Datum::parse(text, data_type))
                .transpose()?;
            let max = column
                .max
                .as_deref()
                .map(|text| Datum::parse(text, data_type))
                .transpose()?;
            table = table.with_column(
                column.name,
                data_type,
                ColumnStatistics {
                    n: column.cardinality.unwrap_or(table_doc.cardinality),
                    distinct: column.distinct.unwrap_or(table_doc.cardinality).max(1),
                    min,
                    max,
                    width_fraction: width as f64 / page_size,
                },
            )?;
        }
        table.stats.width_fraction = width_bytes as f64 / page_size;
        if let Some(pk) = table_doc.primary_key {
            table = table.with_primary_key(pk.key_columns)?;
        }
        for fk in table_doc.foreign_keys {
            table = table.with_foreign_key(ForeignKey {
                columns: fk.key_columns,
                ref_table: fk.table,
                ref_columns: fk.ref_columns,
            })?;
        }
        for index in table_doc.indexes {
            table = table.with_index(Index {
                name: index.name,
                kind: IndexKind::parse(&index.type_name)?,
                clustered: index.clustered,
                key_columns: index.key_columns,
                stats: IndexStatistics {
                    pages: index.pages,
                    distinct: index.cardinality,
                },
            })?;
        }
        debug!(table = %table.name, columns = table.columns().len(), "loaded table");
        builder = builder.table(table)?;
    }
    Ok(builder.build())
}

/// Load a catalog from an XML file on disk.
pub fn load_catalog_path(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let text = std::fs::read_to_string(path)?;
    load_catalog_str(&text)
}
