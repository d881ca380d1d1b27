// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The runtime catalog model: tables, columns, keys, and indexes.
//!
//! The catalog is read-only once built. Construction enforces name
//! uniqueness and key-column resolution; everything downstream (binder,
//! property derivation, cost estimation) can therefore look things up
//! without re-validating.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::stats::{ColumnStatistics, IndexStatistics, TableStatistics};
use crate::types::DataType;

pub const DEFAULT_PAGE_SIZE: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub stats: ColumnStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    BTree,
    StaticHash,
    Bitmap,
}

impl IndexKind {
    pub fn parse(text: &str) -> Result<IndexKind, CatalogError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "btree" => Ok(IndexKind::BTree),
            "shash" => Ok(IndexKind::StaticHash),
            "bitmap" => Ok(IndexKind::Bitmap),
            other => Err(CatalogError::UnknownIndexType(other.to_string())),
        }
    }

    /// Only btree indexes produce tuples in key order.
    pub fn is_ordered(&self) -> bool {
        matches!(self, IndexKind::BTree)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    pub clustered: bool,
    /// Key columns in index order.
    pub key_columns: Vec<String>,
    pub stats: IndexStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    indexes: Vec<Index>,
    pub stats: TableStatistics,
}

impl Table {
    pub fn new(name: impl Into<String>, stats: TableStatistics) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            stats,
        }
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        stats: ColumnStatistics,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(CatalogError::DuplicateColumn {
                table: self.name.clone(),
                column: name,
            });
        }
        self.columns.push(Column {
            name,
            data_type,
            stats,
        });
        Ok(self)
    }

    pub fn with_primary_key(mut self, columns: Vec<String>) -> Result<Self, CatalogError> {
        for column in &columns {
            self.check_column(column)?;
        }
        self.primary_key = columns;
        Ok(self)
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Result<Self, CatalogError> {
        for column in &fk.columns {
            self.check_column(column)?;
        }
        self.foreign_keys.push(fk);
        Ok(self)
    }

    pub fn with_index(mut self, index: Index) -> Result<Self, CatalogError> {
        if self.index(&index.name).is_some() {
            return Err(CatalogError::DuplicateIndex {
                table: self.name.clone(),
                index: index.name,
            });
        }
        for column in &index.key_columns {
            self.check_column(column)?;
        }
        self.indexes.push(index);
        Ok(self)
    }

    fn check_column(&self, column: &str) -> Result<(), CatalogError> {
        if self.column(column).is_none() {
            return Err(CatalogError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            });
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// The read-only system catalog. Tables keep their insertion order so that
/// dumps and derived plans stay deterministic.
#[derive(Debug, Clone)]
pub struct Catalog {
    page_size: u32,
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }
}

/// Builder used by the XML loader and by tests that assemble catalogs
/// programmatically.
#[derive(Debug)]
pub struct CatalogBuilder {
    page_size: u32,
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
}

impl CatalogBuilder {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            tables: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn table(mut self, table: Table) -> Result<Self, CatalogError> {
        if self.by_name.contains_key(&table.name) {
            return Err(CatalogError::DuplicateTable(table.name));
        }
        self.by_name.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
        Ok(self)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            page_size: self.page_size,
            tables: self.tables,
            by_name: self.by_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sailors() -> Table {
        Table::new(
            "Sailors",
            TableStatistics {
                cardinality: 750,
                pages: 18,
                width_fraction: 0.01,
            },
        )
        .with_column("sid", DataType::Int, ColumnStatistics::unknown(0.001))
        .unwrap()
        .with_column("sname", DataType::VarChar(25), ColumnStatistics::unknown(0.006))
        .unwrap()
    }

    #[test]
    fn duplicate_table_rejected() {
        let err = CatalogBuilder::new(DEFAULT_PAGE_SIZE)
            .table(sailors())
            .unwrap()
            .table(sailors())
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTable(name) if name == "Sailors"));
    }

    #[test]
    fn duplicate_column_rejected() {
        let err = sailors()
            .with_column("sid", DataType::Int, ColumnStatistics::unknown(0.001))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateColumn { .. }));
    }

    #[test]
    fn key_columns_must_resolve() {
        let err = sailors().with_primary_key(vec!["nope".to_string()]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownColumn { .. }));
    }

    #[test]
    fn lookup_by_name() {
        let catalog = CatalogBuilder::new(DEFAULT_PAGE_SIZE)
            .table(sailors())
            .unwrap()
            .build();
        assert_eq!(catalog.table("Sailors").unwrap().columns().len(), 2);
        assert!(catalog.table("Boats").is_none());
    }
}
