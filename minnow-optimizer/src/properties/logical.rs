// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use minnow_catalog::{Catalog, DataType};

use crate::error::QueryError;
use crate::nodes::{CmpOp, ColumnRef, LogicOp, Operator, Value};

/// Selectivity assumed for predicates we cannot estimate.
pub const DEFAULT_SELECTIVITY: f64 = 0.1;
/// Selectivity assumed for range comparisons.
pub const RANGE_SELECTIVITY: f64 = 1.0 / 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub column: ColumnRef,
    pub data_type: DataType,
    pub width_fraction: f64,
    pub distinct: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn find(&self, column: &ColumnRef) -> Option<&ColumnMeta> {
        self.columns.iter().find(|m| &m.column == column)
    }

    pub fn contains(&self, column: &ColumnRef) -> bool {
        self.find(column).is_some()
    }

    pub fn contains_all<'a>(&self, mut columns: impl Iterator<Item = &'a ColumnRef>) -> bool {
        columns.all(|c| self.contains(c))
    }

    fn concat(&self, other: &Schema) -> Schema {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Schema { columns }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, meta) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", meta.column)?;
        }
        write!(f, "]")
    }
}

/// A functional dependency `determinants -> dependents` over the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalDependency {
    pub determinants: Vec<ColumnRef>,
    pub dependents: Vec<ColumnRef>,
}

/// Logical collection properties shared by every member of a group.
#[derive(Debug, Clone)]
pub struct LogicalProps {
    pub schema: Schema,
    /// Estimated output cardinality.
    pub cardinality: f64,
    /// Hard upper bound on the output cardinality.
    pub max_cardinality: f64,
    pub unique_keys: Vec<Vec<ColumnRef>>,
    pub fds: Vec<FunctionalDependency>,
    /// For predicate-rooted groups: the estimated fraction of input tuples
    /// the predicate retains.
    pub selectivity: Option<f64>,
}

impl LogicalProps {
    fn item(schema: Schema, selectivity: Option<f64>) -> Self {
        Self {
            schema,
            cardinality: 1.0,
            max_cardinality: 1.0,
            unique_keys: Vec::new(),
            fds: Vec::new(),
            selectivity,
        }
    }
}

/// Derives logical properties of an operator from the properties of its
/// input groups. Pure and local: the only ambient input is the catalog.
pub struct LogicalPropsBuilder {
    catalog: Arc<Catalog>,
}

impl LogicalPropsBuilder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn derive(
        &self,
        op: &Operator,
        children: &[&LogicalProps],
    ) -> Result<LogicalProps, QueryError> {
        match op {
            Operator::GetTable(table_ref) => self.derive_get_table(table_ref),
            Operator::EquiJoin {
                left_keys,
                right_keys,
            } => Ok(derive_join(left_keys, right_keys, children[0], children[1])),
            Operator::Select => Ok(derive_select(children[0], children[1])),
            Operator::Project(columns) => Ok(derive_project(columns, children[0])),
            Operator::Distinct => Ok(derive_distinct(children[0])),
            Operator::Attr(column) => self.derive_attr(column),
            Operator::Const(value) => Ok(derive_const(value)),
            Operator::Cmp(op) => Ok(derive_cmp(*op, children[0], children[1])),
            Operator::Logic(op) => Ok(derive_logic(*op, children[0], children[1])),
            // Physical members join existing groups and never seed one, so
            // derivation is only asked about logical and item operators.
            other => {
                tracing::trace!(operator = %other, "pass-through property derivation");
                Ok(children
                    .first()
                    .map(|c| (*c).clone())
                    .unwrap_or_else(|| LogicalProps::item(Schema::default(), None)))
            }
        }
    }

    fn derive_get_table(&self, table_ref: &crate::nodes::TableRef) -> Result<LogicalProps, QueryError> {
        let table = self
            .catalog
            .table(&table_ref.table)
            .ok_or_else(|| QueryError::UnknownTable(table_ref.table.clone()))?;
        let columns = table
            .columns()
            .iter()
            .map(|c| ColumnMeta {
                column: ColumnRef::new(&table_ref.table, &table_ref.alias, &c.name),
                data_type: c.data_type,
                width_fraction: c.stats.width_fraction,
                distinct: c.stats.distinct.max(1) as f64,
            })
            .collect::<Vec<_>>();
        let schema = Schema { columns };
        let cardinality = table.stats.cardinality as f64;
        let mut unique_keys = Vec::new();
        let mut fds = Vec::new();
        if !table.primary_key.is_empty() {
            let key: Vec<ColumnRef> = table
                .primary_key
                .iter()
                .map(|c| ColumnRef::new(&table_ref.table, &table_ref.alias, c))
                .collect();
            let dependents: Vec<ColumnRef> = schema
                .columns
                .iter()
                .map(|m| m.column.clone())
                .filter(|c| !key.contains(c))
                .collect();
            if !dependents.is_empty() {
                fds.push(FunctionalDependency {
                    determinants: key.clone(),
                    dependents,
                });
            }
            unique_keys.push(key);
        }
        Ok(LogicalProps {
            schema,
            cardinality,
            max_cardinality: cardinality,
            unique_keys,
            fds,
            selectivity: None,
        })
    }

    fn derive_attr(&self, column: &ColumnRef) -> Result<LogicalProps, QueryError> {
        let table = self
            .catalog
            .table(&column.table)
            .ok_or_else(|| QueryError::UnknownTable(column.table.clone()))?;
        let meta = table
            .column(&column.column)
            .ok_or_else(|| QueryError::UnknownColumn {
                alias: column.alias.clone(),
                column: column.column.clone(),
            })?;
        let schema = Schema {
            columns: vec![ColumnMeta {
                column: column.clone(),
                data_type: meta.data_type,
                width_fraction: meta.stats.width_fraction,
                distinct: meta.stats.distinct.max(1) as f64,
            }],
        };
        Ok(LogicalProps::item(schema, None))
    }
}

fn column_distinct(props: &LogicalProps, column: &ColumnRef) -> f64 {
    props
        .schema
        .find(column)
        .map(|m| m.distinct)
        .unwrap_or(1.0)
        .max(1.0)
}

fn derive_join(
    left_keys: &[ColumnRef],
    right_keys: &[ColumnRef],
    left: &LogicalProps,
    right: &LogicalProps,
) -> LogicalProps {
    let schema = left.schema.concat(&right.schema);
    let mut selectivity = 1.0;
    for (lk, rk) in left_keys.iter().zip(right_keys) {
        let ndv = column_distinct(left, lk).max(column_distinct(right, rk));
        selectivity /= ndv;
    }
    let cardinality = (left.cardinality * right.cardinality * selectivity).max(1.0);
    let max_cardinality = left.max_cardinality * right.max_cardinality;

    let mut unique_keys = Vec::new();
    let right_keyed = right
        .unique_keys
        .iter()
        .any(|key| key.iter().all(|c| right_keys.contains(c)));
    let left_keyed = left
        .unique_keys
        .iter()
        .any(|key| key.iter().all(|c| left_keys.contains(c)));
    if right_keyed {
        // Each left tuple matches at most one right tuple; left keys stay
        // keys of the join.
        unique_keys.extend(left.unique_keys.iter().cloned());
    }
    if left_keyed {
        unique_keys.extend(right.unique_keys.iter().cloned());
    }

    let mut fds: Vec<FunctionalDependency> = left.fds.clone();
    fds.extend(right.fds.iter().cloned());
    for (lk, rk) in left_keys.iter().zip(right_keys) {
        fds.push(FunctionalDependency {
            determinants: vec![lk.clone()],
            dependents: vec![rk.clone()],
        });
        fds.push(FunctionalDependency {
            determinants: vec![rk.clone()],
            dependents: vec![lk.clone()],
        });
    }

    LogicalProps {
        schema,
        cardinality,
        max_cardinality,
        unique_keys,
        fds,
        selectivity: None,
    }
}

fn derive_select(input: &LogicalProps, predicate: &LogicalProps) -> LogicalProps {
    let selectivity = predicate.selectivity.unwrap_or(DEFAULT_SELECTIVITY);
    LogicalProps {
        schema: input.schema.clone(),
        cardinality: (input.cardinality * selectivity).max(1.0),
        max_cardinality: input.max_cardinality,
        unique_keys: input.unique_keys.clone(),
        fds: input.fds.clone(),
        selectivity: None,
    }
}

fn derive_project(columns: &[ColumnRef], input: &LogicalProps) -> LogicalProps {
    let metas = columns
        .iter()
        .filter_map(|c| input.schema.find(c).cloned())
        .collect::<Vec<_>>();
    let schema = Schema { columns: metas };
    let unique_keys = input
        .unique_keys
        .iter()
        .filter(|key| key.iter().all(|c| columns.contains(c)))
        .cloned()
        .collect();
    let fds = input
        .fds
        .iter()
        .filter(|fd| {
            fd.determinants.iter().all(|c| columns.contains(c))
                && fd.dependents.iter().all(|c| columns.contains(c))
        })
        .cloned()
        .collect();
    LogicalProps {
        schema,
        cardinality: input.cardinality,
        max_cardinality: input.max_cardinality,
        unique_keys,
        fds,
        selectivity: None,
    }
}

fn derive_distinct(input: &LogicalProps) -> LogicalProps {
    let mut distinct_bound = 1.0f64;
    for meta in &input.schema.columns {
        distinct_bound = (distinct_bound * meta.distinct).min(input.cardinality);
    }
    let mut unique_keys = input.unique_keys.clone();
    let all_columns: Vec<ColumnRef> = input.schema.columns.iter().map(|m| m.column.clone()).collect();
    if !all_columns.is_empty() && !unique_keys.contains(&all_columns) {
        unique_keys.push(all_columns);
    }
    LogicalProps {
        schema: input.schema.clone(),
        cardinality: input.cardinality.min(distinct_bound).max(1.0),
        max_cardinality: input.max_cardinality,
        unique_keys,
        fds: input.fds.clone(),
        selectivity: None,
    }
}

fn derive_const(_value: &Value) -> LogicalProps {
    LogicalProps::item(Schema::default(), None)
}

fn derive_cmp(op: CmpOp, lhs: &LogicalProps, rhs: &LogicalProps) -> LogicalProps {
    let schema = lhs.schema.concat(&rhs.schema);
    let ndv = |props: &LogicalProps| {
        props
            .schema
            .columns
            .iter()
            .map(|m| m.distinct)
            .fold(1.0f64, f64::max)
    };
    let eq_selectivity = 1.0 / ndv(lhs).max(ndv(rhs));
    let selectivity = match op {
        CmpOp::Eq => eq_selectivity,
        CmpOp::Ne => (1.0 - eq_selectivity).max(0.0),
        CmpOp::Lt | CmpOp::Gt | CmpOp::Le | CmpOp::Ge => RANGE_SELECTIVITY,
    };
    LogicalProps::item(schema, Some(selectivity))
}

fn derive_logic(op: LogicOp, lhs: &LogicalProps, rhs: &LogicalProps) -> LogicalProps {
    let s1 = lhs.selectivity.unwrap_or(DEFAULT_SELECTIVITY);
    let s2 = rhs.selectivity.unwrap_or(DEFAULT_SELECTIVITY);
    let selectivity = match op {
        LogicOp::And => s1 * s2,
        LogicOp::Or => s1 + s2 - s1 * s2,
    };
    LogicalProps::item(lhs.schema.concat(&rhs.schema), Some(selectivity))
}
