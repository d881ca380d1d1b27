// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Name resolution and type checking: turns a parsed [`QueryAst`] into a
//! catalog-linked [`Expression`] through a reference table of aliases.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use minnow_catalog::{Catalog, DataType};

use crate::error::QueryError;
use crate::nodes::{ArcExpression, ColumnRef, Expression, Operator, TableRef, Value};
use crate::parser::{QualifiedName, QueryAst};

/// Maps query aliases to the tables they name.
#[derive(Default)]
struct ReferenceTable {
    aliases: HashMap<String, String>,
}

impl ReferenceTable {
    fn register(&mut self, alias: &str, table: &str) -> Result<(), QueryError> {
        if self
            .aliases
            .insert(alias.to_string(), table.to_string())
            .is_some()
        {
            return Err(QueryError::DuplicateAlias(alias.to_string()));
        }
        Ok(())
    }

    fn resolve(
        &self,
        catalog: &Catalog,
        name: &QualifiedName,
    ) -> Result<(ColumnRef, DataType), QueryError> {
        let table_name =
            self.aliases
                .get(&name.alias)
                .ok_or_else(|| QueryError::UnresolvedAlias(name.alias.clone()))?;
        let table = catalog
            .table(table_name)
            .expect("registered aliases always name catalog tables");
        let column = table
            .column(&name.column)
            .ok_or_else(|| QueryError::UnknownColumn {
                alias: name.alias.clone(),
                column: name.column.clone(),
            })?;
        Ok((
            ColumnRef::new(table_name, &name.alias, &name.column),
            column.data_type,
        ))
    }
}

struct BoundRel {
    expr: ArcExpression,
    aliases: HashSet<String>,
}

struct BoundItem {
    expr: ArcExpression,
    /// `None` for boolean connectives, which have no comparable type.
    data_type: Option<DataType>,
}

pub struct Binder {
    catalog: Arc<Catalog>,
}

impl Binder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn bind(&self, ast: &QueryAst) -> Result<ArcExpression, QueryError> {
        let mut refs = ReferenceTable::default();
        Ok(self.bind_rel(ast, &mut refs)?.expr)
    }

    fn bind_rel(&self, ast: &QueryAst, refs: &mut ReferenceTable) -> Result<BoundRel, QueryError> {
        match ast {
            QueryAst::Get { table, alias } => {
                if self.catalog.table(table).is_none() {
                    return Err(QueryError::UnknownTable(table.clone()));
                }
                refs.register(alias, table)?;
                Ok(BoundRel {
                    expr: Expression::leaf(Operator::GetTable(TableRef::new(table, alias))),
                    aliases: HashSet::from([alias.clone()]),
                })
            }
            QueryAst::Distinct(input) => {
                let input = self.bind_rel(input, refs)?;
                Ok(BoundRel {
                    expr: Expression::node(Operator::Distinct, vec![input.expr]),
                    aliases: input.aliases,
                })
            }
            QueryAst::Project { columns, input } => {
                let input = self.bind_rel(input, refs)?;
                let mut resolved = Vec::with_capacity(columns.len());
                for name in columns {
                    let (column, _) = refs.resolve(&self.catalog, name)?;
                    resolved.push(column);
                }
                Ok(BoundRel {
                    expr: Expression::node(Operator::Project(resolved), vec![input.expr]),
                    aliases: input.aliases,
                })
            }
            QueryAst::Select { input, predicate } => {
                let input = self.bind_rel(input, refs)?;
                let predicate = self.bind_item(predicate, refs)?;
                Ok(BoundRel {
                    expr: Expression::node(Operator::Select, vec![input.expr, predicate.expr]),
                    aliases: input.aliases,
                })
            }
            QueryAst::EquiJoin {
                left_keys,
                right_keys,
                left,
                right,
            } => {
                let left = self.bind_rel(left, refs)?;
                let right = self.bind_rel(right, refs)?;
                let mut bound_left = Vec::with_capacity(left_keys.len());
                let mut bound_right = Vec::with_capacity(right_keys.len());
                for (l, r) in left_keys.iter().zip(right_keys) {
                    let (mut l_col, mut l_ty) = refs.resolve(&self.catalog, l)?;
                    let (mut r_col, mut r_ty) = refs.resolve(&self.catalog, r)?;
                    // The grammar does not force the left key to be written
                    // first; reorient if the pair arrived swapped.
                    if left.aliases.contains(&r_col.alias) && right.aliases.contains(&l_col.alias) {
                        std::mem::swap(&mut l_col, &mut r_col);
                        std::mem::swap(&mut l_ty, &mut r_ty);
                    }
                    if !left.aliases.contains(&l_col.alias) {
                        return Err(QueryError::MisplacedJoinKey {
                            alias: l_col.alias,
                            column: l_col.column,
                            side: "left",
                        });
                    }
                    if !right.aliases.contains(&r_col.alias) {
                        return Err(QueryError::MisplacedJoinKey {
                            alias: r_col.alias,
                            column: r_col.column,
                            side: "right",
                        });
                    }
                    if l_ty.common_type(r_ty).is_none() {
                        return Err(QueryError::TypeMismatch {
                            left: l_ty,
                            right: r_ty,
                        });
                    }
                    bound_left.push(l_col);
                    bound_right.push(r_col);
                }
                let aliases = left.aliases.union(&right.aliases).cloned().collect();
                Ok(BoundRel {
                    expr: Expression::node(
                        Operator::EquiJoin {
                            left_keys: bound_left,
                            right_keys: bound_right,
                        },
                        vec![left.expr, right.expr],
                    ),
                    aliases,
                })
            }
            other => Err(QueryError::Parse {
                position: 0,
                message: format!("item expression {other:?} where a relation was expected"),
            }),
        }
    }

    fn bind_item(&self, ast: &QueryAst, refs: &ReferenceTable) -> Result<BoundItem, QueryError> {
        match ast {
            QueryAst::Attr(name) => {
                let (column, data_type) = refs.resolve(&self.catalog, name)?;
                Ok(BoundItem {
                    expr: Expression::leaf(Operator::Attr(column)),
                    data_type: Some(data_type),
                })
            }
            QueryAst::Int(value) => Ok(BoundItem {
                expr: Expression::leaf(Operator::Const(Value::Int(*value))),
                data_type: Some(DataType::BigInt),
            }),
            QueryAst::Str(value) => Ok(BoundItem {
                expr: Expression::leaf(Operator::Const(Value::Str(value.clone()))),
                data_type: Some(DataType::VarChar(
                    value.len().min(u16::MAX as usize) as u16
                )),
            }),
            QueryAst::Cmp { op, left, right } => {
                let left = self.bind_item(left, refs)?;
                let right = self.bind_item(right, refs)?;
                if let (Some(l), Some(r)) = (left.data_type, right.data_type) {
                    if l.common_type(r).is_none() {
                        return Err(QueryError::TypeMismatch { left: l, right: r });
                    }
                }
                Ok(BoundItem {
                    expr: Expression::node(Operator::Cmp(*op), vec![left.expr, right.expr]),
                    data_type: None,
                })
            }
            QueryAst::And(left, right) | QueryAst::Or(left, right) => {
                let logic = if matches!(ast, QueryAst::And(_, _)) {
                    crate::nodes::LogicOp::And
                } else {
                    crate::nodes::LogicOp::Or
                };
                let left = self.bind_item(left, refs)?;
                let right = self.bind_item(right, refs)?;
                Ok(BoundItem {
                    expr: Expression::node(
                        Operator::Logic(logic),
                        vec![left.expr, right.expr],
                    ),
                    data_type: None,
                })
            }
            other => Err(QueryError::Parse {
                position: 0,
                message: format!("relation expression {other:?} where a predicate was expected"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::test_fixtures::fixture_catalog;

    fn bind(text: &str) -> Result<ArcExpression, QueryError> {
        Binder::new(fixture_catalog()).bind(&parse(text).unwrap())
    }

    #[test]
    fn binds_simple_get() {
        let expr = bind("GET(Sailors, S)").unwrap();
        assert!(matches!(expr.operator(), Operator::GetTable(t) if t.alias == "S"));
    }

    #[test]
    fn binds_join_keys_to_the_right_sides() {
        // Keys written backwards still land on the correct inputs.
        let expr = bind("EQJOIN(R.sid, S.sid, GET(Sailors, S), GET(Reserves, R))").unwrap();
        let Operator::EquiJoin {
            left_keys,
            right_keys,
        } = expr.operator()
        else {
            panic!("not a join");
        };
        assert_eq!(left_keys[0].alias, "S");
        assert_eq!(right_keys[0].alias, "R");
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            bind("GET(Submarines, S)"),
            Err(QueryError::UnknownTable(_))
        ));
        assert!(matches!(
            bind("SELECT(GET(Sailors, S), OP_GT(ATTR(S.draft), INT(7)))"),
            Err(QueryError::UnknownColumn { .. })
        ));
        assert!(matches!(
            bind("SELECT(GET(Sailors, S), OP_GT(ATTR(R.rating), INT(7)))"),
            Err(QueryError::UnresolvedAlias(_))
        ));
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        assert!(matches!(
            bind("EQJOIN(GET(Sailors, S), GET(Reserves, S))"),
            Err(QueryError::DuplicateAlias(_))
        ));
    }

    #[test]
    fn incomparable_types_are_rejected() {
        assert!(matches!(
            bind("SELECT(GET(Reserves, R), OP_EQ(ATTR(R.day), INT(7)))"),
            Err(QueryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn predicate_type_promotion_is_accepted() {
        assert!(bind("SELECT(GET(Sailors, S), OP_GT(ATTR(S.age), INT(30)))").is_ok());
    }
}
