// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The operator and expression model.
//!
//! An [`Expression`] is an immutable n-ary tree of [`Operator`]s. Children
//! are either concrete sub-expressions or [`GroupId`] placeholders; parser
//! output and extracted plans are always pure (no group children), while
//! rule bindings and substitutes lean on group children to share memo
//! state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cascades::GroupId;

pub use minnow_catalog::Datum as Value;

/// A table occurrence in a query. Two occurrences of the same table under
/// different aliases are distinct operands everywhere in the optimizer, so
/// equality covers the alias, not just the table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub table: String,
    pub alias: String,
}

impl TableRef {
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.table, self.alias)
    }
}

/// A fully-resolved column reference. The table name rides along so that
/// statistics lookups never need an alias table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

impl std::fmt::Display for LogicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicOp::And => write!(f, "AND"),
            LogicOp::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortKey {
    pub column: ColumnRef,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: Direction::Asc,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// Every operator the optimizer knows, logical and physical alike, plus the
/// pattern-only `Leaf` and the scalar item operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Pattern placeholder; never appears in concrete plans.
    Leaf(usize),

    // Logical operators.
    GetTable(TableRef),
    EquiJoin {
        left_keys: Vec<ColumnRef>,
        right_keys: Vec<ColumnRef>,
    },
    Select,
    Project(Vec<ColumnRef>),
    Distinct,

    // Physical operators.
    FileScan(TableRef),
    IndexScan {
        table: TableRef,
        index: String,
        key_columns: Vec<ColumnRef>,
    },
    NestedLoopsJoin {
        left_keys: Vec<ColumnRef>,
        right_keys: Vec<ColumnRef>,
    },
    HashJoin {
        left_keys: Vec<ColumnRef>,
        right_keys: Vec<ColumnRef>,
    },
    SortMergeJoin {
        left_keys: Vec<ColumnRef>,
        right_keys: Vec<ColumnRef>,
    },
    Filter,
    ProjectList(Vec<ColumnRef>),
    HashDistinct,
    /// Order enforcer; also the only physical sort.
    Sort(Vec<SortKey>),

    // Item (scalar) operators.
    Attr(ColumnRef),
    Const(Value),
    Cmp(CmpOp),
    Logic(LogicOp),
}

impl Operator {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Operator::Leaf(_))
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Operator::GetTable(_)
                | Operator::EquiJoin { .. }
                | Operator::Select
                | Operator::Project(_)
                | Operator::Distinct
        )
    }

    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            Operator::FileScan(_)
                | Operator::IndexScan { .. }
                | Operator::NestedLoopsJoin { .. }
                | Operator::HashJoin { .. }
                | Operator::SortMergeJoin { .. }
                | Operator::Filter
                | Operator::ProjectList(_)
                | Operator::HashDistinct
                | Operator::Sort(_)
        )
    }

    /// Item operators: scalar sub-expressions that bypass most of the
    /// search.
    pub fn is_element(&self) -> bool {
        matches!(
            self,
            Operator::Attr(_) | Operator::Const(_) | Operator::Cmp(_) | Operator::Logic(_)
        )
    }

    pub fn arity(&self) -> usize {
        match self {
            Operator::Leaf(_)
            | Operator::GetTable(_)
            | Operator::FileScan(_)
            | Operator::IndexScan { .. }
            | Operator::Attr(_)
            | Operator::Const(_) => 0,
            Operator::Project(_)
            | Operator::Distinct
            | Operator::ProjectList(_)
            | Operator::HashDistinct
            | Operator::Sort(_) => 1,
            Operator::EquiJoin { .. }
            | Operator::Select
            | Operator::NestedLoopsJoin { .. }
            | Operator::HashJoin { .. }
            | Operator::SortMergeJoin { .. }
            | Operator::Filter
            | Operator::Cmp(_)
            | Operator::Logic(_) => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Leaf(_) => "Leaf",
            Operator::GetTable(_) => "GetTable",
            Operator::EquiJoin { .. } => "EquiJoin",
            Operator::Select => "Select",
            Operator::Project(_) => "Project",
            Operator::Distinct => "Distinct",
            Operator::FileScan(_) => "FileScan",
            Operator::IndexScan { .. } => "IndexScan",
            Operator::NestedLoopsJoin { .. } => "NestedLoopsJoin",
            Operator::HashJoin { .. } => "HashJoin",
            Operator::SortMergeJoin { .. } => "SortMergeJoin",
            Operator::Filter => "Filter",
            Operator::ProjectList(_) => "ProjectList",
            Operator::HashDistinct => "HashDistinct",
            Operator::Sort(_) => "Sort",
            Operator::Attr(_) => "Attr",
            Operator::Const(_) => "Const",
            Operator::Cmp(_) => "Cmp",
            Operator::Logic(_) => "Logic",
        }
    }
}

fn fmt_columns(f: &mut std::fmt::Formatter<'_>, columns: &[ColumnRef]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{column}")?;
    }
    write!(f, "]")
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Leaf(i) => write!(f, "Leaf<{i}>"),
            Operator::GetTable(t) => write!(f, "GetTable({t})"),
            Operator::FileScan(t) => write!(f, "FileScan({t})"),
            Operator::IndexScan { table, index, .. } => {
                write!(f, "IndexScan({table} via {index})")
            }
            Operator::EquiJoin {
                left_keys,
                right_keys,
            }
            | Operator::NestedLoopsJoin {
                left_keys,
                right_keys,
            }
            | Operator::HashJoin {
                left_keys,
                right_keys,
            }
            | Operator::SortMergeJoin {
                left_keys,
                right_keys,
            } => {
                write!(f, "{}(", self.name())?;
                fmt_columns(f, left_keys)?;
                write!(f, ",")?;
                fmt_columns(f, right_keys)?;
                write!(f, ")")
            }
            Operator::Select => write!(f, "Select"),
            Operator::Filter => write!(f, "Filter"),
            Operator::Project(columns) | Operator::ProjectList(columns) => {
                write!(f, "{}(", self.name())?;
                fmt_columns(f, columns)?;
                write!(f, ")")
            }
            Operator::Distinct => write!(f, "Distinct"),
            Operator::HashDistinct => write!(f, "HashDistinct"),
            Operator::Sort(keys) => {
                write!(f, "Sort(")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, ")")
            }
            Operator::Attr(c) => write!(f, "Attr({c})"),
            Operator::Const(v) => write!(f, "Const({v})"),
            Operator::Cmp(op) => write!(f, "Cmp({op})"),
            Operator::Logic(op) => write!(f, "Logic({op})"),
        }
    }
}

pub type ArcExpression = Arc<Expression>;

/// A child of an [`Expression`]: either a concrete sub-expression or a memo
/// group placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprChild {
    Expr(ArcExpression),
    Group(GroupId),
}

impl ExprChild {
    pub fn as_expr(&self) -> Option<&ArcExpression> {
        match self {
            ExprChild::Expr(e) => Some(e),
            ExprChild::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<GroupId> {
        match self {
            ExprChild::Expr(_) => None,
            ExprChild::Group(g) => Some(*g),
        }
    }
}

impl From<ArcExpression> for ExprChild {
    fn from(e: ArcExpression) -> Self {
        ExprChild::Expr(e)
    }
}

impl From<GroupId> for ExprChild {
    fn from(g: GroupId) -> Self {
        ExprChild::Group(g)
    }
}

/// An immutable operator tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pub op: Operator,
    pub children: Vec<ExprChild>,
}

impl Expression {
    pub fn new(op: Operator, children: Vec<ExprChild>) -> ArcExpression {
        Arc::new(Self { op, children })
    }

    /// Build a pure expression from sub-expressions.
    pub fn node(op: Operator, inputs: Vec<ArcExpression>) -> ArcExpression {
        Arc::new(Self {
            op,
            children: inputs.into_iter().map(ExprChild::Expr).collect(),
        })
    }

    pub fn leaf(op: Operator) -> ArcExpression {
        Arc::new(Self {
            op,
            children: Vec::new(),
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn input(&self, i: usize) -> &ExprChild {
        &self.children[i]
    }

    /// True when no group placeholders appear anywhere in the tree.
    pub fn is_pure(&self) -> bool {
        self.children.iter().all(|child| match child {
            ExprChild::Expr(e) => e.is_pure(),
            ExprChild::Group(_) => false,
        })
    }

    /// Root first, then each child subtree. Group children are opaque and
    /// contribute nothing.
    pub fn preorder(&self) -> Vec<&Operator> {
        let mut out = Vec::new();
        self.walk_pre(&mut out);
        out
    }

    fn walk_pre<'a>(&'a self, out: &mut Vec<&'a Operator>) {
        out.push(&self.op);
        for child in &self.children {
            if let ExprChild::Expr(e) = child {
                e.walk_pre(out);
            }
        }
    }

    /// Child subtrees first, then the root.
    pub fn postorder(&self) -> Vec<&Operator> {
        let mut out = Vec::new();
        self.walk_post(&mut out);
        out
    }

    fn walk_post<'a>(&'a self, out: &mut Vec<&'a Operator>) {
        for child in &self.children {
            if let ExprChild::Expr(e) = child {
                e.walk_post(out);
            }
        }
        out.push(&self.op);
    }

    /// For binary nodes: left subtree, root, right subtree. Leaves yield
    /// themselves; other arities visit the first child before the root.
    pub fn inorder(&self) -> Vec<&Operator> {
        let mut out = Vec::new();
        self.walk_in(&mut out);
        out
    }

    fn walk_in<'a>(&'a self, out: &mut Vec<&'a Operator>) {
        let mut children = self.children.iter();
        if let Some(ExprChild::Expr(first)) = children.next() {
            first.walk_in(out);
        }
        out.push(&self.op);
        for child in children {
            if let ExprChild::Expr(e) = child {
                e.walk_in(out);
            }
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.op)?;
        for child in &self.children {
            match child {
                ExprChild::Expr(e) => write!(f, " {e}")?,
                ExprChild::Group(g) => write!(f, " {g}")?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(table: &str, alias: &str) -> ArcExpression {
        Expression::leaf(Operator::GetTable(TableRef::new(table, alias)))
    }

    fn join(l: ArcExpression, r: ArcExpression) -> ArcExpression {
        Expression::node(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Sailors", "S", "sid")],
                right_keys: vec![ColumnRef::new("Reserves", "R", "sid")],
            },
            vec![l, r],
        )
    }

    #[test]
    fn alias_identity_distinguishes_occurrences() {
        let a = Operator::GetTable(TableRef::new("Sailors", "S1"));
        let b = Operator::GetTable(TableRef::new("Sailors", "S2"));
        assert_ne!(a, b);
        assert_eq!(a, Operator::GetTable(TableRef::new("Sailors", "S1")));
    }

    #[test]
    fn leaf_is_no_other_class() {
        let leaf = Operator::Leaf(0);
        assert!(leaf.is_leaf());
        assert!(!leaf.is_logical());
        assert!(!leaf.is_physical());
        assert!(!leaf.is_element());
        assert_eq!(leaf.arity(), 0);
    }

    #[test]
    fn traversal_laws() {
        let tree = join(get("Sailors", "S"), get("Reserves", "R"));
        let names =
            |ops: Vec<&Operator>| ops.into_iter().map(|o| o.name()).collect::<Vec<_>>();
        assert_eq!(
            names(tree.preorder()),
            vec!["EquiJoin", "GetTable", "GetTable"]
        );
        assert_eq!(
            names(tree.postorder()),
            vec!["GetTable", "GetTable", "EquiJoin"]
        );
        assert_eq!(
            names(tree.inorder()),
            vec!["GetTable", "EquiJoin", "GetTable"]
        );
    }

    #[test]
    fn display_is_parenthesized() {
        let tree = join(get("Sailors", "S"), get("Reserves", "R"));
        assert_eq!(
            tree.to_string(),
            "(EquiJoin([S.sid],[R.sid]) (GetTable(Sailors S)) (GetTable(Reserves R)))"
        );
    }

    #[test]
    fn purity() {
        let pure = join(get("Sailors", "S"), get("Reserves", "R"));
        assert!(pure.is_pure());
        let bound = Expression::new(
            pure.op.clone(),
            vec![ExprChild::Group(GroupId(0)), ExprChild::Group(GroupId(1))],
        );
        assert!(!bound.is_pure());
    }
}
