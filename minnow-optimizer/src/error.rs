// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use minnow_catalog::{CatalogError, DataType};
use thiserror::Error;

use crate::cascades::{GroupId, MultiExprId};

/// Errors attributable to the query: it failed to parse, to resolve against
/// the catalog, to type-check, or the rule set cannot implement one of its
/// operators. No optimizer state survives a `QueryError`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("duplicate alias `{0}`")]
    DuplicateAlias(String),

    #[error("unresolved alias `{0}`")]
    UnresolvedAlias(String),

    #[error("unknown column `{alias}.{column}`")]
    UnknownColumn { alias: String, column: String },

    #[error("join key `{alias}.{column}` does not belong to the {side} input")]
    MisplacedJoinKey {
        alias: String,
        column: String,
        side: &'static str,
    },

    #[error("incomparable types `{left}` and `{right}`")]
    TypeMismatch { left: DataType, right: DataType },

    #[error("no physical plan implements `{operator}` in group {group}")]
    NoPlan { operator: String, group: GroupId },
}

/// Internal invariant violations. These are assertions: a correct
/// implementation never produces them on any input.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("winner for group {group} already finalized")]
    WinnerFinalizedTwice { group: GroupId },

    #[error("rule `{rule}` fired twice on expression {expr}")]
    RuleFiredTwice {
        rule: &'static str,
        expr: MultiExprId,
    },

    #[error("malformed pattern in rule `{rule}`: {message}")]
    BadPattern {
        rule: &'static str,
        message: String,
    },

    #[error("group child placeholder reached `{0}`")]
    UnexpectedGroupChild(&'static str),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
