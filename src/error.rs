//! 构建期错误：在引入问题的那一次调用上立即返回。

use crate::clause::ClauseType;
use crate::parser::ParseError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("{clause}: {argument} must not be empty")]
    EmptyArgument {
        clause: ClauseType,
        argument: &'static str,
    },
    #[error("{clause}: invalid expression `{expression}`: {source}")]
    Parse {
        clause: ClauseType,
        expression: String,
        #[source]
        source: ParseError,
    },
    #[error("SELECT NEW {constructor}: argument position {position} is already taken")]
    DuplicateSelectPosition { constructor: String, position: usize },
    #[error("{clause}: no FROM item to attach to")]
    MissingFrom { clause: ClauseType },
    #[error("PARAMETER: `:{name}` is reserved for generated parameters")]
    ReservedParameterName { name: String },
    #[error("subquery alias `{alias}` is registered twice")]
    DuplicateSubqueryAlias { alias: String },
    #[error("subquery alias `{alias}` does not occur in `{template}`")]
    UnknownSubqueryAlias { alias: String, template: String },
    #[error("WITH: a CTE named `{name}` is already registered")]
    DuplicateCte { name: String },
    #[error("WITH {name}: {bound} bound columns but {declared} declared")]
    CteBindingMismatch {
        name: String,
        declared: usize,
        bound: usize,
    },
    #[error("WITH {name}: column `{column}` is bound twice")]
    DuplicateCteBinding { name: String, column: String },
    #[error("WINDOW: a window named `{name}` is already registered")]
    DuplicateWindow { name: String },
    #[error("KEYSET: tuple has {actual} values but the query orders by {expected} expressions")]
    KeysetShapeMismatch { expected: usize, actual: usize },
    #[error("KEYSET: `{expression}` is not an ORDER BY expression of this query")]
    UnknownKeysetExpression { expression: String },
    #[error("KEYSET: `{expression}` was given twice")]
    DuplicateKeysetExpression { expression: String },
    #[error("PAGINATION: {0}")]
    InvalidPage(&'static str),
}

impl BuildError {
    pub(crate) fn empty(clause: ClauseType, argument: &'static str) -> Self {
        Self::EmptyArgument { clause, argument }
    }
}
