//! halo-criteria：类型安全的查询构建器。
//!
//! 调用方通过一串按值消费的 builder 调用组装查询（选择、JOIN、过滤、分组、排序、
//! 集合运算、CTE、窗口、keyset 分页），最后渲染为带命名参数的查询文本和参数绑定表，
//! 交给外部执行引擎执行。

pub mod adapter;
pub mod args;
pub mod builder;
#[cfg(test)]
mod builder_tests;
pub mod capability;
pub mod case_when;
pub mod clause;
pub mod config;
pub mod criteria;
pub mod cte;
pub mod error;
pub mod expr;
pub mod flavor;
pub mod generator;
pub mod join;
pub mod keyset;
#[cfg(test)]
mod keyset_tests;
pub mod macros;
pub use crate::macros::*;
#[cfg(test)]
mod macros_tests;
pub mod model;
pub mod paginated;
pub mod parser;
pub mod predicate_group;
pub mod render;
pub mod restriction;
pub mod select_object;
#[cfg(test)]
mod select_tests;
pub mod set_operation;
#[cfg(test)]
mod set_operation_tests;
pub mod slot;
pub(crate) mod string_builder;
pub mod subquery;
#[cfg(test)]
mod subquery_tests;
pub mod value;
pub mod window;
#[cfg(test)]
mod window_tests;

pub use crate::adapter::{Decorated, ExecuteError, QueryDecorator, QueryExecutor};
pub use crate::args::{CompileError, ParameterRegistry, RenderedQuery};
pub use crate::clause::ClauseType;
pub use crate::config::QueryConfig;
pub use crate::criteria::CriteriaBuilder;
pub use crate::error::BuildError;
pub use crate::expr::{BooleanOperator, ComparisonOperator, Expr, PathReference, Quantifier};
pub use crate::flavor::{Flavor, default_flavor, set_default_flavor, set_default_flavor_scoped};
pub use crate::generator::{RenderError, render, render_query, render_set};
pub use crate::keyset::{Keyset, KeysetMode, KeysetPage};
pub use crate::model::{JoinType, QueryExpression, QueryModel, SetOperator};
pub use crate::paginated::{PagedRows, PaginatedCriteriaBuilder};
pub use crate::parser::{ExpressionParser, ParseError, SimpleExpressionParser};
pub use crate::set_operation::FinalSetOperationBuilder;
pub use crate::value::{ParameterType, SqlValue};

/// 常用导入：根 builder 与全部能力 trait。
pub mod prelude {
    pub use crate::builder::BuilderContext;
    pub use crate::capability::{
        HasCte, HasFrom, HasGroupBy, HasLimit, HasOrderBy, HasParameters, HasSelect, HasWhere,
        HasWindow,
    };
    pub use crate::keyset::HasKeyset;
    pub use crate::{CriteriaBuilder, Flavor, JoinType, Keyset, KeysetPage, QueryConfig, SqlValue};
}
