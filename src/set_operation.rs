//! 集合运算：UNION / INTERSECT / EXCEPT 及其 ALL 变体。
//!
//! `union()` 等方法把当前查询作为左操作数，返回下一个操作数的 builder；
//! `start_union()` 等方法打开一个嵌套分组，分组内可以继续嵌套。嵌套深度体现在
//! 类型参数上：顶层是 [`TopLevelSet`]，每打开一层包一层 [`NestedSet`]，
//! `end_set()` 关闭当前层并回到外层。

use crate::args::RenderedQuery;
use crate::builder::{BuilderContext, PredicateReceiver, QueryHolder, push_clause_predicate};
use crate::capability::{
    HasFrom, HasGroupBy, HasLimit, HasOrderBy, HasParameters, HasSelect, HasWhere, HasWindow,
};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::generator::{self, RenderError};
use crate::model::{CteDefinition, OrderByItem, QueryExpression, QueryModel, SetOperation, SetOperator};
use std::rc::Rc;

/// 一层集合运算关闭后接收结果的位置。
pub trait SetOperationParent {
    type Output;
    fn finish_set(self, set: SetOperation) -> Self::Output;
}

/// 顶层：关闭后得到 [`FinalSetOperationBuilder`]。
pub struct TopLevelSet {
    ctes: Vec<CteDefinition>,
    config: Rc<QueryConfig>,
}

impl SetOperationParent for TopLevelSet {
    type Output = FinalSetOperationBuilder;

    fn finish_set(self, mut set: SetOperation) -> FinalSetOperationBuilder {
        set.ctes = self.ctes;
        tracing::debug!(operands = set.rest.len() + 1, "closed set operation");
        FinalSetOperationBuilder {
            set,
            config: self.config,
        }
    }
}

/// 嵌套分组：关闭后作为一个操作数交回外层。
pub struct NestedSet<N> {
    parent: N,
    outer: SetLevel,
    config: Rc<QueryConfig>,
}

impl<N: SetOperationParent> SetOperationParent for NestedSet<N> {
    type Output = SetOperationContinuation<N>;

    fn finish_set(self, set: SetOperation) -> SetOperationContinuation<N> {
        SetOperationContinuation {
            parent: self.parent,
            level: self.outer,
            pending: QueryExpression::Set(Box::new(set)),
            config: self.config,
        }
    }
}

/// 一层中已经连接好的操作数；`next` 是下一个操作数前的运算符。
pub(crate) enum SetLevel {
    Empty,
    Open { set: SetOperation, next: SetOperator },
}

impl SetLevel {
    fn append(self, operand: QueryExpression, next: SetOperator) -> Self {
        match self {
            Self::Empty => Self::Open {
                set: SetOperation::new(operand),
                next,
            },
            Self::Open { mut set, next: op } => {
                set.rest.push((op, operand));
                Self::Open { set, next }
            }
        }
    }

    fn close(self, operand: QueryExpression) -> SetOperation {
        match self {
            Self::Empty => SetOperation::new(operand),
            Self::Open { mut set, next } => {
                set.rest.push((next, operand));
                set
            }
        }
    }
}

/// 拆开后的当前层：外层位置、已连接的操作数、尚未连接的最后一个操作数。
pub(crate) struct SetSplit<N> {
    pub(crate) parent: N,
    pub(crate) level: SetLevel,
    pub(crate) pending: QueryExpression,
    pub(crate) config: Rc<QueryConfig>,
}

impl SetSplit<TopLevelSet> {
    /// 根查询作为第一个操作数；它的 CTE 提升到整个集合运算之前。
    pub(crate) fn top_level(mut query: QueryModel, config: Rc<QueryConfig>) -> Self {
        let ctes = std::mem::take(&mut query.ctes);
        SetSplit {
            parent: TopLevelSet {
                ctes,
                config: config.clone(),
            },
            level: SetLevel::Empty,
            pending: QueryExpression::Select(Box::new(query)),
            config,
        }
    }
}

impl<N: SetOperationParent> SetSplit<N> {
    pub(crate) fn connect(self, op: SetOperator) -> SetOperandBuilder<N> {
        SetOperandBuilder {
            parent: self.parent,
            level: self.level.append(self.pending, op),
            query: QueryModel::new(),
            config: self.config,
        }
    }

    pub(crate) fn start(self, op: SetOperator) -> SetOperandBuilder<NestedSet<N>> {
        let nested = NestedSet {
            parent: self.parent,
            outer: self.level.append(self.pending, op),
            config: self.config.clone(),
        };
        SetOperandBuilder {
            parent: nested,
            level: SetLevel::Empty,
            query: QueryModel::new(),
            config: self.config,
        }
    }

    pub(crate) fn close(self) -> N::Output {
        let set = self.level.close(self.pending);
        self.parent.finish_set(set)
    }
}

/// 生成六种运算符的连接方法与 `start_*` 嵌套方法。调用方需要提供 `fn split(self) -> SetSplit<N>`。
macro_rules! set_operator_methods {
    ($parent:ty) => {
        pub fn union(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::Union)
        }

        pub fn union_all(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::UnionAll)
        }

        pub fn intersect(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::Intersect)
        }

        pub fn intersect_all(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::IntersectAll)
        }

        pub fn except(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::Except)
        }

        pub fn except_all(self) -> $crate::set_operation::SetOperandBuilder<$parent> {
            self.split().connect($crate::model::SetOperator::ExceptAll)
        }

        pub fn start_union(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::Union)
        }

        pub fn start_union_all(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::UnionAll)
        }

        pub fn start_intersect(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::Intersect)
        }

        pub fn start_intersect_all(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::IntersectAll)
        }

        pub fn start_except(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::Except)
        }

        pub fn start_except_all(
            self,
        ) -> $crate::set_operation::SetOperandBuilder<$crate::set_operation::NestedSet<$parent>> {
            self.split().start($crate::model::SetOperator::ExceptAll)
        }
    };
}

pub(crate) use set_operator_methods;

/// 集合运算中的一个 SELECT 操作数。
pub struct SetOperandBuilder<N> {
    parent: N,
    level: SetLevel,
    query: QueryModel,
    config: Rc<QueryConfig>,
}

impl<N: SetOperationParent> SetOperandBuilder<N> {
    fn split(self) -> SetSplit<N> {
        SetSplit {
            parent: self.parent,
            level: self.level,
            pending: QueryExpression::Select(Box::new(self.query)),
            config: self.config,
        }
    }

    set_operator_methods!(N);

    /// 关闭当前层。
    pub fn end_set(self) -> N::Output {
        self.split().close()
    }
}

impl<N: SetOperationParent> BuilderContext for SetOperandBuilder<N> {
    fn config(&self) -> &Rc<QueryConfig> {
        &self.config
    }
}

impl<N: SetOperationParent> QueryHolder for SetOperandBuilder<N> {
    fn query(&self) -> &QueryModel {
        &self.query
    }

    fn query_mut(&mut self) -> &mut QueryModel {
        &mut self.query
    }
}

impl<N: SetOperationParent> PredicateReceiver for SetOperandBuilder<N> {
    fn add_predicate(&mut self, clause: ClauseType, predicate: Expr) {
        push_clause_predicate(&mut self.query, clause, predicate);
    }
}

impl<N: SetOperationParent> HasFrom for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasSelect for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasWhere for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasGroupBy for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasOrderBy for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasLimit for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasWindow for SetOperandBuilder<N> {}
impl<N: SetOperationParent> HasParameters for SetOperandBuilder<N> {}

/// 嵌套分组关闭之后：可以继续连接，也可以关闭外层。
pub struct SetOperationContinuation<N> {
    parent: N,
    level: SetLevel,
    pending: QueryExpression,
    config: Rc<QueryConfig>,
}

impl<N: SetOperationParent> SetOperationContinuation<N> {
    fn split(self) -> SetSplit<N> {
        SetSplit {
            parent: self.parent,
            level: self.level,
            pending: self.pending,
            config: self.config,
        }
    }

    set_operator_methods!(N);

    pub fn end_set(self) -> N::Output {
        self.split().close()
    }
}

/// 顶层集合运算已关闭：只剩整体的 ORDER BY / LIMIT / OFFSET 和渲染。
pub struct FinalSetOperationBuilder {
    set: SetOperation,
    config: Rc<QueryConfig>,
}

impl FinalSetOperationBuilder {
    /// 排序表达式针对合并后的结果列，不做别名解析。
    pub fn order_by(mut self, expression: &str, ascending: bool, nulls_first: bool) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::OrderBy, expression)?;
        self.set.order_by.push(OrderByItem {
            expr,
            ascending,
            nulls_first,
        });
        Ok(self)
    }

    pub fn order_by_asc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, true, false)
    }

    pub fn order_by_desc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, false, false)
    }

    pub fn limit(mut self, max_results: u64) -> Self {
        self.set.limit = Some(max_results);
        self
    }

    pub fn offset(mut self, first_result: u64) -> Self {
        self.set.offset = Some(first_result);
        self
    }

    pub fn model(&self) -> &SetOperation {
        &self.set
    }

    pub fn into_expression(self) -> QueryExpression {
        QueryExpression::Set(Box::new(self.set))
    }

    pub fn render(&self) -> Result<RenderedQuery, RenderError> {
        generator::render_set(&self.set, &self.config)
    }
}

impl BuilderContext for FinalSetOperationBuilder {
    fn config(&self) -> &Rc<QueryConfig> {
        &self.config
    }
}
