//! 根查询 builder。
//!
//! ```ignore
//! use halo_criteria::prelude::*;
//!
//! let rendered = CriteriaBuilder::create("Document", "d")?
//!     .select("d.name")?
//!     .where_("d.age")?
//!     .gt(18)
//!     .order_by_asc("d.id")?
//!     .render()?;
//! ```

use crate::args::RenderedQuery;
use crate::builder::{BuilderContext, PredicateReceiver, QueryHolder, push_clause_predicate};
use crate::capability::{
    HasCte, HasFrom, HasGroupBy, HasLimit, HasOrderBy, HasParameters, HasSelect, HasWhere,
    HasWindow,
};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::generator::{self, RenderError};
use crate::keyset::{HasKeyset, KeysetPage};
use crate::model::{QueryExpression, QueryModel};
use crate::paginated::PaginatedCriteriaBuilder;
use crate::set_operation::{SetSplit, TopLevelSet, set_operator_methods};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct CriteriaBuilder {
    query: QueryModel,
    config: Rc<QueryConfig>,
}

impl Default for CriteriaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CriteriaBuilder {
    /// 使用默认配置（当前全局默认方言）。
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            query: QueryModel::new(),
            config: Rc::new(config),
        }
    }

    /// `FROM entity alias` 的快捷入口。
    pub fn create(entity: &str, alias: &str) -> Result<Self, BuildError> {
        Self::new().from(entity, alias)
    }

    pub fn model(&self) -> &QueryModel {
        &self.query
    }

    pub fn into_model(self) -> QueryModel {
        self.query
    }

    pub fn into_expression(self) -> QueryExpression {
        QueryExpression::Select(Box::new(self.query))
    }

    /// 渲染为带命名参数的查询文本。builder 不被消费，可以重复渲染。
    pub fn render(&self) -> Result<RenderedQuery, RenderError> {
        generator::render_query(&self.query, &self.config)
    }

    /// 分页：有可用的 keyset 引用时按 keyset 定位，否则退回偏移分页。
    pub fn page(
        self,
        keyset_page: Option<KeysetPage>,
        first_result: u64,
        max_results: u64,
    ) -> Result<PaginatedCriteriaBuilder, BuildError> {
        PaginatedCriteriaBuilder::new(self.query, self.config, keyset_page, first_result, max_results)
    }

    fn split(self) -> SetSplit<TopLevelSet> {
        SetSplit::top_level(self.query, self.config)
    }

    set_operator_methods!(TopLevelSet);
}

impl BuilderContext for CriteriaBuilder {
    fn config(&self) -> &Rc<QueryConfig> {
        &self.config
    }
}

impl QueryHolder for CriteriaBuilder {
    fn query(&self) -> &QueryModel {
        &self.query
    }

    fn query_mut(&mut self) -> &mut QueryModel {
        &mut self.query
    }
}

impl PredicateReceiver for CriteriaBuilder {
    fn add_predicate(&mut self, clause: ClauseType, predicate: Expr) {
        push_clause_predicate(&mut self.query, clause, predicate);
    }
}

impl HasFrom for CriteriaBuilder {}
impl HasSelect for CriteriaBuilder {}
impl HasWhere for CriteriaBuilder {}
impl HasGroupBy for CriteriaBuilder {}
impl HasOrderBy for CriteriaBuilder {}
impl HasLimit for CriteriaBuilder {}
impl HasWindow for CriteriaBuilder {}
impl HasCte for CriteriaBuilder {}
impl HasParameters for CriteriaBuilder {}
impl HasKeyset for CriteriaBuilder {}
