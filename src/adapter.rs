//! 执行引擎接缝：本库只负责渲染，执行交给实现 [`QueryExecutor`] 的集成方。

use crate::args::RenderedQuery;
use crate::criteria::CriteriaBuilder;
use crate::error::BuildError;
use crate::generator::RenderError;
use crate::paginated::{PaginatedCriteriaBuilder, PagedRows};
use crate::set_operation::FinalSetOperationBuilder;
use crate::value::SqlValue;

/// 执行渲染好的查询。结果行中各列按选择列表的顺序排列。
pub trait QueryExecutor {
    type Error: std::error::Error + 'static;

    fn result_list(&mut self, query: &RenderedQuery) -> Result<Vec<Vec<SqlValue>>, Self::Error>;

    fn update_count(&mut self, query: &RenderedQuery) -> Result<u64, Self::Error>;
}

/// 在语句交给执行器之前改写它（加注释、改绑定值等）。
pub trait QueryDecorator {
    fn decorate(&self, query: RenderedQuery) -> RenderedQuery;
}

impl<F> QueryDecorator for F
where
    F: Fn(RenderedQuery) -> RenderedQuery,
{
    fn decorate(&self, query: RenderedQuery) -> RenderedQuery {
        self(query)
    }
}

/// 先经过 decorator，再交给内部执行器。
#[derive(Debug, Clone)]
pub struct Decorated<E, D> {
    inner: E,
    decorator: D,
}

impl<E, D> Decorated<E, D> {
    pub fn new(inner: E, decorator: D) -> Self {
        Self { inner, decorator }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: QueryExecutor, D: QueryDecorator> QueryExecutor for Decorated<E, D> {
    type Error = E::Error;

    fn result_list(&mut self, query: &RenderedQuery) -> Result<Vec<Vec<SqlValue>>, E::Error> {
        let query = self.decorator.decorate(query.clone());
        self.inner.result_list(&query)
    }

    fn update_count(&mut self, query: &RenderedQuery) -> Result<u64, E::Error> {
        let query = self.decorator.decorate(query.clone());
        self.inner.update_count(&query)
    }
}

/// 渲染或执行阶段的错误；执行器的错误原样保留在 `Executor` 中。
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("query execution failed: {0}")]
    Executor(#[source] E),
}

impl RenderedQuery {
    pub fn result_list<X: QueryExecutor>(
        &self,
        executor: &mut X,
    ) -> Result<Vec<Vec<SqlValue>>, ExecuteError<X::Error>> {
        executor.result_list(self).map_err(ExecuteError::Executor)
    }

    pub fn update_count<X: QueryExecutor>(&self, executor: &mut X) -> Result<u64, ExecuteError<X::Error>> {
        executor.update_count(self).map_err(ExecuteError::Executor)
    }
}

impl CriteriaBuilder {
    pub fn result_list<X: QueryExecutor>(
        &self,
        executor: &mut X,
    ) -> Result<Vec<Vec<SqlValue>>, ExecuteError<X::Error>> {
        self.render()?.result_list(executor)
    }
}

impl FinalSetOperationBuilder {
    pub fn result_list<X: QueryExecutor>(
        &self,
        executor: &mut X,
    ) -> Result<Vec<Vec<SqlValue>>, ExecuteError<X::Error>> {
        self.render()?.result_list(executor)
    }
}

impl PaginatedCriteriaBuilder {
    /// 执行本页查询并提取下一次翻页用的 keyset 引用。
    pub fn paged_result_list<X: QueryExecutor>(
        &self,
        executor: &mut X,
    ) -> Result<PagedRows, ExecuteError<X::Error>> {
        let rows = self.render()?.result_list(executor)?;
        Ok(self.extract_keyset_page(rows)?)
    }
}
