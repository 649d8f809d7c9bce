//! 分页查询：在 keyset 定位与偏移分页之间选择，并从结果行中提取下一页的 keyset 引用。
//!
//! keyset 模式下 ORDER BY 的各个表达式追加到选择列表末尾，结果行的最后 N 列就是
//! 该行的 keyset；[`PaginatedCriteriaBuilder::extract_keyset_page`] 把它们剥离出来。

use crate::args::RenderedQuery;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::{Expr, PathReference};
use crate::generator::{self, RenderError};
use crate::keyset::{Keyset, KeysetLink, KeysetMode, KeysetPage};
use crate::model::{QueryModel, SelectItem};
use crate::value::SqlValue;
use std::rc::Rc;

/// 一页结果：去掉 keyset 列之后的行，以及可用于翻页的 keyset 引用。
#[derive(Debug, Clone, PartialEq)]
pub struct PagedRows {
    pub rows: Vec<Vec<SqlValue>>,
    pub page: KeysetPage,
}

#[derive(Debug, Clone)]
pub struct PaginatedCriteriaBuilder {
    query: QueryModel,
    config: Rc<QueryConfig>,
    first_result: u64,
    max_results: u64,
    mode: KeysetMode,
    reference: Option<Keyset>,
    extract_all_keysets: bool,
}

impl PaginatedCriteriaBuilder {
    pub(crate) fn new(
        mut query: QueryModel,
        config: Rc<QueryConfig>,
        keyset_page: Option<KeysetPage>,
        first_result: u64,
        max_results: u64,
    ) -> Result<Self, BuildError> {
        if max_results == 0 {
            return Err(BuildError::InvalidPage("max results must be greater than zero"));
        }

        let (mode, reason) = match &keyset_page {
            Some(page) => page.decide(first_result, max_results, query.order_by.len()),
            None => (KeysetMode::None, "no keyset page"),
        };
        tracing::debug!(first_result, max_results, mode = ?mode, reason, "selected pagination mode");

        let reference = keyset_page
            .as_ref()
            .and_then(|p| p.reference(mode))
            .cloned();
        assign_root_aliases(&mut query);

        Ok(Self {
            query,
            config,
            first_result,
            max_results,
            mode,
            reference,
            extract_all_keysets: false,
        })
    }

    /// 为 true 时，提取出的 [`KeysetPage`] 带上本页每一行的 keyset。
    pub fn with_keyset_extraction(mut self, enabled: bool) -> Self {
        self.extract_all_keysets = enabled;
        self
    }

    pub fn keyset_mode(&self) -> KeysetMode {
        self.mode
    }

    pub fn first_result(&self) -> u64 {
        self.first_result
    }

    pub fn max_results(&self) -> u64 {
        self.max_results
    }

    pub fn model(&self) -> &QueryModel {
        &self.query
    }

    /// 本页查询：keyset 模式下只有 LIMIT；偏移模式下 LIMIT + OFFSET。
    pub fn render(&self) -> Result<RenderedQuery, RenderError> {
        generator::render_query(&self.page_query(), &self.config)
    }

    fn page_query(&self) -> QueryModel {
        let mut query = self.query.clone();
        match &self.reference {
            Some(keyset) => {
                query.keyset = Some(KeysetLink {
                    keyset: keyset.clone(),
                    mode: self.mode,
                });
                query.offset = None;
            }
            None => {
                query.keyset = None;
                query.offset = (self.first_result > 0).then_some(self.first_result);
            }
        }
        query.limit = Some(self.max_results);

        if self.extracts_keysets() {
            if query.selection.is_empty() {
                for root in &query.roots {
                    if let Some(alias) = &root.alias {
                        query.selection.push(SelectItem::Expression {
                            expr: Expr::Path(PathReference::new(vec![alias.clone()])),
                            alias: None,
                        });
                    }
                }
            }
            let keys: Vec<SelectItem> = query
                .order_by
                .iter()
                .map(|o| SelectItem::Expression {
                    expr: o.expr.clone(),
                    alias: None,
                })
                .collect();
            query.selection.extend(keys);
        }
        query
    }

    /// `SELECT NEW` 查询不追加 keyset 列。
    fn extracts_keysets(&self) -> bool {
        !self.query.order_by.is_empty()
            && !self
                .query
                .selection
                .iter()
                .any(|s| matches!(s, SelectItem::Object { .. }))
    }

    /// 剥离每行末尾的 keyset 列，并据此生成本页的 [`KeysetPage`]。
    /// 向前翻页时数据库按反向排序返回，这里把行恢复成正向顺序。
    pub fn extract_keyset_page(&self, rows: Vec<Vec<SqlValue>>) -> Result<PagedRows, BuildError> {
        if !self.extracts_keysets() {
            return Ok(PagedRows {
                rows,
                page: KeysetPage::new(self.first_result, self.max_results, None, None),
            });
        }

        let width = self.query.order_by.len();
        let mut keysets = Vec::with_capacity(rows.len());
        let mut stripped = Vec::with_capacity(rows.len());
        for mut row in rows {
            if row.len() < width {
                return Err(BuildError::KeysetShapeMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            let keys = row.split_off(row.len() - width);
            keysets.push(Keyset::new(keys));
            stripped.push(row);
        }
        if self.mode == KeysetMode::Previous {
            stripped.reverse();
            keysets.reverse();
        }

        let page = KeysetPage::new(
            self.first_result,
            self.max_results,
            keysets.first().cloned(),
            keysets.last().cloned(),
        );
        let page = if self.extract_all_keysets {
            page.with_keysets(keysets)
        } else {
            page
        };
        Ok(PagedRows { rows: stripped, page })
    }
}

/// 默认选择列表要显式引用根别名，未命名的根在这里补上别名。
fn assign_root_aliases(query: &mut QueryModel) {
    for i in 0..query.roots.len() {
        if query.roots[i].alias.is_some() {
            continue;
        }
        let base = query.roots[i].entity.to_ascii_lowercase();
        let mut n = i;
        let mut alias = format!("{base}_page{n}");
        while query.has_alias(&alias) {
            n += 1;
            alias = format!("{base}_page{n}");
        }
        query.roots[i].alias = Some(alias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FromItem;
    use pretty_assertions::assert_eq;

    #[test]
    fn unaliased_roots_get_page_aliases() {
        let mut q = QueryModel::new();
        q.roots.push(FromItem {
            entity: "Document".to_string(),
            alias: None,
            joins: Vec::new(),
        });
        q.roots.push(FromItem {
            entity: "Person".to_string(),
            alias: Some("p".to_string()),
            joins: Vec::new(),
        });
        assign_root_aliases(&mut q);
        assert_eq!(q.roots[0].alias.as_deref(), Some("document_page0"));
        assert_eq!(q.roots[1].alias.as_deref(), Some("p"));
    }
}
