//! 子查询位置。子查询在这里完整构建，`end()` 时交回父位置；
//! 渲染时才以占位别名的形式延迟展开。

use crate::builder::{
    BuilderContext, ExpressionReceiver, PredicateReceiver, QueryHolder, SubqueryReceiver,
    push_clause_predicate, require_name,
};
use crate::capability::{HasFrom, HasGroupBy, HasLimit, HasOrderBy, HasSelect, HasWhere};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::{Expr, NamedSubquery};
use crate::model::QueryModel;
use crate::slot::SubqueryPredicate;
use std::rc::Rc;

pub struct SubqueryBuilder<R> {
    parent: R,
    query: QueryModel,
}

impl<R: SubqueryReceiver> SubqueryBuilder<R> {
    pub(crate) fn new(parent: R) -> Self {
        Self {
            parent,
            query: QueryModel::new(),
        }
    }

    /// 结束子查询，回到父位置。
    pub fn end(self) -> R::Output {
        self.parent.receive_subquery(self.query)
    }
}

impl<R: SubqueryReceiver> BuilderContext for SubqueryBuilder<R> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<R: SubqueryReceiver> QueryHolder for SubqueryBuilder<R> {
    fn query(&self) -> &QueryModel {
        &self.query
    }

    fn query_mut(&mut self) -> &mut QueryModel {
        &mut self.query
    }
}

impl<R: SubqueryReceiver> PredicateReceiver for SubqueryBuilder<R> {
    fn add_predicate(&mut self, clause: ClauseType, predicate: Expr) {
        push_clause_predicate(&mut self.query, clause, predicate);
    }
}

impl<R: SubqueryReceiver> HasFrom for SubqueryBuilder<R> {}
impl<R: SubqueryReceiver> HasSelect for SubqueryBuilder<R> {}
impl<R: SubqueryReceiver> HasWhere for SubqueryBuilder<R> {}
impl<R: SubqueryReceiver> HasGroupBy for SubqueryBuilder<R> {}
impl<R: SubqueryReceiver> HasOrderBy for SubqueryBuilder<R> {}
impl<R: SubqueryReceiver> HasLimit for SubqueryBuilder<R> {}

pub(crate) fn exists_subquery<P: PredicateReceiver>(
    parent: P,
    clause: ClauseType,
    negated: bool,
) -> SubqueryBuilder<SubqueryPredicate<P>> {
    SubqueryBuilder::new(SubqueryPredicate::new(parent, clause, move |query| {
        Expr::Exists {
            subquery: Box::new(query),
            negated,
        }
    }))
}

/// 表达式模板中嵌入多个子查询别名，例如 `"a + b"` 再分别登记 `a`、`b`。
pub struct MultipleSubqueryBuilder<R> {
    parent: R,
    template: String,
    subqueries: Vec<NamedSubquery>,
}

impl<R: ExpressionReceiver> MultipleSubqueryBuilder<R> {
    pub(crate) fn new(parent: R, template: &str) -> Result<Self, BuildError> {
        let template = require_name(ClauseType::Select, "subquery template", template)?;
        Ok(Self {
            parent,
            template,
            subqueries: Vec::new(),
        })
    }

    /// 为模板中的 `alias` 登记一个子查询。别名必须出现在模板里且不能重复。
    pub fn with(self, alias: &str) -> Result<SubqueryBuilder<NamedSubquerySlot<R>>, BuildError> {
        let alias = require_name(ClauseType::Select, "subquery alias", alias)?;
        if self.subqueries.iter().any(|s| s.alias == alias) {
            return Err(BuildError::DuplicateSubqueryAlias { alias });
        }
        if find_alias(&self.template, &alias).is_none() {
            return Err(BuildError::UnknownSubqueryAlias {
                alias,
                template: self.template,
            });
        }
        Ok(SubqueryBuilder::new(NamedSubquerySlot {
            parent: self,
            alias,
        }))
    }

    /// 把模板与已登记的子查询折叠成一个表达式交给父位置。
    pub fn end(self) -> R::Output {
        let expr = Expr::Composite {
            template: self.template,
            subqueries: self.subqueries,
        };
        self.parent.receive(expr)
    }
}

impl<R: ExpressionReceiver> BuilderContext for MultipleSubqueryBuilder<R> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

pub struct NamedSubquerySlot<R> {
    parent: MultipleSubqueryBuilder<R>,
    alias: String,
}

impl<R: ExpressionReceiver> BuilderContext for NamedSubquerySlot<R> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<R: ExpressionReceiver> SubqueryReceiver for NamedSubquerySlot<R> {
    type Output = MultipleSubqueryBuilder<R>;

    fn receive_subquery(mut self, query: QueryModel) -> MultipleSubqueryBuilder<R> {
        self.parent.subqueries.push(NamedSubquery {
            alias: self.alias,
            query,
        });
        self.parent
    }
}

/// 在模板中按整词查找别名，返回字节位置。
pub(crate) fn find_alias(template: &str, alias: &str) -> Option<usize> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
    let mut from = 0;
    while let Some(pos) = template[from..].find(alias) {
        let start = from + pos;
        let end = start + alias.len();
        let before_ok = template[..start].chars().next_back().is_none_or(|c| !is_word(c));
        let after_ok = template[end..].chars().next().is_none_or(|c| !is_word(c));
        if before_ok && after_ok {
            return Some(start);
        }
        from = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::find_alias;

    #[test]
    fn find_alias_matches_whole_words_only() {
        assert_eq!(find_alias("a + b", "a"), Some(0));
        assert_eq!(find_alias("ab + a", "a"), Some(5));
        assert_eq!(find_alias("x.a + b", "a"), None);
        assert_eq!(find_alias("COALESCE(total, 0)", "total"), Some(9));
    }
}
