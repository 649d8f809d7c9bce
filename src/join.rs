//! 带 ON 条件的 JOIN。ON 中的谓词按 AND 连接，`end()` 时挂到所属的根上。

use crate::builder::{BuilderContext, PredicateReceiver, QueryHolder};
use crate::capability::attach_join;
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::macros::predicate_entry_methods;
use crate::model::{JoinNode, JoinTarget, JoinType};
use crate::predicate_group::{OnClause, Or, PredicateGroup};
use std::rc::Rc;

pub struct JoinOnBuilder<P> {
    parent: P,
    node: JoinNode,
}

impl<P: QueryHolder> JoinOnBuilder<P> {
    pub(crate) fn new(parent: P, target: JoinTarget, alias: String, join_type: JoinType) -> Self {
        Self {
            parent,
            node: JoinNode {
                target,
                alias: Some(alias),
                join_type,
                fetch: false,
                default: false,
                on: Vec::new(),
            },
        }
    }

    predicate_entry_methods! {
        pub clause = ClauseType::Join;
        marker = OnClause;
        start = on;
        start_expr = on_expr;
        not = on_not;
        exists = on_exists;
        not_exists = on_not_exists;
        case = on_case;
        subquery = on_subquery;
        subqueries = on_subqueries;
    }

    pub fn on_or(self) -> PredicateGroup<Self, Or, OnClause> {
        PredicateGroup::new(self, false)
    }

    /// 把该 JOIN 标记为默认 JOIN。
    pub fn as_default(mut self) -> Self {
        self.node.default = true;
        self
    }

    pub fn end(mut self) -> Result<P, BuildError> {
        attach_join(self.parent.query_mut(), self.node)?;
        Ok(self.parent)
    }
}

impl<P: QueryHolder> BuilderContext for JoinOnBuilder<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: QueryHolder> PredicateReceiver for JoinOnBuilder<P> {
    fn add_predicate(&mut self, _clause: ClauseType, predicate: Expr) {
        self.node.on.push(predicate);
    }
}
