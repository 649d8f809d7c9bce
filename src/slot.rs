//! 表达式“空位”：子查询或 CASE 完成后，把结果交回父位置并给出下一个状态。

use crate::builder::{
    BuilderContext, ExpressionReceiver, PredicateReceiver, QueryHolder, SubqueryReceiver,
};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::expr::Expr;
use crate::model::{QueryModel, SelectItem};
use crate::restriction::RestrictionBuilder;
use std::rc::Rc;

/// 谓词右侧的子查询空位：子查询结束后拼出完整谓词并交给父位置。
pub struct SubqueryPredicate<P> {
    parent: P,
    clause: ClauseType,
    build: Box<dyn FnOnce(QueryModel) -> Expr>,
}

impl<P: PredicateReceiver> SubqueryPredicate<P> {
    pub(crate) fn new(
        parent: P,
        clause: ClauseType,
        build: impl FnOnce(QueryModel) -> Expr + 'static,
    ) -> Self {
        Self {
            parent,
            clause,
            build: Box::new(build),
        }
    }
}

impl<P: PredicateReceiver> BuilderContext for SubqueryPredicate<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: PredicateReceiver> SubqueryReceiver for SubqueryPredicate<P> {
    type Output = P;

    fn receive_subquery(mut self, query: QueryModel) -> P {
        let predicate = (self.build)(query);
        self.parent.add_predicate(self.clause, predicate);
        self.parent
    }
}

/// 谓词右侧的表达式空位（多子查询模板）。
pub struct ExpressionPredicate<P> {
    parent: P,
    clause: ClauseType,
    build: Box<dyn FnOnce(Expr) -> Expr>,
}

impl<P: PredicateReceiver> ExpressionPredicate<P> {
    pub(crate) fn new(
        parent: P,
        clause: ClauseType,
        build: impl FnOnce(Expr) -> Expr + 'static,
    ) -> Self {
        Self {
            parent,
            clause,
            build: Box::new(build),
        }
    }
}

impl<P: PredicateReceiver> BuilderContext for ExpressionPredicate<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: PredicateReceiver> ExpressionReceiver for ExpressionPredicate<P> {
    type Output = P;

    fn receive(mut self, expr: Expr) -> P {
        let predicate = (self.build)(expr);
        self.parent.add_predicate(self.clause, predicate);
        self.parent
    }
}

/// 谓词左侧空位：CASE 或子查询完成后进入比较位置。
pub struct LeftHandSlot<P> {
    parent: P,
    clause: ClauseType,
}

impl<P: PredicateReceiver> LeftHandSlot<P> {
    pub(crate) fn new(parent: P, clause: ClauseType) -> Self {
        Self { parent, clause }
    }
}

impl<P: PredicateReceiver> BuilderContext for LeftHandSlot<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: PredicateReceiver> ExpressionReceiver for LeftHandSlot<P> {
    type Output = RestrictionBuilder<P>;

    fn receive(self, expr: Expr) -> RestrictionBuilder<P> {
        RestrictionBuilder::new(self.parent, self.clause, expr)
    }
}

impl<P: PredicateReceiver> SubqueryReceiver for LeftHandSlot<P> {
    type Output = RestrictionBuilder<P>;

    fn receive_subquery(self, query: QueryModel) -> RestrictionBuilder<P> {
        self.receive(Expr::Subquery(Box::new(query)))
    }
}

/// SELECT 列表空位。
pub struct SelectSlot<P> {
    parent: P,
    alias: Option<String>,
}

impl<P: QueryHolder> SelectSlot<P> {
    pub(crate) fn new(parent: P, alias: Option<String>) -> Self {
        Self { parent, alias }
    }
}

impl<P: QueryHolder> BuilderContext for SelectSlot<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: QueryHolder> ExpressionReceiver for SelectSlot<P> {
    type Output = P;

    fn receive(mut self, expr: Expr) -> P {
        self.parent.query_mut().selection.push(SelectItem::Expression {
            expr,
            alias: self.alias,
        });
        self.parent
    }
}

impl<P: QueryHolder> SubqueryReceiver for SelectSlot<P> {
    type Output = P;

    fn receive_subquery(self, query: QueryModel) -> P {
        self.receive(Expr::Subquery(Box::new(query)))
    }
}
