//! AND/OR 谓词分组。
//!
//! 分组只暴露与自身连接词匹配的结束方法（`end_and` / `end_or`），
//! 以及进入另一种分组的入口，因此不调用结束方法就无法回到父位置。

use crate::builder::{BuilderContext, PredicateReceiver};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::expr::{BooleanOperator, Expr};
use crate::macros::predicate_entry_methods;
use std::marker::PhantomData;
use std::rc::Rc;

pub trait Connective {
    const OPERATOR: BooleanOperator;
}

#[derive(Debug, Clone, Copy)]
pub struct And;

#[derive(Debug, Clone, Copy)]
pub struct Or;

impl Connective for And {
    const OPERATOR: BooleanOperator = BooleanOperator::And;
}

impl Connective for Or {
    const OPERATOR: BooleanOperator = BooleanOperator::Or;
}

/// 分组所属的子句；决定分组上的方法名。
pub trait ClauseMarker {
    const CLAUSE: ClauseType;
}

#[derive(Debug, Clone, Copy)]
pub struct WhereClause;

#[derive(Debug, Clone, Copy)]
pub struct HavingClause;

#[derive(Debug, Clone, Copy)]
pub struct OnClause;

#[derive(Debug, Clone, Copy)]
pub struct WhenClause;

impl ClauseMarker for WhereClause {
    const CLAUSE: ClauseType = ClauseType::Where;
}

impl ClauseMarker for HavingClause {
    const CLAUSE: ClauseType = ClauseType::Having;
}

impl ClauseMarker for OnClause {
    const CLAUSE: ClauseType = ClauseType::Join;
}

impl ClauseMarker for WhenClause {
    const CLAUSE: ClauseType = ClauseType::CaseWhen;
}

pub struct PredicateGroup<P, K, C> {
    parent: P,
    children: Vec<Expr>,
    negated: bool,
    _marker: PhantomData<(K, C)>,
}

impl<P: PredicateReceiver, K: Connective, C: ClauseMarker> PredicateGroup<P, K, C> {
    pub(crate) fn new(parent: P, negated: bool) -> Self {
        Self {
            parent,
            children: Vec::new(),
            negated,
            _marker: PhantomData,
        }
    }

    /// 追加一个已经构建好的谓词。
    pub fn predicate(mut self, predicate: Expr) -> Self {
        self.children.push(predicate);
        self
    }

    fn close(mut self) -> P {
        let group = Expr::Connective {
            op: K::OPERATOR,
            children: self.children,
        };
        let group = if self.negated { group.negated() } else { group };
        self.parent.add_predicate(C::CLAUSE, group);
        self.parent
    }
}

impl<P: PredicateReceiver, C: ClauseMarker> PredicateGroup<P, And, C> {
    /// 把收集到的谓词折叠成一个 AND 节点交给父位置。没有子谓词时渲染为恒真。
    pub fn end_and(self) -> P {
        self.close()
    }
}

impl<P: PredicateReceiver, C: ClauseMarker> PredicateGroup<P, Or, C> {
    /// 没有子谓词时渲染为恒假。
    pub fn end_or(self) -> P {
        self.close()
    }
}

impl<P: PredicateReceiver, K: Connective, C: ClauseMarker> BuilderContext
    for PredicateGroup<P, K, C>
{
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

impl<P: PredicateReceiver, K: Connective, C: ClauseMarker> PredicateReceiver
    for PredicateGroup<P, K, C>
{
    fn add_predicate(&mut self, _clause: ClauseType, predicate: Expr) {
        self.children.push(predicate);
    }
}

macro_rules! group_methods {
    (
        $marker:ty;
        start = $start:ident;
        start_expr = $start_expr:ident;
        and = $and:ident;
        or = $or:ident;
        not = $not:ident;
        exists = $exists:ident;
        not_exists = $not_exists:ident;
        case = $case:ident;
        subquery = $subquery:ident;
        subqueries = $subqueries:ident;
    ) => {
        impl<P: PredicateReceiver, K: Connective> PredicateGroup<P, K, $marker> {
            predicate_entry_methods! {
                pub clause = <$marker as ClauseMarker>::CLAUSE;
                marker = $marker;
                start = $start;
                start_expr = $start_expr;
                not = $not;
                exists = $exists;
                not_exists = $not_exists;
                case = $case;
                subquery = $subquery;
                subqueries = $subqueries;
            }
        }

        impl<P: PredicateReceiver> PredicateGroup<P, And, $marker> {
            pub fn $or(self) -> PredicateGroup<Self, Or, $marker> {
                PredicateGroup::new(self, false)
            }
        }

        impl<P: PredicateReceiver> PredicateGroup<P, Or, $marker> {
            pub fn $and(self) -> PredicateGroup<Self, And, $marker> {
                PredicateGroup::new(self, false)
            }
        }
    };
}

group_methods! {
    WhereClause;
    start = where_;
    start_expr = where_expr;
    and = where_and;
    or = where_or;
    not = where_not;
    exists = where_exists;
    not_exists = where_not_exists;
    case = where_case;
    subquery = where_subquery;
    subqueries = where_subqueries;
}

group_methods! {
    HavingClause;
    start = having;
    start_expr = having_expr;
    and = having_and;
    or = having_or;
    not = having_not;
    exists = having_exists;
    not_exists = having_not_exists;
    case = having_case;
    subquery = having_subquery;
    subqueries = having_subqueries;
}

group_methods! {
    OnClause;
    start = on;
    start_expr = on_expr;
    and = on_and;
    or = on_or;
    not = on_not;
    exists = on_exists;
    not_exists = on_not_exists;
    case = on_case;
    subquery = on_subquery;
    subqueries = on_subqueries;
}

group_methods! {
    WhenClause;
    start = when;
    start_expr = when_expr;
    and = when_and;
    or = when_or;
    not = when_not;
    exists = when_exists;
    not_exists = when_not_exists;
    case = when_case;
    subquery = when_subquery;
    subqueries = when_subqueries;
}
