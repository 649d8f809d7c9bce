//! CASE 表达式。
//!
//! 起始位置只提供 `when*`；条件完成后只能 `then`；至少一个分支完成后才出现
//! `otherwise` / `end`。

use crate::builder::{BuilderContext, ExpressionReceiver, PredicateReceiver};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::{CaseBranch, Expr};
use crate::predicate_group::{And, Or, PredicateGroup, WhenClause};
use crate::restriction::RestrictionBuilder;
use crate::slot::SubqueryPredicate;
use crate::subquery::{SubqueryBuilder, exists_subquery};
use crate::value::SqlValue;
use std::rc::Rc;

struct CaseState<R> {
    parent: R,
    operand: Option<Expr>,
    branches: Vec<CaseBranch>,
}

impl<R: ExpressionReceiver> CaseState<R> {
    fn finish(self, otherwise: Option<Expr>) -> R::Output {
        let expr = Expr::CaseWhen {
            operand: self.operand.map(Box::new),
            branches: self.branches,
            otherwise: otherwise.map(Box::new),
        };
        self.parent.receive(expr)
    }

    fn condition(self) -> CaseWhenCondition<R> {
        CaseWhenCondition {
            state: self,
            condition: None,
        }
    }
}

macro_rules! searched_when_methods {
    () => {
        /// 以文本表达式开始一个 WHEN 条件。
        pub fn when(
            self,
            expression: &str,
        ) -> Result<RestrictionBuilder<CaseWhenCondition<R>>, BuildError> {
            let left = self.state.parent.parse_expression(ClauseType::CaseWhen, expression)?;
            Ok(RestrictionBuilder::new(self.state.condition(), ClauseType::CaseWhen, left))
        }

        pub fn when_expr(self, left: Expr) -> RestrictionBuilder<CaseWhenCondition<R>> {
            RestrictionBuilder::new(self.state.condition(), ClauseType::CaseWhen, left)
        }

        /// 直接使用一个已构建的条件。
        pub fn when_predicate(self, predicate: Expr) -> CaseWhenCondition<R> {
            let mut condition = self.state.condition();
            condition.add_predicate(ClauseType::CaseWhen, predicate);
            condition
        }

        pub fn when_and(self) -> PredicateGroup<CaseWhenCondition<R>, And, WhenClause> {
            PredicateGroup::new(self.state.condition(), false)
        }

        pub fn when_or(self) -> PredicateGroup<CaseWhenCondition<R>, Or, WhenClause> {
            PredicateGroup::new(self.state.condition(), false)
        }

        pub fn when_exists(self) -> SubqueryBuilder<SubqueryPredicate<CaseWhenCondition<R>>> {
            exists_subquery(self.state.condition(), ClauseType::CaseWhen, false)
        }

        pub fn when_not_exists(self) -> SubqueryBuilder<SubqueryPredicate<CaseWhenCondition<R>>> {
            exists_subquery(self.state.condition(), ClauseType::CaseWhen, true)
        }
    };
}

/// 搜索式 CASE 的起点，尚无分支；至少一个 WHEN 之后才能 `otherwise`/`end`：
///
/// ```
/// use halo_criteria::prelude::*;
/// # fn main() -> Result<(), halo_criteria::BuildError> {
/// let cb = CriteriaBuilder::new()
///     .from("Document", "d")?
///     .select_case(None)
///     .when("d.age")?
///     .lt(18)
///     .then("minor")
///     .end();
/// assert!(cb.render().is_ok());
/// # Ok(())
/// # }
/// ```
///
/// ```compile_fail
/// use halo_criteria::prelude::*;
/// # fn main() -> Result<(), halo_criteria::BuildError> {
/// let cb = CriteriaBuilder::new().from("Document", "d")?.select_case(None).otherwise("adult");
/// # Ok(())
/// # }
/// ```
pub struct CaseWhenStarter<R> {
    state: CaseState<R>,
}

impl<R: ExpressionReceiver> CaseWhenStarter<R> {
    pub(crate) fn new(parent: R) -> Self {
        Self {
            state: CaseState {
                parent,
                operand: None,
                branches: Vec::new(),
            },
        }
    }

    searched_when_methods!();
}

/// 条件已完成，等待 THEN 结果。
pub struct CaseWhenCondition<R> {
    state: CaseState<R>,
    condition: Option<Expr>,
}

impl<R: ExpressionReceiver> CaseWhenCondition<R> {
    pub fn then(self, result: impl Into<SqlValue>) -> CaseWhenReady<R> {
        self.then_expr(Expr::Literal(result.into()))
    }

    pub fn then_expression(self, result: &str) -> Result<CaseWhenReady<R>, BuildError> {
        let result = self.parse_expression(ClauseType::CaseWhen, result)?;
        Ok(self.then_expr(result))
    }

    pub fn then_expr(self, result: Expr) -> CaseWhenReady<R> {
        let mut state = self.state;
        state.branches.push(CaseBranch {
            condition: self.condition.unwrap_or_else(|| Expr::and(Vec::new())),
            result,
        });
        CaseWhenReady { state }
    }
}

impl<R: ExpressionReceiver> BuilderContext for CaseWhenCondition<R> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.state.parent.config()
    }
}

impl<R: ExpressionReceiver> PredicateReceiver for CaseWhenCondition<R> {
    fn add_predicate(&mut self, _clause: ClauseType, predicate: Expr) {
        self.condition = Some(match self.condition.take() {
            None => predicate,
            Some(existing) => Expr::and(vec![existing, predicate]),
        });
    }
}

/// 至少有一个分支。
pub struct CaseWhenReady<R> {
    state: CaseState<R>,
}

impl<R: ExpressionReceiver> CaseWhenReady<R> {
    searched_when_methods!();

    pub fn otherwise(self, result: impl Into<SqlValue>) -> R::Output {
        self.state.finish(Some(Expr::Literal(result.into())))
    }

    pub fn otherwise_expression(self, result: &str) -> Result<R::Output, BuildError> {
        let result = self.state.parent.parse_expression(ClauseType::CaseWhen, result)?;
        Ok(self.state.finish(Some(result)))
    }

    pub fn otherwise_expr(self, result: Expr) -> R::Output {
        self.state.finish(Some(result))
    }

    /// 不带 ELSE 结束。
    pub fn end(self) -> R::Output {
        self.state.finish(None)
    }
}

/// 简单 CASE：`CASE operand WHEN value THEN ...`。
pub struct SimpleCaseWhenStarter<R> {
    state: CaseState<R>,
}

macro_rules! simple_when_methods {
    () => {
        pub fn when(self, value: impl Into<SqlValue>) -> SimpleCaseWhenCondition<R> {
            SimpleCaseWhenCondition {
                state: self.state,
                value: Expr::Literal(value.into()),
            }
        }

        pub fn when_expression(self, value: &str) -> Result<SimpleCaseWhenCondition<R>, BuildError> {
            let value = self.state.parent.parse_expression(ClauseType::CaseWhen, value)?;
            Ok(SimpleCaseWhenCondition {
                state: self.state,
                value,
            })
        }
    };
}

impl<R: ExpressionReceiver> SimpleCaseWhenStarter<R> {
    pub(crate) fn new(parent: R, operand: Expr) -> Self {
        Self {
            state: CaseState {
                parent,
                operand: Some(operand),
                branches: Vec::new(),
            },
        }
    }

    simple_when_methods!();
}

pub struct SimpleCaseWhenCondition<R> {
    state: CaseState<R>,
    value: Expr,
}

impl<R: ExpressionReceiver> SimpleCaseWhenCondition<R> {
    pub fn then(self, result: impl Into<SqlValue>) -> SimpleCaseWhenReady<R> {
        self.then_expr(Expr::Literal(result.into()))
    }

    pub fn then_expression(self, result: &str) -> Result<SimpleCaseWhenReady<R>, BuildError> {
        let result = self.state.parent.parse_expression(ClauseType::CaseWhen, result)?;
        Ok(self.then_expr(result))
    }

    pub fn then_expr(self, result: Expr) -> SimpleCaseWhenReady<R> {
        let mut state = self.state;
        state.branches.push(CaseBranch {
            condition: self.value,
            result,
        });
        SimpleCaseWhenReady { state }
    }
}

pub struct SimpleCaseWhenReady<R> {
    state: CaseState<R>,
}

impl<R: ExpressionReceiver> SimpleCaseWhenReady<R> {
    simple_when_methods!();

    pub fn otherwise(self, result: impl Into<SqlValue>) -> R::Output {
        self.state.finish(Some(Expr::Literal(result.into())))
    }

    pub fn otherwise_expression(self, result: &str) -> Result<R::Output, BuildError> {
        let result = self.state.parent.parse_expression(ClauseType::CaseWhen, result)?;
        Ok(self.state.finish(Some(result)))
    }

    pub fn end(self) -> R::Output {
        self.state.finish(None)
    }
}
