//! 谓词左侧位置：比较、BETWEEN、IN、LIKE、NULL/EMPTY/MEMBER OF 检查。
//!
//! 每个终结方法把完整谓词交给父位置并返回父 builder；BETWEEN 与 LIKE 会先进入
//! 只提供下一步必需操作的子 builder。

use crate::builder::PredicateReceiver;
use crate::clause::ClauseType;
use crate::error::BuildError;
use crate::expr::{ComparisonOperator, Expr, InValues, Quantifier};
use crate::model::QueryModel;
use crate::slot::{ExpressionPredicate, SubqueryPredicate};
use crate::subquery::{MultipleSubqueryBuilder, SubqueryBuilder};
use crate::value::SqlValue;

pub struct RestrictionBuilder<P> {
    parent: P,
    clause: ClauseType,
    left: Expr,
}

macro_rules! comparison_methods {
    ($($op:ident => $value:ident, $expression:ident, $expr:ident, $subquery:ident, $all:ident, $any:ident, $subqueries:ident;)*) => {
        $(
            pub fn $value(self, value: impl Into<SqlValue>) -> P {
                let right = Expr::Literal(value.into());
                self.compare(ComparisonOperator::$op, right)
            }

            pub fn $expression(self, expression: &str) -> Result<P, BuildError> {
                let right = self.parent.parse_expression(self.clause, expression)?;
                Ok(self.compare(ComparisonOperator::$op, right))
            }

            pub fn $expr(self, right: Expr) -> P {
                self.compare(ComparisonOperator::$op, right)
            }

            pub fn $subquery(self) -> SubqueryBuilder<SubqueryPredicate<P>> {
                self.compare_subquery(ComparisonOperator::$op, None)
            }

            pub fn $all(self) -> SubqueryBuilder<SubqueryPredicate<P>> {
                self.compare_subquery(ComparisonOperator::$op, Some(Quantifier::All))
            }

            pub fn $any(self) -> SubqueryBuilder<SubqueryPredicate<P>> {
                self.compare_subquery(ComparisonOperator::$op, Some(Quantifier::Any))
            }

            pub fn $subqueries(
                self,
                template: &str,
            ) -> Result<MultipleSubqueryBuilder<ExpressionPredicate<P>>, BuildError> {
                let Self { parent, clause, left } = self;
                let slot = ExpressionPredicate::new(parent, clause, move |right| {
                    Expr::compare(ComparisonOperator::$op, left, right)
                });
                MultipleSubqueryBuilder::new(slot, template)
            }
        )*
    };
}

impl<P: PredicateReceiver> RestrictionBuilder<P> {
    pub(crate) fn new(parent: P, clause: ClauseType, left: Expr) -> Self {
        Self {
            parent,
            clause,
            left,
        }
    }

    fn finish(mut self, predicate: Expr) -> P {
        self.parent.add_predicate(self.clause, predicate);
        self.parent
    }

    fn compare(self, op: ComparisonOperator, right: Expr) -> P {
        let predicate = Expr::compare(op, self.left.clone(), right);
        self.finish(predicate)
    }

    fn compare_subquery(
        self,
        op: ComparisonOperator,
        quantifier: Option<Quantifier>,
    ) -> SubqueryBuilder<SubqueryPredicate<P>> {
        let Self {
            parent,
            clause,
            left,
        } = self;
        SubqueryBuilder::new(SubqueryPredicate::new(parent, clause, move |query| {
            Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(Expr::Subquery(Box::new(query))),
                quantifier,
            }
        }))
    }

    comparison_methods! {
        Eq => eq, eq_expression, eq_expr, eq_subquery, eq_all, eq_any, eq_subqueries;
        NotEq => not_eq, not_eq_expression, not_eq_expr, not_eq_subquery, not_eq_all, not_eq_any, not_eq_subqueries;
        Gt => gt, gt_expression, gt_expr, gt_subquery, gt_all, gt_any, gt_subqueries;
        Ge => ge, ge_expression, ge_expr, ge_subquery, ge_all, ge_any, ge_subqueries;
        Lt => lt, lt_expression, lt_expr, lt_subquery, lt_all, lt_any, lt_subqueries;
        Le => le, le_expression, le_expr, le_subquery, le_all, le_any, le_subqueries;
    }

    /// `BETWEEN lower AND ...`：必须再提供上界才能回到父位置。
    pub fn between(self, lower: impl Into<SqlValue>) -> BetweenBuilder<P> {
        BetweenBuilder::new(self, Expr::Literal(lower.into()), false)
    }

    pub fn between_expression(self, lower: &str) -> Result<BetweenBuilder<P>, BuildError> {
        let lower = self.parent.parse_expression(self.clause, lower)?;
        Ok(BetweenBuilder::new(self, lower, false))
    }

    pub fn not_between(self, lower: impl Into<SqlValue>) -> BetweenBuilder<P> {
        BetweenBuilder::new(self, Expr::Literal(lower.into()), true)
    }

    pub fn not_between_expression(self, lower: &str) -> Result<BetweenBuilder<P>, BuildError> {
        let lower = self.parent.parse_expression(self.clause, lower)?;
        Ok(BetweenBuilder::new(self, lower, true))
    }

    /// `IN (...)`。空列表渲染为恒假谓词。
    pub fn in_<V: Into<SqlValue>>(self, values: impl IntoIterator<Item = V>) -> P {
        self.in_list(values, false)
    }

    /// `NOT IN (...)`。空列表渲染为恒真谓词。
    pub fn not_in<V: Into<SqlValue>>(self, values: impl IntoIterator<Item = V>) -> P {
        self.in_list(values, true)
    }

    pub fn in_expressions(self, expressions: &[&str]) -> Result<P, BuildError> {
        self.in_parsed(expressions, false)
    }

    pub fn not_in_expressions(self, expressions: &[&str]) -> Result<P, BuildError> {
        self.in_parsed(expressions, true)
    }

    pub fn in_subquery(self) -> SubqueryBuilder<SubqueryPredicate<P>> {
        self.in_query(false)
    }

    pub fn not_in_subquery(self) -> SubqueryBuilder<SubqueryPredicate<P>> {
        self.in_query(true)
    }

    fn in_list<V: Into<SqlValue>>(self, values: impl IntoIterator<Item = V>, negated: bool) -> P {
        let values = values.into_iter().map(|v| Expr::Literal(v.into())).collect();
        let predicate = Expr::In {
            expr: Box::new(self.left.clone()),
            values: InValues::List(values),
            negated,
        };
        self.finish(predicate)
    }

    fn in_parsed(self, expressions: &[&str], negated: bool) -> Result<P, BuildError> {
        let values = expressions
            .iter()
            .map(|e| self.parent.parse_expression(self.clause, e))
            .collect::<Result<Vec<_>, _>>()?;
        let predicate = Expr::In {
            expr: Box::new(self.left.clone()),
            values: InValues::List(values),
            negated,
        };
        Ok(self.finish(predicate))
    }

    fn in_query(self, negated: bool) -> SubqueryBuilder<SubqueryPredicate<P>> {
        let Self {
            parent,
            clause,
            left,
        } = self;
        SubqueryBuilder::new(SubqueryPredicate::new(parent, clause, move |query: QueryModel| {
            Expr::In {
                expr: Box::new(left),
                values: InValues::Subquery(Box::new(query)),
                negated,
            }
        }))
    }

    pub fn is_null(self) -> P {
        let predicate = Expr::is_null_check(self.left.clone(), false);
        self.finish(predicate)
    }

    pub fn is_not_null(self) -> P {
        let predicate = Expr::is_null_check(self.left.clone(), true);
        self.finish(predicate)
    }

    pub fn is_empty(self) -> P {
        self.empty_check(false)
    }

    pub fn is_not_empty(self) -> P {
        self.empty_check(true)
    }

    fn empty_check(self, negated: bool) -> P {
        let predicate = Expr::EmptyCheck {
            expr: Box::new(self.left.clone()),
            negated,
        };
        self.finish(predicate)
    }

    pub fn is_member_of(self, collection: &str) -> Result<P, BuildError> {
        self.member_of(collection, false)
    }

    pub fn is_not_member_of(self, collection: &str) -> Result<P, BuildError> {
        self.member_of(collection, true)
    }

    fn member_of(self, collection: &str, negated: bool) -> Result<P, BuildError> {
        let collection = self.parent.parse_expression(self.clause, collection)?;
        let predicate = Expr::MemberOf {
            expr: Box::new(self.left.clone()),
            collection: Box::new(collection),
            negated,
        };
        Ok(self.finish(predicate))
    }

    pub fn like(self) -> LikeBuilder<P> {
        LikeBuilder::new(self, true, false)
    }

    pub fn not_like(self) -> LikeBuilder<P> {
        LikeBuilder::new(self, true, true)
    }

    /// 大小写不敏感匹配，两侧都按大写比较。
    pub fn like_case_insensitive(self) -> LikeBuilder<P> {
        LikeBuilder::new(self, false, false)
    }

    pub fn not_like_case_insensitive(self) -> LikeBuilder<P> {
        LikeBuilder::new(self, false, true)
    }
}

/// 已有下界，等待上界。只有 `and*` 可用：
///
/// ```
/// use halo_criteria::prelude::*;
/// # fn main() -> Result<(), halo_criteria::BuildError> {
/// let cb = CriteriaBuilder::new().from("Document", "d")?.where_("d.age")?.between(1).and(9);
/// assert!(cb.render().is_ok());
/// # Ok(())
/// # }
/// ```
///
/// ```compile_fail
/// use halo_criteria::prelude::*;
/// # fn main() -> Result<(), halo_criteria::BuildError> {
/// let cb = CriteriaBuilder::new().from("Document", "d")?.where_("d.age")?.between(1).eq(9);
/// # Ok(())
/// # }
/// ```
pub struct BetweenBuilder<P> {
    restriction: RestrictionBuilder<P>,
    lower: Expr,
    negated: bool,
}

impl<P: PredicateReceiver> BetweenBuilder<P> {
    fn new(restriction: RestrictionBuilder<P>, lower: Expr, negated: bool) -> Self {
        Self {
            restriction,
            lower,
            negated,
        }
    }

    pub fn and(self, upper: impl Into<SqlValue>) -> P {
        self.and_expr(Expr::Literal(upper.into()))
    }

    pub fn and_expression(self, upper: &str) -> Result<P, BuildError> {
        let upper = self
            .restriction
            .parent
            .parse_expression(self.restriction.clause, upper)?;
        Ok(self.and_expr(upper))
    }

    pub fn and_expr(self, upper: Expr) -> P {
        let predicate = Expr::Between {
            expr: Box::new(self.restriction.left.clone()),
            lower: Box::new(self.lower),
            upper: Box::new(upper),
            negated: self.negated,
        };
        self.restriction.finish(predicate)
    }
}

/// 等待 LIKE 模式。
pub struct LikeBuilder<P> {
    restriction: RestrictionBuilder<P>,
    case_sensitive: bool,
    negated: bool,
}

impl<P: PredicateReceiver> LikeBuilder<P> {
    fn new(restriction: RestrictionBuilder<P>, case_sensitive: bool, negated: bool) -> Self {
        Self {
            restriction,
            case_sensitive,
            negated,
        }
    }

    /// 模式作为参数绑定。
    pub fn value(self, pattern: impl Into<String>) -> EscapeBuilder<P> {
        let pattern = Expr::Literal(SqlValue::from(pattern.into()));
        EscapeBuilder { like: self, pattern }
    }

    pub fn expression(self, pattern: &str) -> Result<EscapeBuilder<P>, BuildError> {
        let pattern = self
            .restriction
            .parent
            .parse_expression(self.restriction.clause, pattern)?;
        Ok(EscapeBuilder { like: self, pattern })
    }
}

/// 已有模式，决定是否带 ESCAPE 字符。
pub struct EscapeBuilder<P> {
    like: LikeBuilder<P>,
    pattern: Expr,
}

impl<P: PredicateReceiver> EscapeBuilder<P> {
    pub fn escape(self, escape: char) -> P {
        self.finish(Some(escape))
    }

    pub fn no_escape(self) -> P {
        self.finish(None)
    }

    fn finish(self, escape: Option<char>) -> P {
        let LikeBuilder {
            restriction,
            case_sensitive,
            negated,
        } = self.like;
        let predicate = Expr::Like {
            expr: Box::new(restriction.left.clone()),
            pattern: Box::new(self.pattern),
            escape,
            case_sensitive,
            negated,
        };
        restriction.finish(predicate)
    }
}
