//! builder 状态机的基础 trait。
//!
//! 每个语法位置是一个独立类型，转移全部通过按值消费 `self` 的方法完成；
//! 嵌套位置以父 builder 为泛型参数 `P`，结束时把表达式交还给父级。

use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::model::QueryModel;
use std::rc::Rc;

/// 所有 builder 共享同一份配置（方言、表达式解析器等）。
pub trait BuilderContext {
    fn config(&self) -> &Rc<QueryConfig>;

    /// 用配置中的解析器解析调用方文本；空文本是构建错误。
    fn parse_expression(&self, clause: ClauseType, text: &str) -> Result<Expr, BuildError> {
        parse_with(self.config(), clause, text)
    }
}

pub(crate) fn parse_with(
    config: &QueryConfig,
    clause: ClauseType,
    text: &str,
) -> Result<Expr, BuildError> {
    if text.trim().is_empty() {
        return Err(BuildError::empty(clause, "expression"));
    }
    config.parser.parse(text).map_err(|source| BuildError::Parse {
        clause,
        expression: text.to_string(),
        source,
    })
}

pub(crate) fn require_name(clause: ClauseType, argument: &'static str, value: &str) -> Result<String, BuildError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BuildError::empty(clause, argument));
    }
    Ok(value.to_string())
}

/// 持有一个正在构建的查询模型。能力 trait 都建立在它之上。
pub trait QueryHolder: BuilderContext + Sized {
    fn query(&self) -> &QueryModel;
    fn query_mut(&mut self) -> &mut QueryModel;
}

/// 能接收一个已完成谓词的位置：WHERE/HAVING、ON、谓词分组、CASE WHEN 条件。
pub trait PredicateReceiver: BuilderContext + Sized {
    fn add_predicate(&mut self, clause: ClauseType, predicate: Expr);
}

/// 能接收一个表达式并转到下一个状态的位置（CASE 结果、多子查询模板等）。
pub trait ExpressionReceiver: BuilderContext + Sized {
    type Output;
    fn receive(self, expr: Expr) -> Self::Output;
}

/// 能接收一个已完成子查询的位置。
pub trait SubqueryReceiver: BuilderContext + Sized {
    type Output;
    fn receive_subquery(self, query: QueryModel) -> Self::Output;
}

/// 把 WHERE/HAVING 谓词追加到查询模型对应的子句。
pub(crate) fn push_clause_predicate(query: &mut QueryModel, clause: ClauseType, predicate: Expr) {
    match clause {
        ClauseType::Having => query.having.push(predicate),
        _ => query.where_clause.push(predicate),
    }
}
