//! Keyset 分页编解码。
//!
//! [`Keyset`] 是一行在 ORDER BY 各表达式上的取值；[`KeysetPage`] 记录一页的偏移、
//! 页大小以及首尾两行的 keyset，可序列化后作为分页令牌保存。

use crate::args::ParameterRegistry;
use crate::builder::{BuilderContext, QueryHolder};
use crate::capability::HasOrderBy;
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::{ComparisonOperator, Expr};
use crate::model::OrderByItem;
use crate::value::SqlValue;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub(crate) const KEYSET_PARAMETER_PREFIX: &str = "keyset";

/// 与 ORDER BY 表达式一一对应的取值元组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyset(Vec<SqlValue>);

impl Keyset {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.0
    }
}

impl From<Vec<SqlValue>> for Keyset {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeysetMode {
    /// 不使用 keyset，按偏移分页。
    None,
    /// 重新读取同一页：从最低 keyset 开始（含）。
    Same,
    /// 下一页：严格在最高 keyset 之后。
    Next,
    /// 上一页：严格在最低 keyset 之前，按反向排序读取。
    Previous,
}

/// 查询上附加的 keyset 限制。
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetLink {
    pub keyset: Keyset,
    pub mode: KeysetMode,
}

/// 一页结果的 keyset 引用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysetPage {
    pub first_result: u64,
    pub max_results: u64,
    #[serde(rename = "lowestTuple")]
    pub lowest: Option<Keyset>,
    #[serde(rename = "highestTuple")]
    pub highest: Option<Keyset>,
    #[serde(rename = "allTuples", default)]
    pub keysets: Vec<Keyset>,
}

impl KeysetPage {
    pub fn new(
        first_result: u64,
        max_results: u64,
        lowest: Option<Keyset>,
        highest: Option<Keyset>,
    ) -> Self {
        Self {
            first_result,
            max_results,
            lowest,
            highest,
            keysets: Vec::new(),
        }
    }

    pub fn with_keysets(mut self, keysets: Vec<Keyset>) -> Self {
        self.keysets = keysets;
        self
    }

    /// 判断这个引用能否用于请求 `(first_result, max_results)`：
    /// 元组形状与当前 ORDER BY 一致、页大小相同、偏移差为 0 或恰好一页。
    pub fn keyset_mode(&self, first_result: u64, max_results: u64, order_by_len: usize) -> KeysetMode {
        self.decide(first_result, max_results, order_by_len).0
    }

    pub(crate) fn decide(
        &self,
        first_result: u64,
        max_results: u64,
        order_by_len: usize,
    ) -> (KeysetMode, &'static str) {
        if order_by_len == 0 {
            return (KeysetMode::None, "query has no ORDER BY");
        }
        let shape_ok = |k: &Option<Keyset>| k.as_ref().is_none_or(|k| k.len() == order_by_len);
        if !shape_ok(&self.lowest) || !shape_ok(&self.highest) {
            return (KeysetMode::None, "keyset shape differs from ORDER BY");
        }
        if max_results != self.max_results {
            return (KeysetMode::None, "page size changed");
        }

        let delta = i128::from(first_result) - i128::from(self.first_result);
        let page = i128::from(max_results);
        if delta == 0 && self.lowest.is_some() {
            (KeysetMode::Same, "same page")
        } else if delta == page && self.highest.is_some() {
            (KeysetMode::Next, "next page")
        } else if delta == -page && self.lowest.is_some() {
            (KeysetMode::Previous, "previous page")
        } else {
            (KeysetMode::None, "offset is not adjacent to the keyset page")
        }
    }

    /// 给定模式下作为参照的 keyset。
    pub(crate) fn reference(&self, mode: KeysetMode) -> Option<&Keyset> {
        match mode {
            KeysetMode::Same | KeysetMode::Previous => self.lowest.as_ref(),
            KeysetMode::Next => self.highest.as_ref(),
            KeysetMode::None => None,
        }
    }
}

/// 位置式 keyset 限制。
pub trait HasKeyset: HasOrderBy {
    /// 只取严格排在 `keyset` 之后的行。
    fn after_keyset(self, keyset: impl Into<Keyset>) -> Result<Self, BuildError> {
        set_keyset(self, keyset.into(), KeysetMode::Next)
    }

    /// 只取严格排在 `keyset` 之前的行；渲染时 ORDER BY 反向，调用方需要反转结果。
    fn before_keyset(self, keyset: impl Into<Keyset>) -> Result<Self, BuildError> {
        set_keyset(self, keyset.into(), KeysetMode::Previous)
    }

    /// 按 ORDER BY 表达式逐个给值。
    fn after_keyset_builder(self) -> KeysetBuilder<Self> {
        KeysetBuilder::new(self, KeysetMode::Next)
    }

    fn before_keyset_builder(self) -> KeysetBuilder<Self> {
        KeysetBuilder::new(self, KeysetMode::Previous)
    }
}

fn set_keyset<T: QueryHolder>(mut holder: T, keyset: Keyset, mode: KeysetMode) -> Result<T, BuildError> {
    let expected = holder.query().order_by.len();
    if keyset.len() != expected {
        return Err(BuildError::KeysetShapeMismatch {
            expected,
            actual: keyset.len(),
        });
    }
    holder.query_mut().keyset = Some(KeysetLink { keyset, mode });
    Ok(holder)
}

pub struct KeysetBuilder<P> {
    parent: P,
    mode: KeysetMode,
    values: Vec<(usize, SqlValue)>,
}

impl<P: QueryHolder> KeysetBuilder<P> {
    fn new(parent: P, mode: KeysetMode) -> Self {
        Self {
            parent,
            mode,
            values: Vec::new(),
        }
    }

    /// `expression` 必须与某个 ORDER BY 表达式结构相同。
    pub fn with(mut self, expression: &str, value: impl Into<SqlValue>) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::Keyset, expression)?;
        let position = self
            .parent
            .query()
            .order_by
            .iter()
            .position(|o| o.expr == expr)
            .ok_or_else(|| BuildError::UnknownKeysetExpression {
                expression: expression.to_string(),
            })?;
        if self.values.iter().any(|(p, _)| *p == position) {
            return Err(BuildError::DuplicateKeysetExpression {
                expression: expression.to_string(),
            });
        }
        self.values.push((position, value.into()));
        Ok(self)
    }

    /// 所有 ORDER BY 表达式都必须有值。
    pub fn end(mut self) -> Result<P, BuildError> {
        let expected = self.parent.query().order_by.len();
        if self.values.len() != expected {
            return Err(BuildError::KeysetShapeMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        self.values.sort_by_key(|(p, _)| *p);
        let keyset = Keyset::new(self.values.into_iter().map(|(_, v)| v).collect());
        set_keyset(self.parent, keyset, self.mode)
    }
}

impl<P: QueryHolder> BuilderContext for KeysetBuilder<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

/// 构造 keyset 谓词。值登记为 `keyset_N` 参数；NULL 值改写为 IS [NOT] NULL 检查。
///
/// 展开形式：`a > :k0 OR (a = :k0 AND (b > :k1 OR ...))`；
/// 优化形式：`a >= :k0 AND (a > :k0 OR (b >= :k1 AND ...))`。
/// `Same` 模式在最后一层包含相等，`Previous` 模式按反向排序比较。
pub(crate) fn keyset_predicate(
    order_by: &[OrderByItem],
    link: &KeysetLink,
    optimized: bool,
    params: &mut ParameterRegistry,
) -> Option<Expr> {
    if link.mode == KeysetMode::None || order_by.is_empty() {
        return None;
    }
    let levels: Vec<Level> = order_by
        .iter()
        .zip(link.keyset.values())
        .map(|(item, value)| {
            let item = if link.mode == KeysetMode::Previous {
                item.inverted()
            } else {
                item.clone()
            };
            Level::new(&item, value, params)
        })
        .collect();

    let inclusive = link.mode == KeysetMode::Same;
    let mut predicate: Option<Expr> = None;
    for (i, level) in levels.into_iter().enumerate().rev() {
        predicate = Some(match predicate {
            None if inclusive => or_of(level.after, Some(level.eq)),
            None => level.after.unwrap_or_else(|| Expr::or(Vec::new())),
            Some(inner) => match (optimized, level.at_least) {
                (true, Some(at_least)) => Expr::and(vec![at_least, or_of(level.after, Some(inner))]),
                _ => or_of(level.after, Some(Expr::and(vec![level.eq, inner]))),
            },
        });
        tracing::trace!(level = i, "built keyset level");
    }
    predicate
}

fn or_of(left: Option<Expr>, right: Option<Expr>) -> Expr {
    match (left, right) {
        (Some(l), Some(r)) => Expr::or(vec![l, r]),
        (Some(e), None) | (None, Some(e)) => e,
        (None, None) => Expr::or(Vec::new()),
    }
}

/// 一个 ORDER BY 表达式上的三种比较。`after` 为 `None` 表示恒假。
struct Level {
    after: Option<Expr>,
    eq: Expr,
    at_least: Option<Expr>,
}

impl Level {
    fn new(item: &OrderByItem, value: &SqlValue, params: &mut ParameterRegistry) -> Self {
        let e = item.expr.clone();
        if value.is_null() {
            // NULL 彼此相等；NULLS FIRST 时所有非 NULL 行都在之后
            let after = item
                .nulls_first
                .then(|| Expr::is_null_check(e.clone(), true));
            return Self {
                after,
                eq: Expr::is_null_check(e, false),
                at_least: None,
            };
        }

        let token = params.add_prefixed(KEYSET_PARAMETER_PREFIX, value.clone());
        let k = Expr::Parameter(token.trim_start_matches(':').to_string());
        let (strict, loose) = if item.ascending {
            (ComparisonOperator::Gt, ComparisonOperator::Ge)
        } else {
            (ComparisonOperator::Lt, ComparisonOperator::Le)
        };
        let with_nulls = |cmp: Expr| {
            if item.nulls_first {
                cmp
            } else {
                Expr::or(vec![cmp, Expr::is_null_check(e.clone(), false)])
            }
        };
        Self {
            after: Some(with_nulls(Expr::compare(strict, e.clone(), k.clone()))),
            eq: Expr::compare(ComparisonOperator::Eq, e.clone(), k.clone()),
            at_least: Some(with_nulls(Expr::compare(loose, e.clone(), k))),
        }
    }
}
