//! 查询模型：builder 在 end/finish 时把表达式树交给这里，之后只读。

use crate::expr::{Expr, PathReference};
use crate::keyset::KeysetLink;
use crate::value::{ParameterType, SqlValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

/// JOIN 的目标：沿关联路径（`d.owner`）或另一个实体（`Person`）。
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Path(PathReference),
    Entity(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub target: JoinTarget,
    /// `None` 时渲染期由别名分配器生成。
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub fetch: bool,
    /// 默认 JOIN：之后以同一路径开头的引用会被替换为该 JOIN 的别名。
    pub default: bool,
    pub on: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub entity: String,
    pub alias: Option<String>,
    pub joins: Vec<JoinNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expression { expr: Expr, alias: Option<String> },
    /// `SELECT NEW constructor(args...)`，不能与普通选择项混用。
    Object { constructor: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl OrderByItem {
    pub(crate) fn inverted(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            ascending: !self.ascending,
            nulls_first: !self.nulls_first,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::IntersectAll => "INTERSECT ALL",
            Self::Except => "EXCEPT",
            Self::ExceptAll => "EXCEPT ALL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CteBody {
    Query(Box<QueryModel>),
    /// 递归 CTE：非递归分支、连接关键字、递归分支。
    Recursive {
        base: Box<QueryModel>,
        connector: SetOperator,
        recursive: Box<QueryModel>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub inlined: bool,
    pub body: CteBody,
}

impl CteDefinition {
    pub fn is_recursive(&self) -> bool {
        matches!(self.body, CteBody::Recursive { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMode {
    Rows,
    Range,
    Groups,
}

impl FrameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "ROWS",
            Self::Range => "RANGE",
            Self::Groups => "GROUPS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Expr),
    CurrentRow,
    Following(Expr),
    UnboundedFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameExclusion {
    NoOthers,
    CurrentRow,
    Group,
    Ties,
}

impl FrameExclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoOthers => "EXCLUDE NO OTHERS",
            Self::CurrentRow => "EXCLUDE CURRENT ROW",
            Self::Group => "EXCLUDE GROUP",
            Self::Ties => "EXCLUDE TIES",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub mode: FrameMode,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
    pub exclusion: Option<FrameExclusion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowDefinition {
    pub name: String,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub frame: Option<WindowFrame>,
}

/// 一个 SELECT 或一棵集合运算树。
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    Select(Box<QueryModel>),
    Set(Box<SetOperation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    /// 顶层集合运算的 WITH 列表。
    pub ctes: Vec<CteDefinition>,
    pub first: QueryExpression,
    pub rest: Vec<(SetOperator, QueryExpression)>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SetOperation {
    pub(crate) fn new(first: QueryExpression) -> Self {
        Self {
            ctes: Vec::new(),
            first,
            rest: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryModel {
    pub ctes: Vec<CteDefinition>,
    pub distinct: bool,
    pub selection: Vec<SelectItem>,
    pub roots: Vec<FromItem>,
    /// 顶层 WHERE 谓词，按隐式 AND 连接。
    pub where_clause: Vec<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Vec<Expr>,
    pub windows: Vec<WindowDefinition>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub keyset: Option<KeysetLink>,
    pub parameter_values: BTreeMap<String, SqlValue>,
    pub parameter_types: BTreeMap<String, ParameterType>,
}

impl QueryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 顶层 WHERE 合成一个节点；没有谓词时为 `None`。
    pub fn where_predicate(&self) -> Option<Expr> {
        fold_conjuncts(&self.where_clause)
    }

    pub fn having_predicate(&self) -> Option<Expr> {
        fold_conjuncts(&self.having)
    }

    pub fn find_cte(&self, name: &str) -> Option<&CteDefinition> {
        self.ctes.iter().find(|c| c.name == name)
    }

    pub(crate) fn has_alias(&self, alias: &str) -> bool {
        self.roots.iter().any(|r| {
            r.alias.as_deref() == Some(alias)
                || r.joins.iter().any(|j| j.alias.as_deref() == Some(alias))
        })
    }

    /// 新 JOIN 归属的根：路径首段命名的根优先，否则挂到最后一个根上。
    pub(crate) fn root_for_join(&mut self, target: &JoinTarget) -> Option<&mut FromItem> {
        if let JoinTarget::Path(p) = target
            && let Some(first) = p.segments.first()
        {
            let owner = self.roots.iter().position(|r| {
                r.alias.as_deref() == Some(first.as_str())
                    || r.joins.iter().any(|j| j.alias.as_deref() == Some(first.as_str()))
            });
            if let Some(i) = owner {
                return self.roots.get_mut(i);
            }
        }
        self.roots.last_mut()
    }
}

fn fold_conjuncts(items: &[Expr]) -> Option<Expr> {
    match items.len() {
        0 => None,
        1 => Some(items[0].clone()),
        _ => Some(Expr::and(items.to_vec())),
    }
}
