//! 能力 trait：具体 builder 声明实现哪些能力，就恰好拥有这些方法。
//!
//! 方法全部是建立在 [`QueryHolder`] 上的默认实现，builder 只需要 `impl HasX for T {}`。

use crate::args::is_generated_name;
use crate::builder::{PredicateReceiver, QueryHolder, require_name};
use crate::case_when::{CaseWhenStarter, SimpleCaseWhenStarter};
use crate::clause::ClauseType;
use crate::cte::{CteBuilder, RecursiveCteBuilder};
use crate::error::BuildError;
use crate::expr::{Expr, PathReference};
use crate::join::JoinOnBuilder;
use crate::macros::predicate_entry_methods;
use crate::model::{FromItem, JoinNode, JoinTarget, JoinType, OrderByItem, SelectItem};
use crate::predicate_group::{And, HavingClause, Or, PredicateGroup, WhereClause};
use crate::select_object::SelectObjectBuilder;
use crate::slot::SelectSlot;
use crate::subquery::{MultipleSubqueryBuilder, SubqueryBuilder};
use crate::value::{ParameterType, SqlValue};
use crate::window::WindowBuilder;

pub trait HasFrom: QueryHolder {
    /// `FROM entity alias`。
    fn from(mut self, entity: &str, alias: &str) -> Result<Self, BuildError> {
        let entity = require_name(ClauseType::From, "entity", entity)?;
        let alias = require_name(ClauseType::From, "alias", alias)?;
        self.query_mut().roots.push(FromItem {
            entity,
            alias: Some(alias),
            joins: Vec::new(),
        });
        Ok(self)
    }

    /// 不指定别名，渲染时生成。
    fn from_entity(mut self, entity: &str) -> Result<Self, BuildError> {
        let entity = require_name(ClauseType::From, "entity", entity)?;
        self.query_mut().roots.push(FromItem {
            entity,
            alias: None,
            joins: Vec::new(),
        });
        Ok(self)
    }

    /// 沿关联路径 JOIN，带显式别名。
    fn join(self, path: &str, alias: &str, join_type: JoinType) -> Result<Self, BuildError> {
        let alias = require_name(ClauseType::Join, "alias", alias)?;
        add_path_join(self, path, Some(alias), join_type, false, false)
    }

    /// 默认 JOIN：之后以该路径开头的引用都指向这个 JOIN。别名由渲染期生成。
    fn join_default(self, path: &str, join_type: JoinType) -> Result<Self, BuildError> {
        add_path_join(self, path, None, join_type, false, true)
    }

    /// 带显式别名的默认 JOIN。
    fn join_default_as(self, path: &str, alias: &str, join_type: JoinType) -> Result<Self, BuildError> {
        let alias = require_name(ClauseType::Join, "alias", alias)?;
        add_path_join(self, path, Some(alias), join_type, false, true)
    }

    fn inner_join(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join(path, alias, JoinType::Inner)
    }

    fn left_join(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join(path, alias, JoinType::Left)
    }

    fn right_join(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join(path, alias, JoinType::Right)
    }

    fn inner_join_default(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join_default_as(path, alias, JoinType::Inner)
    }

    fn left_join_default(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join_default_as(path, alias, JoinType::Left)
    }

    fn right_join_default(self, path: &str, alias: &str) -> Result<Self, BuildError> {
        self.join_default_as(path, alias, JoinType::Right)
    }

    /// `LEFT JOIN FETCH path`，作为默认 JOIN。
    fn fetch(self, path: &str) -> Result<Self, BuildError> {
        add_path_join(self, path, None, JoinType::Left, true, true)
    }

    fn join_fetch(self, path: &str, alias: &str, join_type: JoinType) -> Result<Self, BuildError> {
        let alias = require_name(ClauseType::Join, "alias", alias)?;
        add_path_join(self, path, Some(alias), join_type, true, false)
    }

    /// 沿关联路径 JOIN 并附加 ON 条件。
    fn join_on(self, path: &str, alias: &str, join_type: JoinType) -> Result<JoinOnBuilder<Self>, BuildError> {
        let path = require_name(ClauseType::Join, "path", path)?;
        let alias = require_name(ClauseType::Join, "alias", alias)?;
        Ok(JoinOnBuilder::new(
            self,
            JoinTarget::Path(PathReference::parse_dotted(&path)),
            alias,
            join_type,
        ))
    }

    /// 与另一个实体 JOIN，条件全部来自 ON。
    fn entity_join_on(
        self,
        entity: &str,
        alias: &str,
        join_type: JoinType,
    ) -> Result<JoinOnBuilder<Self>, BuildError> {
        let entity = require_name(ClauseType::Join, "entity", entity)?;
        let alias = require_name(ClauseType::Join, "alias", alias)?;
        Ok(JoinOnBuilder::new(self, JoinTarget::Entity(entity), alias, join_type))
    }

    fn inner_join_on(self, path: &str, alias: &str) -> Result<JoinOnBuilder<Self>, BuildError> {
        self.join_on(path, alias, JoinType::Inner)
    }

    fn left_join_on(self, path: &str, alias: &str) -> Result<JoinOnBuilder<Self>, BuildError> {
        self.join_on(path, alias, JoinType::Left)
    }

    fn right_join_on(self, path: &str, alias: &str) -> Result<JoinOnBuilder<Self>, BuildError> {
        self.join_on(path, alias, JoinType::Right)
    }
}

fn add_path_join<T: QueryHolder>(
    mut holder: T,
    path: &str,
    alias: Option<String>,
    join_type: JoinType,
    fetch: bool,
    default: bool,
) -> Result<T, BuildError> {
    let path = require_name(ClauseType::Join, "path", path)?;
    let node = JoinNode {
        target: JoinTarget::Path(PathReference::parse_dotted(&path)),
        alias,
        join_type,
        fetch,
        default,
        on: Vec::new(),
    };
    attach_join(holder.query_mut(), node)?;
    Ok(holder)
}

pub(crate) fn attach_join(query: &mut crate::model::QueryModel, node: JoinNode) -> Result<(), BuildError> {
    let root = query
        .root_for_join(&node.target)
        .ok_or(BuildError::MissingFrom {
            clause: ClauseType::Join,
        })?;
    root.joins.push(node);
    Ok(())
}

pub trait HasSelect: QueryHolder {
    fn select(self, expression: &str) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::Select, expression)?;
        Ok(self.select_expr(expr, None))
    }

    fn select_as(self, expression: &str, alias: &str) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::Select, expression)?;
        let alias = require_name(ClauseType::Select, "alias", alias)?;
        Ok(self.select_expr(expr, Some(&alias)))
    }

    fn select_all(mut self, expressions: Vec<String>) -> Result<Self, BuildError> {
        for e in &expressions {
            self = self.select(e)?;
        }
        Ok(self)
    }

    fn select_expr(mut self, expr: Expr, alias: Option<&str>) -> Self {
        self.query_mut().selection.push(SelectItem::Expression {
            expr,
            alias: alias.map(str::to_string),
        });
        self
    }

    /// 以搜索式 CASE 作为选择项。
    fn select_case(self, alias: Option<&str>) -> CaseWhenStarter<SelectSlot<Self>> {
        CaseWhenStarter::new(SelectSlot::new(self, alias.map(str::to_string)))
    }

    fn select_simple_case(
        self,
        operand: &str,
        alias: Option<&str>,
    ) -> Result<SimpleCaseWhenStarter<SelectSlot<Self>>, BuildError> {
        let operand = self.parse_expression(ClauseType::Select, operand)?;
        Ok(SimpleCaseWhenStarter::new(
            SelectSlot::new(self, alias.map(str::to_string)),
            operand,
        ))
    }

    fn select_subquery(self, alias: Option<&str>) -> SubqueryBuilder<SelectSlot<Self>> {
        SubqueryBuilder::new(SelectSlot::new(self, alias.map(str::to_string)))
    }

    fn select_subqueries(
        self,
        template: &str,
        alias: Option<&str>,
    ) -> Result<MultipleSubqueryBuilder<SelectSlot<Self>>, BuildError> {
        MultipleSubqueryBuilder::new(SelectSlot::new(self, alias.map(str::to_string)), template)
    }

    /// `SELECT NEW constructor(...)`。
    fn select_new(self, constructor: &str) -> Result<SelectObjectBuilder<Self>, BuildError> {
        let constructor = require_name(ClauseType::Select, "constructor", constructor)?;
        Ok(SelectObjectBuilder::new(self, constructor))
    }

    fn distinct(mut self) -> Self {
        self.query_mut().distinct = true;
        self
    }
}

pub trait HasWhere: QueryHolder + PredicateReceiver {
    predicate_entry_methods! {
        clause = ClauseType::Where;
        marker = WhereClause;
        start = where_;
        start_expr = where_expr;
        not = where_not;
        exists = where_exists;
        not_exists = where_not_exists;
        case = where_case;
        subquery = where_subquery;
        subqueries = where_subqueries;
    }

    fn where_and(self) -> PredicateGroup<Self, And, WhereClause> {
        PredicateGroup::new(self, false)
    }

    fn where_or(self) -> PredicateGroup<Self, Or, WhereClause> {
        PredicateGroup::new(self, false)
    }

    /// 追加一个已构建的谓词。
    fn where_predicate(mut self, predicate: Expr) -> Self {
        self.add_predicate(ClauseType::Where, predicate);
        self
    }
}

pub trait HasGroupBy: QueryHolder + PredicateReceiver {
    fn group_by(self, expression: &str) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::GroupBy, expression)?;
        Ok(self.group_by_expr(expr))
    }

    fn group_by_expr(mut self, expr: Expr) -> Self {
        self.query_mut().group_by.push(expr);
        self
    }

    fn group_by_all(mut self, expressions: Vec<String>) -> Result<Self, BuildError> {
        for e in &expressions {
            self = self.group_by(e)?;
        }
        Ok(self)
    }

    predicate_entry_methods! {
        clause = ClauseType::Having;
        marker = HavingClause;
        start = having;
        start_expr = having_expr;
        not = having_not;
        exists = having_exists;
        not_exists = having_not_exists;
        case = having_case;
        subquery = having_subquery;
        subqueries = having_subqueries;
    }

    fn having_and(self) -> PredicateGroup<Self, And, HavingClause> {
        PredicateGroup::new(self, false)
    }

    fn having_or(self) -> PredicateGroup<Self, Or, HavingClause> {
        PredicateGroup::new(self, false)
    }

    fn having_predicate(mut self, predicate: Expr) -> Self {
        self.add_predicate(ClauseType::Having, predicate);
        self
    }
}

pub trait HasOrderBy: QueryHolder {
    fn order_by(self, expression: &str, ascending: bool, nulls_first: bool) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::OrderBy, expression)?;
        Ok(self.order_by_expr(expr, ascending, nulls_first))
    }

    /// 升序，NULL 排在最后。
    fn order_by_asc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, true, false)
    }

    /// 降序，NULL 排在最后。
    fn order_by_desc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, false, false)
    }

    fn order_by_expr(mut self, expr: Expr, ascending: bool, nulls_first: bool) -> Self {
        self.query_mut().order_by.push(OrderByItem {
            expr,
            ascending,
            nulls_first,
        });
        self
    }
}

pub trait HasLimit: QueryHolder {
    fn limit(mut self, max_results: u64) -> Self {
        self.query_mut().limit = Some(max_results);
        self
    }

    fn offset(mut self, first_result: u64) -> Self {
        self.query_mut().offset = Some(first_result);
        self
    }
}

pub trait HasWindow: QueryHolder {
    /// 登记一个命名窗口；同一查询内名称唯一。
    fn window(self, name: &str) -> Result<WindowBuilder<Self>, BuildError> {
        let name = require_name(ClauseType::Window, "window name", name)?;
        if self.query().windows.iter().any(|w| w.name == name) {
            return Err(BuildError::DuplicateWindow { name });
        }
        Ok(WindowBuilder::new(self, name))
    }
}

pub trait HasCte: QueryHolder {
    fn with(self, name: &str) -> Result<CteBuilder<Self>, BuildError> {
        let name = check_cte_name(&self, name)?;
        Ok(CteBuilder::new(self, name, false))
    }

    /// 渲染时作为 FROM 子查询内联（受配置开关控制）。
    fn with_inline(self, name: &str) -> Result<CteBuilder<Self>, BuildError> {
        let name = check_cte_name(&self, name)?;
        Ok(CteBuilder::new(self, name, true))
    }

    fn with_recursive(self, name: &str) -> Result<RecursiveCteBuilder<Self>, BuildError> {
        let name = check_cte_name(&self, name)?;
        Ok(RecursiveCteBuilder::new(self, name))
    }
}

fn check_cte_name<T: QueryHolder>(holder: &T, name: &str) -> Result<String, BuildError> {
    let name = require_name(ClauseType::Cte, "CTE name", name)?;
    if holder.query().find_cte(&name).is_some() {
        return Err(BuildError::DuplicateCte { name });
    }
    Ok(name)
}

pub trait HasParameters: QueryHolder {
    /// 绑定显式参数 `:name` 的值。
    fn set_parameter(mut self, name: &str, value: impl Into<SqlValue>) -> Result<Self, BuildError> {
        let name = parameter_name(name)?;
        self.query_mut().parameter_values.insert(name, value.into());
        Ok(self)
    }

    fn set_parameter_type(mut self, name: &str, ty: ParameterType) -> Result<Self, BuildError> {
        let name = parameter_name(name)?;
        self.query_mut().parameter_types.insert(name, ty);
        Ok(self)
    }
}

/// `:name` 与 `name` 等价；`param_N`、`keyset_N` 留给生成参数。
fn parameter_name(name: &str) -> Result<String, BuildError> {
    let name = require_name(ClauseType::Parameter, "parameter name", name.trim().trim_start_matches(':'))?;
    if is_generated_name(&name) {
        return Err(BuildError::ReservedParameterName { name });
    }
    Ok(name)
}
