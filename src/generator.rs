//! 渲染：把查询模型线性化为带命名参数记号的查询文本。
//!
//! 表达式按深度优先渲染。遇到子查询时只写入占位记号并在当前帧登记；
//! 一个子句表达式渲染完后，再逐个渲染登记的子查询并回填到占位位置。

use crate::args::{RenderedQuery, is_generated_name};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::expr::{BooleanOperator, Expr, InValues};
use crate::keyset::{KeysetMode, keyset_predicate};
use crate::model::{
    CteBody, CteDefinition, FrameBound, FromItem, JoinTarget, OrderByItem, QueryExpression,
    QueryModel, SelectItem, SetOperation, WindowDefinition,
};
use crate::parser::is_identifier;
use crate::render::RenderContext;
use crate::string_builder::StringBuilder;
use crate::subquery::find_alias;
use crate::value::SqlValue;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{clause}: subquery placeholder `{alias}` is not present in the rendered text")]
    UnresolvedSubqueryAlias { clause: ClauseType, alias: String },
    #[error("subquery alias `{alias}` is not referenced by `{template}`")]
    UnreferencedSubqueryAlias { alias: String, template: String },
    #[error("SELECT: {0}")]
    IllegalSelection(&'static str),
    #[error("query has neither FROM items nor SELECT items")]
    EmptyQuery,
    #[error("KEYSET: tuple has {actual} values but the query orders by {expected} expressions")]
    KeysetShapeMismatch { expected: usize, actual: usize },
    #[error("PARAMETER: `:{name}` is reserved for generated parameters")]
    ReservedParameterName { name: String },
}

/// 渲染单个查询或集合运算树。每次调用使用一个新的渲染上下文。
pub fn render(query: &QueryExpression, config: &QueryConfig) -> Result<RenderedQuery, RenderError> {
    let mut generator = Generator::new(config);
    let sql = generator.query_expression(query, false)?;
    generator.finish(sql)
}

pub fn render_query(model: &QueryModel, config: &QueryConfig) -> Result<RenderedQuery, RenderError> {
    let mut generator = Generator::new(config);
    let sql = generator.query(model)?;
    generator.finish(sql)
}

pub fn render_set(set: &SetOperation, config: &QueryConfig) -> Result<RenderedQuery, RenderError> {
    let mut generator = Generator::new(config);
    let sql = generator.set_operation(set)?;
    generator.finish(sql)
}

struct Generator<'c> {
    ctx: RenderContext<'c>,
}

impl<'c> Generator<'c> {
    fn new(config: &'c QueryConfig) -> Self {
        Self {
            ctx: RenderContext::new(config),
        }
    }

    fn finish(self, sql: String) -> Result<RenderedQuery, RenderError> {
        if self.ctx.pending_subqueries() > 0 || RenderContext::is_subquery_token(&sql) {
            return Err(RenderError::UnresolvedSubqueryAlias {
                clause: ClauseType::Select,
                alias: leftover_token(&sql),
            });
        }
        let rendered = self.ctx.params.into_rendered(sql);
        tracing::debug!(
            len = rendered.sql.len(),
            params = rendered.parameter_types.len(),
            "rendered query"
        );
        Ok(rendered)
    }

    fn query_expression(&mut self, query: &QueryExpression, operand: bool) -> Result<String, RenderError> {
        match query {
            QueryExpression::Select(model) => {
                let sql = self.query(model)?;
                let needs_parens = operand
                    && (!model.order_by.is_empty() || model.limit.is_some() || model.offset.is_some());
                Ok(if needs_parens { format!("({sql})") } else { sql })
            }
            QueryExpression::Set(set) => {
                let sql = self.set_operation(set)?;
                Ok(if operand { format!("({sql})") } else { sql })
            }
        }
    }

    fn set_operation(&mut self, set: &SetOperation) -> Result<String, RenderError> {
        let mut buf = StringBuilder::new();
        if let Some(with) = self.with_clause(&set.ctes)? {
            buf.write_leading(&with);
        }
        let first = self.query_expression(&set.first, true)?;
        buf.write_leading(&first);
        for (op, operand) in &set.rest {
            let operand = self.query_expression(operand, true)?;
            buf.write_leading(op.as_str());
            buf.write_leading(&operand);
        }
        self.order_limit(&mut buf, &set.order_by, set.limit, set.offset)?;
        Ok(buf.into_string())
    }

    fn query(&mut self, model: &QueryModel) -> Result<String, RenderError> {
        for (name, value) in &model.parameter_values {
            self.ctx.params.bind_explicit(name, value.clone());
        }
        for (name, ty) in &model.parameter_types {
            self.ctx.params.declare_type(name, *ty);
        }

        self.ctx.push_scope();
        let result = self.query_body(model);
        self.ctx.pop_scope();
        result
    }

    fn query_body(&mut self, model: &QueryModel) -> Result<String, RenderError> {
        let mut buf = StringBuilder::new();
        if let Some(with) = self.with_clause(&model.ctes)? {
            buf.write_leading(&with);
        }

        // FROM 先于 SELECT 处理：生成的别名要在解析 SELECT 路径之前登记
        let (from, root_aliases) = self.from_clause(&model.roots)?;

        let select = self.select_clause(model, &root_aliases)?;
        buf.write_leading("SELECT");
        if model.distinct {
            buf.write_leading("DISTINCT");
        }
        buf.write_leading(&select);

        if !from.is_empty() {
            buf.write_leading("FROM");
            buf.write_leading(&from);
        }

        let mut conjuncts = model.where_clause.clone();
        if let Some(link) = &model.keyset
            && link.mode != KeysetMode::None
            && link.keyset.len() != model.order_by.len()
        {
            return Err(RenderError::KeysetShapeMismatch {
                expected: model.order_by.len(),
                actual: link.keyset.len(),
            });
        }
        if let Some(link) = &model.keyset
            && let Some(predicate) = keyset_predicate(
                &model.order_by,
                link,
                self.ctx.config.optimized_keyset_predicate,
                &mut self.ctx.params,
            )
        {
            conjuncts.push(predicate);
        }
        if !conjuncts.is_empty() {
            let text = self.conjunction(ClauseType::Where, &conjuncts)?;
            buf.write_leading("WHERE");
            buf.write_leading(&text);
        }

        if !model.group_by.is_empty() {
            let items = self.expression_list(ClauseType::GroupBy, &model.group_by)?;
            buf.write_leading("GROUP BY");
            buf.write_leading(&items.join(", "));
        }

        if !model.having.is_empty() {
            let text = self.conjunction(ClauseType::Having, &model.having)?;
            buf.write_leading("HAVING");
            buf.write_leading(&text);
        }

        if !model.windows.is_empty() {
            let mut defs = Vec::with_capacity(model.windows.len());
            for w in &model.windows {
                defs.push(self.window_definition(w)?);
            }
            buf.write_leading("WINDOW");
            buf.write_leading(&defs.join(", "));
        }

        let inverted;
        let order_by = match &model.keyset {
            Some(link) if link.mode == crate::keyset::KeysetMode::Previous => {
                inverted = model.order_by.iter().map(OrderByItem::inverted).collect::<Vec<_>>();
                &inverted
            }
            _ => &model.order_by,
        };
        self.order_limit(&mut buf, order_by, model.limit, model.offset)?;

        Ok(buf.into_string())
    }

    fn with_clause(&mut self, ctes: &[CteDefinition]) -> Result<Option<String>, RenderError> {
        let mut entries = Vec::new();
        let mut recursive = false;
        for cte in ctes {
            if cte.inlined && !cte.is_recursive() && self.ctx.config.inline_ctes {
                self.ctx.register_inline_cte(cte.clone());
                continue;
            }
            recursive |= cte.is_recursive();
            let body = match &cte.body {
                CteBody::Query(q) => self.query(q)?,
                CteBody::Recursive {
                    base,
                    connector,
                    recursive,
                } => {
                    let base = self.query(base)?;
                    let rec = self.query(recursive)?;
                    format!("{base} {} {rec}", connector.as_str())
                }
            };
            entries.push(format!("{}({}) AS ({body})", cte.name, cte.columns.join(", ")));
        }
        if entries.is_empty() {
            return Ok(None);
        }
        let keyword = if recursive { "WITH RECURSIVE" } else { "WITH" };
        Ok(Some(format!("{keyword} {}", entries.join(", "))))
    }

    fn from_clause(&mut self, roots: &[FromItem]) -> Result<(String, Vec<String>), RenderError> {
        let mut items = Vec::with_capacity(roots.len());
        let mut aliases = Vec::with_capacity(roots.len());
        for root in roots {
            let alias = match &root.alias {
                Some(a) => a.clone(),
                None => self.ctx.allocate_alias(&root.entity),
            };

            let source = match self.ctx.inline_cte(&root.entity) {
                Some(cte) => format!("({})", self.inline_cte_body(&cte)?),
                None => root.entity.clone(),
            };
            self.ctx.declare_root(&alias);

            let mut buf = StringBuilder::new();
            buf.write_leading(&source);
            buf.write_leading(&alias);
            for join in &root.joins {
                let (target, resolved) = match &join.target {
                    JoinTarget::Path(p) => {
                        let resolved = self.ctx.resolve_path(p);
                        (resolved.join("."), Some(resolved))
                    }
                    JoinTarget::Entity(e) => (e.clone(), None),
                };
                let join_alias = match &join.alias {
                    Some(a) => a.clone(),
                    None => {
                        let base = resolved
                            .as_ref()
                            .and_then(|r| r.last())
                            .map_or("join", String::as_str);
                        self.ctx.allocate_alias(base)
                    }
                };
                self.ctx.declare_join(&join_alias, resolved, join.default);

                buf.write_leading(join.join_type.as_str());
                if join.fetch {
                    buf.write_leading("FETCH");
                }
                buf.write_leading(&target);
                buf.write_leading(&join_alias);
                if !join.on.is_empty() {
                    let on = self.conjunction(ClauseType::Join, &join.on)?;
                    buf.write_leading("ON");
                    buf.write_leading(&on);
                }
            }
            items.push(buf.into_string());
            aliases.push(alias);
        }
        Ok((items.join(", "), aliases))
    }

    /// 内联 CTE：列名作为选择项别名。
    fn inline_cte_body(&mut self, cte: &CteDefinition) -> Result<String, RenderError> {
        let CteBody::Query(body) = &cte.body else {
            return Err(RenderError::IllegalSelection("recursive CTEs cannot be inlined"));
        };
        let mut body = (**body).clone();
        for (item, column) in body.selection.iter_mut().zip(&cte.columns) {
            if let SelectItem::Expression { alias, .. } = item {
                *alias = Some(column.clone());
            }
        }
        self.query(&body)
    }

    fn select_clause(&mut self, model: &QueryModel, root_aliases: &[String]) -> Result<String, RenderError> {
        if model.selection.is_empty() {
            if root_aliases.is_empty() {
                return Err(RenderError::EmptyQuery);
            }
            return Ok(root_aliases.join(", "));
        }

        let objects = model
            .selection
            .iter()
            .filter(|s| matches!(s, SelectItem::Object { .. }))
            .count();
        if objects > 0 && model.selection.len() > 1 {
            return Err(RenderError::IllegalSelection(
                "SELECT NEW cannot be combined with other selections",
            ));
        }

        let mut items = Vec::with_capacity(model.selection.len());
        for item in &model.selection {
            match item {
                SelectItem::Expression { expr, alias } => {
                    let text = self.clause_expr(ClauseType::Select, expr)?;
                    items.push(match alias {
                        Some(a) => format!("{text} AS {a}"),
                        None => text,
                    });
                }
                SelectItem::Object { constructor, args } => {
                    let args = self.expression_list(ClauseType::Select, args)?;
                    items.push(format!("NEW {constructor}({})", args.join(", ")));
                }
            }
        }
        Ok(items.join(", "))
    }

    fn window_definition(&mut self, w: &WindowDefinition) -> Result<String, RenderError> {
        let mut buf = StringBuilder::new();
        if !w.partition_by.is_empty() {
            let items = self.expression_list(ClauseType::Window, &w.partition_by)?;
            buf.write_leading("PARTITION BY");
            buf.write_leading(&items.join(", "));
        }
        if !w.order_by.is_empty() {
            let items = self.order_items(&w.order_by)?;
            buf.write_leading("ORDER BY");
            buf.write_leading(&items.join(", "));
        }
        if let Some(frame) = &w.frame {
            buf.write_leading(frame.mode.as_str());
            match &frame.end {
                None => {
                    let start = self.frame_bound(&frame.start)?;
                    buf.write_leading(&start);
                }
                Some(end) => {
                    let start = self.frame_bound(&frame.start)?;
                    let end = self.frame_bound(end)?;
                    buf.write_leading("BETWEEN");
                    buf.write_leading(&start);
                    buf.write_leading("AND");
                    buf.write_leading(&end);
                }
            }
            if let Some(exclusion) = frame.exclusion {
                buf.write_leading(exclusion.as_str());
            }
        }
        Ok(format!("{} AS ({})", w.name, buf.into_string()))
    }

    fn frame_bound(&mut self, bound: &FrameBound) -> Result<String, RenderError> {
        Ok(match bound {
            FrameBound::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
            FrameBound::Preceding(e) => format!("{} PRECEDING", self.clause_expr(ClauseType::Window, e)?),
            FrameBound::CurrentRow => "CURRENT ROW".to_string(),
            FrameBound::Following(e) => format!("{} FOLLOWING", self.clause_expr(ClauseType::Window, e)?),
            FrameBound::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
        })
    }

    fn order_items(&mut self, items: &[OrderByItem]) -> Result<Vec<String>, RenderError> {
        let flavor = self.ctx.flavor();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let text = self.clause_expr(ClauseType::OrderBy, &item.expr)?;
            out.push(flavor.render_order_item(&text, item.ascending, item.nulls_first));
        }
        Ok(out)
    }

    fn order_limit(
        &mut self,
        buf: &mut StringBuilder,
        order_by: &[OrderByItem],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<(), RenderError> {
        if !order_by.is_empty() {
            let items = self.order_items(order_by)?;
            buf.write_leading("ORDER BY");
            buf.write_leading(&items.join(", "));
        }
        let limit = limit.map(|n| self.ctx.params.add_literal(SqlValue::U64(n)));
        let offset = offset.map(|n| self.ctx.params.add_literal(SqlValue::U64(n)));
        self.ctx
            .flavor()
            .write_limit_offset(buf, limit.as_deref(), offset.as_deref(), !order_by.is_empty());
        Ok(())
    }

    fn expression_list(&mut self, clause: ClauseType, exprs: &[Expr]) -> Result<Vec<String>, RenderError> {
        exprs.iter().map(|e| self.clause_expr(clause, e)).collect()
    }

    /// 顶层谓词按 AND 连接；多个子节点的连接加括号。
    fn conjunction(&mut self, clause: ClauseType, items: &[Expr]) -> Result<String, RenderError> {
        if items.len() == 1 {
            return self.clause_expr(clause, &items[0]);
        }
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let text = self.clause_expr(clause, item)?;
            parts.push(if item.needs_grouping() { format!("({text})") } else { text });
        }
        Ok(parts.join(" AND "))
    }

    /// 渲染一个子句级表达式，然后回填其中登记的全部子查询。
    fn clause_expr(&mut self, clause: ClauseType, expr: &Expr) -> Result<String, RenderError> {
        self.ctx.push_frame();
        let result = self.expr(expr);
        let pending = self.ctx.pop_frame();
        let mut text = result?;

        for (token, query) in pending {
            let sub = self.query(&query)?;
            if !text.contains(&token) {
                return Err(RenderError::UnresolvedSubqueryAlias { clause, alias: token });
            }
            tracing::trace!(token = %token, clause = %clause, "resolved subquery");
            text = text.replacen(&token, &format!("({sub})"), 1);
        }
        Ok(text)
    }

    fn operand(&mut self, expr: &Expr) -> Result<String, RenderError> {
        let text = self.expr(expr)?;
        Ok(match expr {
            Expr::Connective { children, .. } if children.len() > 1 => format!("({text})"),
            Expr::Comparison { .. } | Expr::Not(_) => format!("({text})"),
            _ => text,
        })
    }

    fn expr(&mut self, expr: &Expr) -> Result<String, RenderError> {
        Ok(match expr {
            Expr::Literal(v) => self.ctx.params.add_literal(v.clone()),
            Expr::Path(p) => self.ctx.resolve_path(p).join("."),
            Expr::Parameter(name) if self.ctx.params.is_generated(name) => format!(":{name}"),
            Expr::Parameter(name) => self.parameter(name)?,
            Expr::Raw(text) => {
                self.register_raw_parameters(text)?;
                text.clone()
            }
            Expr::Function { name, args } => {
                let mut parts = Vec::with_capacity(args.len());
                for a in args {
                    parts.push(self.expr(a)?);
                }
                format!("{name}({})", parts.join(", "))
            }
            Expr::Comparison {
                op,
                left,
                right,
                quantifier,
            } => {
                let l = self.operand(left)?;
                let r = self.operand(right)?;
                match quantifier {
                    Some(q) => format!("{l} {} {} {r}", op.as_str(), q.as_str()),
                    None => format!("{l} {} {r}", op.as_str()),
                }
            }
            Expr::Between {
                expr,
                lower,
                upper,
                negated,
            } => {
                let e = self.operand(expr)?;
                let l = self.operand(lower)?;
                let u = self.operand(upper)?;
                format!("{e} {}BETWEEN {l} AND {u}", not(*negated))
            }
            Expr::In {
                expr,
                values,
                negated,
            } => match values {
                InValues::List(list) if list.is_empty() => {
                    // 空 IN 恒假，空 NOT IN 恒真
                    let op = if *negated { BooleanOperator::And } else { BooleanOperator::Or };
                    op.identity().to_string()
                }
                InValues::List(list) => {
                    let e = self.operand(expr)?;
                    let mut parts = Vec::with_capacity(list.len());
                    for v in list {
                        parts.push(self.expr(v)?);
                    }
                    format!("{e} {}IN ({})", not(*negated), parts.join(", "))
                }
                InValues::Subquery(q) => {
                    let e = self.operand(expr)?;
                    let token = self.ctx.register_subquery((**q).clone());
                    format!("{e} {}IN {token}", not(*negated))
                }
            },
            Expr::Like {
                expr,
                pattern,
                escape,
                case_sensitive,
                negated,
            } => {
                let e = self.operand(expr)?;
                let p = self.operand(pattern)?;
                let mut text = if *case_sensitive {
                    format!("{e} {}LIKE {p}", not(*negated))
                } else {
                    format!("UPPER({e}) {}LIKE UPPER({p})", not(*negated))
                };
                if let Some(c) = escape {
                    let token = self.ctx.params.add_literal(SqlValue::from(c.to_string()));
                    text.push_str(" ESCAPE ");
                    text.push_str(&token);
                }
                text
            }
            Expr::NullCheck { expr, negated } => {
                format!("{} IS {}NULL", self.operand(expr)?, not(*negated))
            }
            Expr::EmptyCheck { expr, negated } => {
                format!("{} IS {}EMPTY", self.operand(expr)?, not(*negated))
            }
            Expr::MemberOf {
                expr,
                collection,
                negated,
            } => {
                let e = self.operand(expr)?;
                let c = self.operand(collection)?;
                format!("{e} {}MEMBER OF {c}", not(*negated))
            }
            Expr::Exists { subquery, negated } => {
                let token = self.ctx.register_subquery((**subquery).clone());
                format!("{}EXISTS {token}", not(*negated))
            }
            Expr::Connective { op, children } => match children.len() {
                0 => op.identity().to_string(),
                1 => self.expr(&children[0])?,
                _ => {
                    let mut parts = Vec::with_capacity(children.len());
                    for child in children {
                        let text = self.expr(child)?;
                        parts.push(if child.needs_grouping() { format!("({text})") } else { text });
                    }
                    parts.join(&format!(" {} ", op.as_str()))
                }
            },
            Expr::Not(inner) => format!("NOT ({})", self.expr(inner)?),
            Expr::CaseWhen {
                operand,
                branches,
                otherwise,
            } => {
                let mut buf = StringBuilder::new();
                buf.write_leading("CASE");
                if let Some(o) = operand {
                    let o = self.operand(o)?;
                    buf.write_leading(&o);
                }
                for b in branches {
                    let c = self.expr(&b.condition)?;
                    let r = self.operand(&b.result)?;
                    buf.write_leading("WHEN");
                    buf.write_leading(&c);
                    buf.write_leading("THEN");
                    buf.write_leading(&r);
                }
                if let Some(e) = otherwise {
                    let e = self.operand(e)?;
                    buf.write_leading("ELSE");
                    buf.write_leading(&e);
                }
                buf.write_leading("END");
                buf.into_string()
            }
            Expr::Subquery(q) => self.ctx.register_subquery((**q).clone()),
            Expr::Composite {
                template,
                subqueries,
            } => {
                let mut text = template.clone();
                for sq in subqueries {
                    let Some(pos) = find_alias(&text, &sq.alias) else {
                        return Err(RenderError::UnreferencedSubqueryAlias {
                            alias: sq.alias.clone(),
                            template: template.clone(),
                        });
                    };
                    // 同一别名可出现多次，每处各占一个占位符
                    let mut next = Some(pos);
                    while let Some(pos) = next {
                        let token = self.ctx.register_subquery(sq.query.clone());
                        text.replace_range(pos..pos + sq.alias.len(), &token);
                        next = find_alias(&text, &sq.alias);
                    }
                }
                self.register_raw_parameters(&text)?;
                text
            }
        })
    }

    fn parameter(&mut self, name: &str) -> Result<String, RenderError> {
        if is_generated_name(name) {
            return Err(RenderError::ReservedParameterName { name: name.to_string() });
        }
        if self.ctx.params.is_registered(name) {
            return Ok(format!(":{name}"));
        }
        Ok(self.ctx.params.register_explicit(name))
    }

    /// 原样输出的文本里出现的 `:name` 也登记为显式参数。
    fn register_raw_parameters(&mut self, text: &str) -> Result<(), RenderError> {
        for name in raw_parameter_names(text) {
            self.parameter(name)?;
        }
        Ok(())
    }
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

fn raw_parameter_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b':' if !in_string => {
                if bytes.get(i + 1) == Some(&b':') || (i > 0 && bytes[i - 1] == b':') {
                    i += 2;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                if is_identifier(&text[start..end]) {
                    names.push(&text[start..end]);
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    names
}

fn leftover_token(sql: &str) -> String {
    sql.find("__subquery_")
        .map(|start| {
            let rest = &sql[start..];
            let end = rest[2..].find("__").map_or(rest.len(), |i| i + 4);
            rest[..end].to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_parameter_names_skip_casts_and_strings() {
        assert_eq!(
            raw_parameter_names("d.age + :delta > ':nope' AND x::int = :other"),
            vec!["delta", "other"]
        );
    }

    #[test]
    fn leftover_token_extracts_placeholder() {
        assert_eq!(leftover_token("a = __subquery_3__ AND b"), "__subquery_3__");
        assert_eq!(leftover_token("a = 1"), "");
    }
}
