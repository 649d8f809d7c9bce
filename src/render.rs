//! 单次渲染的上下文：别名分配、作用域解析、子查询占位帧和参数表。
//!
//! 每次 `render` 新建一个，渲染结束即丢弃；不同查询的上下文之间没有共享状态。

use crate::args::ParameterRegistry;
use crate::config::QueryConfig;
use crate::expr::PathReference;
use crate::flavor::Flavor;
use crate::model::{CteDefinition, QueryModel};
use std::collections::HashMap;

const SUBQUERY_TOKEN_PREFIX: &str = "__subquery_";

/// 一个查询层级中可见的别名。
#[derive(Debug, Default)]
struct Scope {
    aliases: Vec<String>,
    default_root: Option<String>,
    /// 已解析的默认 JOIN 路径 -> 别名。
    default_joins: Vec<(Vec<String>, String)>,
}

/// 一个子句表达式渲染期间登记的延迟子查询。
#[derive(Debug, Default)]
struct SubqueryFrame {
    pending: Vec<(String, QueryModel)>,
}

#[derive(Debug)]
pub struct RenderContext<'c> {
    pub(crate) config: &'c QueryConfig,
    pub(crate) params: ParameterRegistry,
    alias_counter: usize,
    subquery_counter: usize,
    scopes: Vec<Scope>,
    frames: Vec<SubqueryFrame>,
    inline_ctes: HashMap<String, CteDefinition>,
}

impl<'c> RenderContext<'c> {
    pub fn new(config: &'c QueryConfig) -> Self {
        Self {
            config,
            params: ParameterRegistry::new(),
            alias_counter: 0,
            subquery_counter: 0,
            scopes: Vec::new(),
            frames: Vec::new(),
            inline_ctes: HashMap::new(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.config.flavor
    }

    /// 为调用方未命名的条目生成别名：`{base}_{n}`，计数器单调递增。
    pub(crate) fn allocate_alias(&mut self, base: &str) -> String {
        self.alias_counter += 1;
        let alias = format!("{}_{}", base.to_ascii_lowercase(), self.alias_counter);
        tracing::trace!(alias = %alias, "allocated alias");
        alias
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn declare_root(&mut self, alias: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.default_root.is_none() {
                scope.default_root = Some(alias.to_string());
            }
            scope.aliases.push(alias.to_string());
        }
    }

    pub(crate) fn declare_join(&mut self, alias: &str, resolved_path: Option<Vec<String>>, default: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.aliases.push(alias.to_string());
            if default
                && let Some(path) = resolved_path
                && path.len() > 1
            {
                scope.default_joins.push((path, alias.to_string()));
            }
        }
    }

    /// 解析成员链：别名匹配优先（由内向外查找作用域），否则补上当前层的根别名；
    /// 然后把默认 JOIN 路径前缀替换成 JOIN 的别名。
    pub(crate) fn resolve_path(&self, path: &PathReference) -> Vec<String> {
        let Some(first) = path.segments.first() else {
            return Vec::new();
        };

        let owner = self
            .scopes
            .iter()
            .rev()
            .find(|s| s.aliases.iter().any(|a| a == first));
        let (scope, mut segments) = match owner {
            Some(scope) => (Some(scope), path.segments.clone()),
            None => match self.scopes.last() {
                Some(scope) => match &scope.default_root {
                    Some(root) => {
                        let mut s = Vec::with_capacity(path.segments.len() + 1);
                        s.push(root.clone());
                        s.extend(path.segments.iter().cloned());
                        (Some(scope), s)
                    }
                    None => (None, path.segments.clone()),
                },
                None => (None, path.segments.clone()),
            },
        };

        if let Some(scope) = scope {
            // 每次替换至少缩短一段，循环必然结束
            loop {
                let found = scope
                    .default_joins
                    .iter()
                    .filter(|(p, _)| p.len() <= segments.len() && segments.starts_with(p))
                    .max_by_key(|(p, _)| p.len())
                    .map(|(p, a)| (p.len(), a.clone()));
                let Some((prefix_len, alias)) = found else {
                    break;
                };
                let mut next = Vec::with_capacity(segments.len() - prefix_len + 1);
                next.push(alias);
                next.extend(segments[prefix_len..].iter().cloned());
                segments = next;
            }
        }
        segments
    }

    pub(crate) fn push_frame(&mut self) {
        self.frames.push(SubqueryFrame::default());
    }

    /// 在当前帧登记一个延迟子查询，返回要写进父表达式文本的占位记号。
    pub(crate) fn register_subquery(&mut self, query: QueryModel) -> String {
        self.subquery_counter += 1;
        let token = format!("{SUBQUERY_TOKEN_PREFIX}{}__", self.subquery_counter);
        if self.frames.is_empty() {
            self.frames.push(SubqueryFrame::default());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.pending.push((token.clone(), query));
        }
        tracing::trace!(token = %token, "deferred subquery");
        token
    }

    pub(crate) fn pop_frame(&mut self) -> Vec<(String, QueryModel)> {
        self.frames.pop().map(|f| f.pending).unwrap_or_default()
    }

    /// 所有帧里尚未回填的子查询数。
    pub fn pending_subqueries(&self) -> usize {
        self.frames.iter().map(|f| f.pending.len()).sum()
    }

    pub(crate) fn register_inline_cte(&mut self, cte: CteDefinition) {
        self.inline_ctes.insert(cte.name.clone(), cte);
    }

    pub(crate) fn inline_cte(&self, name: &str) -> Option<CteDefinition> {
        self.inline_ctes.get(name).cloned()
    }

    pub(crate) fn is_subquery_token(text: &str) -> bool {
        text.contains(SUBQUERY_TOKEN_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unqualified_chain_gets_root_alias() {
        let config = QueryConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.push_scope();
        ctx.declare_root("d");
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("name")),
            segs(&["d", "name"])
        );
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("d.name")),
            segs(&["d", "name"])
        );
    }

    #[test]
    fn default_join_prefix_is_substituted() {
        let config = QueryConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.push_scope();
        ctx.declare_root("d");
        let owner = ctx.allocate_alias("owner");
        ctx.declare_join(&owner, Some(segs(&["d", "owner"])), true);
        ctx.declare_join("a", Some(segs(&["owner_1", "address"])), false);

        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("d.owner.name")),
            segs(&["owner_1", "name"])
        );
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("owner.name")),
            segs(&["owner_1", "name"])
        );
        // 显式别名不是默认 JOIN
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("a.city")),
            segs(&["a", "city"])
        );
    }

    #[test]
    fn alias_match_wins_and_outer_scopes_are_visible() {
        let config = QueryConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.push_scope();
        ctx.declare_root("d");
        ctx.push_scope();
        ctx.declare_root("p");
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("d.id")),
            segs(&["d", "id"])
        );
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("id")),
            segs(&["p", "id"])
        );
        ctx.pop_scope();
        assert_eq!(
            ctx.resolve_path(&PathReference::parse_dotted("id")),
            segs(&["d", "id"])
        );
    }

    #[test]
    fn subquery_frames_follow_stack_discipline() {
        let config = QueryConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.push_frame();
        let t1 = ctx.register_subquery(QueryModel::new());
        ctx.push_frame();
        let t2 = ctx.register_subquery(QueryModel::new());
        assert_eq!(ctx.pending_subqueries(), 2);
        let inner = ctx.pop_frame();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].0, t2);
        let outer = ctx.pop_frame();
        assert_eq!(outer[0].0, t1);
        assert_eq!(ctx.pending_subqueries(), 0);
        assert!(RenderContext::is_subquery_token(&t1));
    }
}
