//! CTE 登记：`WITH name(cols) AS (...)` 与 `WITH RECURSIVE`。
//!
//! 列通过 `bind(column, expression)` 声明，声明顺序即 CTE 的列顺序。
//! 递归 CTE 分两段：[`RecursiveCteBuilder`] 构建非递归分支，只有它提供
//! `union()` / `union_all()`；之后的 [`RecursiveCteRecursiveBuilder`] 构建递归分支。

use crate::builder::{BuilderContext, PredicateReceiver, QueryHolder, push_clause_predicate, require_name};
use crate::capability::{HasFrom, HasGroupBy, HasLimit, HasOrderBy, HasWhere};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::model::{CteBody, CteDefinition, QueryModel, SelectItem, SetOperator};
use std::rc::Rc;

/// CTE 主体：查询模型 + 已绑定的列名。
struct Binding {
    name: String,
    query: QueryModel,
    columns: Vec<String>,
}

impl Binding {
    fn new(name: String) -> Self {
        Self {
            name,
            query: QueryModel::new(),
            columns: Vec::new(),
        }
    }

    fn bind(&mut self, column: &str, expr: Expr) -> Result<(), BuildError> {
        let column = require_name(ClauseType::Cte, "column", column)?;
        if self.columns.contains(&column) {
            return Err(BuildError::DuplicateCteBinding {
                name: self.name.clone(),
                column,
            });
        }
        self.query.selection.push(SelectItem::Expression { expr, alias: None });
        self.columns.push(column);
        Ok(())
    }

    fn require_bindings(&self) -> Result<(), BuildError> {
        if self.columns.is_empty() {
            return Err(BuildError::empty(ClauseType::Cte, "column binding"));
        }
        Ok(())
    }
}

macro_rules! cte_body_impls {
    ($ty:ident, $($field:ident).+) => {
        impl<P: QueryHolder> $ty<P> {
            /// 把 `expression` 绑定到 CTE 列 `column`。
            pub fn bind(self, column: &str, expression: &str) -> Result<Self, BuildError> {
                let expr = self.parse_expression(ClauseType::Cte, expression)?;
                self.bind_expr(column, expr)
            }

            pub fn bind_expr(mut self, column: &str, expr: Expr) -> Result<Self, BuildError> {
                self.$($field).+.bind(column, expr)?;
                Ok(self)
            }
        }

        impl<P: QueryHolder> BuilderContext for $ty<P> {
            fn config(&self) -> &Rc<QueryConfig> {
                self.parent.config()
            }
        }

        impl<P: QueryHolder> QueryHolder for $ty<P> {
            fn query(&self) -> &QueryModel {
                &self.$($field).+.query
            }

            fn query_mut(&mut self) -> &mut QueryModel {
                &mut self.$($field).+.query
            }
        }

        impl<P: QueryHolder> PredicateReceiver for $ty<P> {
            fn add_predicate(&mut self, clause: ClauseType, predicate: Expr) {
                push_clause_predicate(&mut self.$($field).+.query, clause, predicate);
            }
        }

        impl<P: QueryHolder> HasFrom for $ty<P> {}
        impl<P: QueryHolder> HasWhere for $ty<P> {}
        impl<P: QueryHolder> HasGroupBy for $ty<P> {}
        impl<P: QueryHolder> HasOrderBy for $ty<P> {}
        impl<P: QueryHolder> HasLimit for $ty<P> {}
    };
}

pub struct CteBuilder<P> {
    parent: P,
    body: Binding,
    inlined: bool,
}

impl<P: QueryHolder> CteBuilder<P> {
    pub(crate) fn new(parent: P, name: String, inlined: bool) -> Self {
        Self {
            parent,
            body: Binding::new(name),
            inlined,
        }
    }

    /// 登记 CTE 并回到父查询。
    pub fn end(mut self) -> Result<P, BuildError> {
        self.body.require_bindings()?;
        let Binding {
            name,
            query,
            columns,
        } = self.body;
        tracing::debug!(cte = %name, columns = columns.len(), inlined = self.inlined, "registered CTE");
        self.parent.query_mut().ctes.push(CteDefinition {
            name,
            columns,
            inlined: self.inlined,
            body: CteBody::Query(Box::new(query)),
        });
        Ok(self.parent)
    }
}

cte_body_impls!(CteBuilder, body);

/// 递归 CTE 的非递归分支。
pub struct RecursiveCteBuilder<P> {
    parent: P,
    base: Binding,
}

impl<P: QueryHolder> RecursiveCteBuilder<P> {
    pub(crate) fn new(parent: P, name: String) -> Self {
        Self {
            parent,
            base: Binding::new(name),
        }
    }

    pub fn union(self) -> Result<RecursiveCteRecursiveBuilder<P>, BuildError> {
        self.connect(SetOperator::Union)
    }

    pub fn union_all(self) -> Result<RecursiveCteRecursiveBuilder<P>, BuildError> {
        self.connect(SetOperator::UnionAll)
    }

    fn connect(self, connector: SetOperator) -> Result<RecursiveCteRecursiveBuilder<P>, BuildError> {
        self.base.require_bindings()?;
        let recursive = Binding::new(self.base.name.clone());
        Ok(RecursiveCteRecursiveBuilder {
            parent: self.parent,
            base: self.base,
            connector,
            recursive,
        })
    }
}

cte_body_impls!(RecursiveCteBuilder, base);

/// 递归 CTE 的递归分支；通常 FROM 自身名称。
pub struct RecursiveCteRecursiveBuilder<P> {
    parent: P,
    base: Binding,
    connector: SetOperator,
    recursive: Binding,
}

impl<P: QueryHolder> RecursiveCteRecursiveBuilder<P> {
    /// 递归分支必须绑定与非递归分支相同的列；选择项按非递归分支的列顺序重排。
    pub fn end(mut self) -> Result<P, BuildError> {
        let Binding {
            name,
            query: base,
            columns,
        } = self.base;
        let Binding {
            query: mut recursive,
            columns: recursive_columns,
            ..
        } = self.recursive;

        let mismatch = || BuildError::CteBindingMismatch {
            name: name.clone(),
            declared: columns.len(),
            bound: recursive_columns.len(),
        };
        if recursive_columns.len() != columns.len() {
            return Err(mismatch());
        }
        let mut selection = Vec::with_capacity(columns.len());
        for column in &columns {
            let idx = recursive_columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(mismatch)?;
            let item = recursive.selection.get(idx).ok_or_else(mismatch)?;
            selection.push(item.clone());
        }
        recursive.selection = selection;

        tracing::debug!(cte = %name, connector = self.connector.as_str(), "registered recursive CTE");
        self.parent.query_mut().ctes.push(CteDefinition {
            name,
            columns,
            inlined: false,
            body: CteBody::Recursive {
                base: Box::new(base),
                connector: self.connector,
                recursive: Box::new(recursive),
            },
        });
        Ok(self.parent)
    }
}

cte_body_impls!(RecursiveCteRecursiveBuilder, recursive);
