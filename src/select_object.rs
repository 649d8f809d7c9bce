//! `SELECT NEW constructor(a, b, ...)` 的参数收集。

use crate::builder::{BuilderContext, QueryHolder};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::model::SelectItem;
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct SelectObjectBuilder<P> {
    parent: P,
    constructor: String,
    args: BTreeMap<usize, Expr>,
}

impl<P: QueryHolder> SelectObjectBuilder<P> {
    pub(crate) fn new(parent: P, constructor: String) -> Self {
        Self {
            parent,
            constructor,
            args: BTreeMap::new(),
        }
    }

    /// 追加到当前最后一个位置之后。
    pub fn with(self, expression: &str) -> Result<Self, BuildError> {
        let expr = self.parent.parse_expression(ClauseType::Select, expression)?;
        Ok(self.with_expr(expr))
    }

    pub fn with_expr(mut self, expr: Expr) -> Self {
        let position = self.args.keys().next_back().map_or(0, |p| p + 1);
        self.args.insert(position, expr);
        self
    }

    /// 放到指定的参数位置（从 0 开始）；位置已被占用是构建错误。
    pub fn with_at(mut self, position: usize, expression: &str) -> Result<Self, BuildError> {
        if self.args.contains_key(&position) {
            return Err(BuildError::DuplicateSelectPosition {
                constructor: self.constructor,
                position,
            });
        }
        let expr = self.parent.parse_expression(ClauseType::Select, expression)?;
        self.args.insert(position, expr);
        Ok(self)
    }

    pub fn end(mut self) -> P {
        self.parent.query_mut().selection.push(SelectItem::Object {
            constructor: self.constructor,
            args: self.args.into_values().collect(),
        });
        self.parent
    }
}

impl<P: QueryHolder> BuilderContext for SelectObjectBuilder<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}
