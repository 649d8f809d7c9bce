//! 命名窗口：`WINDOW w AS (PARTITION BY ... ORDER BY ... ROWS ...)`。
//!
//! 先选定帧模式（ROWS/RANGE/GROUPS）才能指定边界；边界确定后只剩有限的排除选项。

use crate::builder::{BuilderContext, QueryHolder};
use crate::clause::ClauseType;
use crate::config::QueryConfig;
use crate::error::BuildError;
use crate::expr::Expr;
use crate::model::{FrameBound, FrameExclusion, FrameMode, OrderByItem, WindowDefinition, WindowFrame};
use crate::value::SqlValue;
use std::rc::Rc;

pub struct WindowBuilder<P> {
    parent: P,
    definition: WindowDefinition,
}

impl<P: QueryHolder> WindowBuilder<P> {
    pub(crate) fn new(parent: P, name: String) -> Self {
        Self {
            parent,
            definition: WindowDefinition {
                name,
                partition_by: Vec::new(),
                order_by: Vec::new(),
                frame: None,
            },
        }
    }

    pub fn partition_by(self, expression: &str) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::Window, expression)?;
        Ok(self.partition_by_expr(expr))
    }

    pub fn partition_by_expr(mut self, expr: Expr) -> Self {
        self.definition.partition_by.push(expr);
        self
    }

    pub fn partition_by_all(mut self, expressions: Vec<String>) -> Result<Self, BuildError> {
        for e in &expressions {
            self = self.partition_by(e)?;
        }
        Ok(self)
    }

    pub fn order_by(self, expression: &str, ascending: bool, nulls_first: bool) -> Result<Self, BuildError> {
        let expr = self.parse_expression(ClauseType::Window, expression)?;
        Ok(self.order_by_expr(expr, ascending, nulls_first))
    }

    pub fn order_by_asc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, true, false)
    }

    pub fn order_by_desc(self, expression: &str) -> Result<Self, BuildError> {
        self.order_by(expression, false, false)
    }

    pub fn order_by_expr(mut self, expr: Expr, ascending: bool, nulls_first: bool) -> Self {
        self.definition.order_by.push(OrderByItem {
            expr,
            ascending,
            nulls_first,
        });
        self
    }

    pub fn rows(self) -> WindowFrameBuilder<P> {
        WindowFrameBuilder::new(self, FrameMode::Rows)
    }

    pub fn range(self) -> WindowFrameBuilder<P> {
        WindowFrameBuilder::new(self, FrameMode::Range)
    }

    pub fn groups(self) -> WindowFrameBuilder<P> {
        WindowFrameBuilder::new(self, FrameMode::Groups)
    }

    /// 不带帧子句结束窗口定义。
    pub fn end(mut self) -> P {
        self.parent.query_mut().windows.push(self.definition);
        self.parent
    }

    fn finish(mut self, frame: WindowFrame) -> P {
        self.definition.frame = Some(frame);
        self.end()
    }

    fn bound_expr(&self, expression: &str) -> Result<Expr, BuildError> {
        self.parse_expression(ClauseType::Window, expression)
    }
}

impl<P: QueryHolder> BuilderContext for WindowBuilder<P> {
    fn config(&self) -> &Rc<QueryConfig> {
        self.parent.config()
    }
}

/// 已选定帧模式，等待起始边界。
pub struct WindowFrameBuilder<P> {
    window: WindowBuilder<P>,
    mode: FrameMode,
}

impl<P: QueryHolder> WindowFrameBuilder<P> {
    fn new(window: WindowBuilder<P>, mode: FrameMode) -> Self {
        Self { window, mode }
    }

    fn single(self, start: FrameBound) -> WindowFrameExclusionBuilder<P> {
        WindowFrameExclusionBuilder::new(self.window, self.mode, start, None)
    }

    fn between(self, start: FrameBound) -> WindowFrameBetweenBuilder<P> {
        WindowFrameBetweenBuilder {
            window: self.window,
            mode: self.mode,
            start,
        }
    }

    pub fn unbounded_preceding(self) -> WindowFrameExclusionBuilder<P> {
        self.single(FrameBound::UnboundedPreceding)
    }

    pub fn preceding(self, expression: &str) -> Result<WindowFrameExclusionBuilder<P>, BuildError> {
        let e = self.window.bound_expr(expression)?;
        Ok(self.single(FrameBound::Preceding(e)))
    }

    pub fn preceding_value(self, offset: u64) -> WindowFrameExclusionBuilder<P> {
        self.single(FrameBound::Preceding(Expr::Literal(SqlValue::from(offset))))
    }

    pub fn current_row(self) -> WindowFrameExclusionBuilder<P> {
        self.single(FrameBound::CurrentRow)
    }

    pub fn between_unbounded_preceding(self) -> WindowFrameBetweenBuilder<P> {
        self.between(FrameBound::UnboundedPreceding)
    }

    pub fn between_preceding(self, expression: &str) -> Result<WindowFrameBetweenBuilder<P>, BuildError> {
        let e = self.window.bound_expr(expression)?;
        Ok(self.between(FrameBound::Preceding(e)))
    }

    pub fn between_following(self, expression: &str) -> Result<WindowFrameBetweenBuilder<P>, BuildError> {
        let e = self.window.bound_expr(expression)?;
        Ok(self.between(FrameBound::Following(e)))
    }

    pub fn between_current_row(self) -> WindowFrameBetweenBuilder<P> {
        self.between(FrameBound::CurrentRow)
    }
}

/// `BETWEEN start AND ...`，等待结束边界。
pub struct WindowFrameBetweenBuilder<P> {
    window: WindowBuilder<P>,
    mode: FrameMode,
    start: FrameBound,
}

impl<P: QueryHolder> WindowFrameBetweenBuilder<P> {
    fn close(self, end: FrameBound) -> WindowFrameExclusionBuilder<P> {
        WindowFrameExclusionBuilder::new(self.window, self.mode, self.start, Some(end))
    }

    pub fn and_unbounded_following(self) -> WindowFrameExclusionBuilder<P> {
        self.close(FrameBound::UnboundedFollowing)
    }

    pub fn and_preceding(self, expression: &str) -> Result<WindowFrameExclusionBuilder<P>, BuildError> {
        let e = self.window.bound_expr(expression)?;
        Ok(self.close(FrameBound::Preceding(e)))
    }

    pub fn and_following(self, expression: &str) -> Result<WindowFrameExclusionBuilder<P>, BuildError> {
        let e = self.window.bound_expr(expression)?;
        Ok(self.close(FrameBound::Following(e)))
    }

    pub fn and_following_value(self, offset: u64) -> WindowFrameExclusionBuilder<P> {
        self.close(FrameBound::Following(Expr::Literal(SqlValue::from(offset))))
    }

    pub fn and_current_row(self) -> WindowFrameExclusionBuilder<P> {
        self.close(FrameBound::CurrentRow)
    }
}

/// 帧边界已确定，只剩排除选项。
pub struct WindowFrameExclusionBuilder<P> {
    window: WindowBuilder<P>,
    mode: FrameMode,
    start: FrameBound,
    end: Option<FrameBound>,
}

impl<P: QueryHolder> WindowFrameExclusionBuilder<P> {
    fn new(window: WindowBuilder<P>, mode: FrameMode, start: FrameBound, end: Option<FrameBound>) -> Self {
        Self {
            window,
            mode,
            start,
            end,
        }
    }

    fn finish(self, exclusion: Option<FrameExclusion>) -> P {
        let frame = WindowFrame {
            mode: self.mode,
            start: self.start,
            end: self.end,
            exclusion,
        };
        self.window.finish(frame)
    }

    pub fn exclude_no_others(self) -> P {
        self.finish(Some(FrameExclusion::NoOthers))
    }

    pub fn exclude_current_row(self) -> P {
        self.finish(Some(FrameExclusion::CurrentRow))
    }

    pub fn exclude_group(self) -> P {
        self.finish(Some(FrameExclusion::Group))
    }

    pub fn exclude_ties(self) -> P {
        self.finish(Some(FrameExclusion::Ties))
    }

    /// 不带排除子句。
    pub fn end(self) -> P {
        self.finish(None)
    }
}
