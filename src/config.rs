//! 每个查询的渲染配置。

use crate::flavor::{Flavor, default_flavor};
use crate::parser::{ExpressionParser, SimpleExpressionParser};

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub flavor: Flavor,
    /// 为 true 时，`with_inline` 登记的 CTE 渲染为 FROM 子查询。
    pub inline_ctes: bool,
    /// keyset 谓词使用 `(a <= :k AND (a < :k OR ...))` 形式。
    pub optimized_keyset_predicate: bool,
    pub parser: Box<dyn ExpressionParser>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            flavor: default_flavor(),
            inline_ctes: true,
            optimized_keyset_predicate: false,
            parser: Box::new(SimpleExpressionParser),
        }
    }
}

impl QueryConfig {
    pub fn with_flavor(flavor: Flavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }

    pub fn inline_ctes(mut self, enabled: bool) -> Self {
        self.inline_ctes = enabled;
        self
    }

    pub fn optimized_keyset_predicate(mut self, enabled: bool) -> Self {
        self.optimized_keyset_predicate = enabled;
        self
    }

    pub fn parser(mut self, parser: impl ExpressionParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }
}
