//! 表达式/谓词树。纯数据，不含任何渲染逻辑；相等性按结构比较。

use crate::model::QueryModel;
use crate::value::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// 子查询右值的量词。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    All,
    Any,
}

impl Quantifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    And,
    Or,
}

impl BooleanOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// 空连接的恒等谓词：AND 为真，OR 为假。
    pub fn identity(self) -> &'static str {
        match self {
            Self::And => "1 = 1",
            Self::Or => "1 = 0",
        }
    }
}

/// 以点分隔的成员链，例如 `d.owner.name`。首段是否为别名在渲染时按作用域解析。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathReference {
    pub segments: Vec<String>,
}

impl PathReference {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// 按 `.` 切分，不做任何校验；语法检查属于 [`crate::parser`]。
    pub fn parse_dotted(path: &str) -> Self {
        Self {
            segments: path.split('.').map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    List(Vec<Expr>),
    Subquery(Box<QueryModel>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    /// 搜索式 CASE 中是条件；简单 CASE 中是与 operand 比较的值。
    pub condition: Expr,
    pub result: Expr,
}

/// 多子查询模板中登记的一个子查询。
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSubquery {
    pub alias: String,
    pub query: QueryModel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(SqlValue),
    Path(PathReference),
    /// 显式命名参数 `:name`。
    Parameter(String),
    /// 调用方提供、原样输出的表达式文本。
    Raw(String),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Comparison {
        op: ComparisonOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        quantifier: Option<Quantifier>,
    },
    Between {
        expr: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        values: InValues,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<char>,
        case_sensitive: bool,
        negated: bool,
    },
    NullCheck {
        expr: Box<Expr>,
        negated: bool,
    },
    EmptyCheck {
        expr: Box<Expr>,
        negated: bool,
    },
    MemberOf {
        expr: Box<Expr>,
        collection: Box<Expr>,
        negated: bool,
    },
    Exists {
        subquery: Box<QueryModel>,
        negated: bool,
    },
    Connective {
        op: BooleanOperator,
        children: Vec<Expr>,
    },
    Not(Box<Expr>),
    CaseWhen {
        operand: Option<Box<Expr>>,
        branches: Vec<CaseBranch>,
        otherwise: Option<Box<Expr>>,
    },
    /// 延迟渲染的子查询；渲染时先输出占位别名，父表达式完成后再回填。
    Subquery(Box<QueryModel>),
    /// 含有多个子查询别名的表达式模板。
    Composite {
        template: String,
        subqueries: Vec<NamedSubquery>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<SqlValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn path(dotted: &str) -> Self {
        Self::Path(PathReference::parse_dotted(dotted))
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    pub fn and(children: Vec<Expr>) -> Self {
        Self::Connective {
            op: BooleanOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<Expr>) -> Self {
        Self::Connective {
            op: BooleanOperator::Or,
            children,
        }
    }

    pub(crate) fn compare(op: ComparisonOperator, left: Expr, right: Expr) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
            quantifier: None,
        }
    }

    pub(crate) fn is_null_check(expr: Expr, negated: bool) -> Self {
        Self::NullCheck {
            expr: Box::new(expr),
            negated,
        }
    }

    /// 取反：带 `negated` 标志的叶子谓词翻转标志，`Not` 解包，其余整体包一层 `Not`。
    pub fn negated(self) -> Self {
        match self {
            Self::Between {
                expr,
                lower,
                upper,
                negated,
            } => Self::Between {
                expr,
                lower,
                upper,
                negated: !negated,
            },
            Self::In {
                expr,
                values,
                negated,
            } => Self::In {
                expr,
                values,
                negated: !negated,
            },
            Self::Like {
                expr,
                pattern,
                escape,
                case_sensitive,
                negated,
            } => Self::Like {
                expr,
                pattern,
                escape,
                case_sensitive,
                negated: !negated,
            },
            Self::NullCheck { expr, negated } => Self::NullCheck {
                expr,
                negated: !negated,
            },
            Self::EmptyCheck { expr, negated } => Self::EmptyCheck {
                expr,
                negated: !negated,
            },
            Self::MemberOf {
                expr,
                collection,
                negated,
            } => Self::MemberOf {
                expr,
                collection,
                negated: !negated,
            },
            Self::Exists { subquery, negated } => Self::Exists {
                subquery,
                negated: !negated,
            },
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// 是否是带多个子节点的连接，渲染为子节点时需要加括号。
    pub(crate) fn needs_grouping(&self) -> bool {
        matches!(self, Self::Connective { children, .. } if children.len() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn negated_flips_leaf_flag() {
        let between = Expr::Between {
            expr: Box::new(Expr::path("d.age")),
            lower: Box::new(Expr::literal(5)),
            upper: Box::new(Expr::literal(10)),
            negated: false,
        };
        let flipped = between.clone().negated();
        assert!(matches!(flipped, Expr::Between { negated: true, .. }));
        assert_eq!(flipped.negated(), between);
    }

    #[test]
    fn negated_wraps_connective_and_unwraps_not() {
        let or = Expr::or(vec![Expr::path("a"), Expr::path("b")]);
        let not = or.clone().negated();
        assert_eq!(not, Expr::Not(Box::new(or.clone())));
        assert_eq!(not.negated(), or);
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Expr::path("d.owner.name"), Expr::path("d.owner.name"));
        assert_ne!(Expr::literal(1), Expr::literal(1_u64));
    }

    #[test]
    fn path_dotted_round_trip() {
        let p = PathReference::parse_dotted("d.owner.name");
        assert_eq!(p.segments, vec!["d", "owner", "name"]);
        assert_eq!(p.dotted(), "d.owner.name");
    }
}
