//! 子句类型：用于错误上下文、谓词归属以及谓词分组的方法命名。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseType {
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Window,
    OrderBy,
    CaseWhen,
    Cte,
    SetOperation,
    Keyset,
    Pagination,
    Parameter,
}

impl ClauseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Join => "JOIN",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::Window => "WINDOW",
            Self::OrderBy => "ORDER BY",
            Self::CaseWhen => "CASE WHEN",
            Self::Cte => "WITH",
            Self::SetOperation => "SET OPERATION",
            Self::Keyset => "KEYSET",
            Self::Pagination => "PAGINATION",
            Self::Parameter => "PARAMETER",
        }
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
