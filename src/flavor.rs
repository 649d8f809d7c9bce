//! Flavor（方言）：控制占位符、LIMIT/OFFSET 与 NULLS 排序的渲染方式。

use crate::string_builder::StringBuilder;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// 目标方言。渲染出的查询文本始终使用命名参数，方言只影响方言相关的子句与最终占位符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    #[default]
    PostgreSQL,
    MySQL,
    SQLite,
    SQLServer,
    Oracle,
}

static DEFAULT_FLAVOR: AtomicU8 = AtomicU8::new(Flavor::PostgreSQL as u8);
static DEFAULT_FLAVOR_LOCK: Mutex<()> = Mutex::new(());

impl Flavor {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::PostgreSQL,
            1 => Self::MySQL,
            2 => Self::SQLite,
            3 => Self::SQLServer,
            4 => Self::Oracle,
            _ => Self::PostgreSQL,
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }
}

/// 获取当前全局默认 Flavor。
pub fn default_flavor() -> Flavor {
    Flavor::from_u8(DEFAULT_FLAVOR.load(Ordering::Relaxed))
}

/// 设置全局默认 Flavor，返回旧值。
pub fn set_default_flavor(flavor: Flavor) -> Flavor {
    let old = DEFAULT_FLAVOR.swap(flavor.to_u8(), Ordering::Relaxed);
    Flavor::from_u8(old)
}

/// 修改全局默认 Flavor 的 RAII guard（会持有一个全局锁，避免并行测试互相干扰）。
pub struct DefaultFlavorGuard {
    _lock: MutexGuard<'static, ()>,
    old: Flavor,
}

impl Drop for DefaultFlavorGuard {
    fn drop(&mut self) {
        set_default_flavor(self.old);
    }
}

/// 在一个作用域内临时设置 DefaultFlavor，并保证退出作用域后自动恢复。
pub fn set_default_flavor_scoped(flavor: Flavor) -> DefaultFlavorGuard {
    let lock = DEFAULT_FLAVOR_LOCK
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let old = set_default_flavor(flavor);
    DefaultFlavorGuard { _lock: lock, old }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
            Self::SQLServer => "SQLServer",
            Self::Oracle => "Oracle",
        };
        f.write_str(s)
    }
}

impl Flavor {
    /// 写入第 `index_1_based` 个位置参数的占位符。
    pub(crate) fn write_placeholder(self, index_1_based: usize, buf: &mut StringBuilder) {
        match self {
            Self::MySQL | Self::SQLite => buf.write_char('?'),
            Self::PostgreSQL => {
                buf.write_char('$');
                buf.write_str(&index_1_based.to_string());
            }
            Self::SQLServer => buf.write_str(&format!("@p{index_1_based}")),
            Self::Oracle => {
                buf.write_char(':');
                buf.write_str(&index_1_based.to_string());
            }
        }
    }

    /// 是否原生支持 `NULLS FIRST` / `NULLS LAST`。
    pub fn supports_null_precedence(self) -> bool {
        matches!(self, Self::PostgreSQL | Self::Oracle | Self::SQLite)
    }

    /// 不写 NULLS 子句时的默认行为：返回 NULL 是否排在前面。
    fn default_nulls_first(self, ascending: bool) -> bool {
        match self {
            Self::MySQL | Self::SQLServer | Self::SQLite => ascending,
            Self::PostgreSQL | Self::Oracle => !ascending,
        }
    }

    /// 渲染一个 ORDER BY 项；不支持 NULLS 子句的方言用 CASE 模拟。
    pub(crate) fn render_order_item(self, expr: &str, ascending: bool, nulls_first: bool) -> String {
        let direction = if ascending { "ASC" } else { "DESC" };
        if self.supports_null_precedence() {
            let nulls = if nulls_first { "FIRST" } else { "LAST" };
            return format!("{expr} {direction} NULLS {nulls}");
        }
        if self.default_nulls_first(ascending) == nulls_first {
            return format!("{expr} {direction}");
        }
        let (null_rank, value_rank) = if nulls_first { (0, 1) } else { (1, 0) };
        format!("CASE WHEN {expr} IS NULL THEN {null_rank} ELSE {value_rank} END, {expr} {direction}")
    }

    /// 按方言写出 LIMIT/OFFSET；`limit`/`offset` 已经是参数占位符。
    pub(crate) fn write_limit_offset(
        self,
        buf: &mut StringBuilder,
        limit: Option<&str>,
        offset: Option<&str>,
        has_order_by: bool,
    ) {
        match self {
            Self::MySQL | Self::SQLite => {
                if let Some(lim) = limit {
                    buf.write_leading("LIMIT");
                    buf.write_str(" ");
                    buf.write_str(lim);
                    if let Some(off) = offset {
                        buf.write_leading("OFFSET");
                        buf.write_str(" ");
                        buf.write_str(off);
                    }
                } else if let Some(off) = offset {
                    // MySQL 不允许单独的 OFFSET
                    buf.write_leading("LIMIT 18446744073709551615 OFFSET");
                    buf.write_str(" ");
                    buf.write_str(off);
                }
            }
            Self::PostgreSQL => {
                if let Some(lim) = limit {
                    buf.write_leading("LIMIT");
                    buf.write_str(" ");
                    buf.write_str(lim);
                }
                if let Some(off) = offset {
                    buf.write_leading("OFFSET");
                    buf.write_str(" ");
                    buf.write_str(off);
                }
            }
            Self::SQLServer | Self::Oracle => {
                if !has_order_by
                    && (limit.is_some() || offset.is_some())
                    && self == Self::SQLServer
                {
                    buf.write_leading("ORDER BY 1");
                }

                if let Some(off) = offset {
                    buf.write_leading("OFFSET");
                    buf.write_str(" ");
                    buf.write_str(off);
                    buf.write_str(" ROWS");
                }

                if let Some(lim) = limit {
                    if offset.is_none() {
                        buf.write_leading("OFFSET 0 ROWS");
                    }
                    buf.write_leading("FETCH NEXT");
                    buf.write_str(" ");
                    buf.write_str(lim);
                    buf.write_str(" ROWS ONLY");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scoped_default_flavor_restores_old_value() {
        // 其它测试依赖默认方言，这里只在锁内切换到同一个值
        let before = default_flavor();
        {
            let _g = set_default_flavor_scoped(Flavor::PostgreSQL);
            assert_eq!(default_flavor(), Flavor::PostgreSQL);
        }
        assert_eq!(default_flavor(), before);
    }

    #[test]
    fn flavor_u8_round_trip() {
        for f in [
            Flavor::PostgreSQL,
            Flavor::MySQL,
            Flavor::SQLite,
            Flavor::SQLServer,
            Flavor::Oracle,
        ] {
            assert_eq!(Flavor::from_u8(f.to_u8()), f);
        }
    }

    #[test]
    fn order_item_native_null_precedence() {
        assert_eq!(
            Flavor::PostgreSQL.render_order_item("d.name", true, false),
            "d.name ASC NULLS LAST"
        );
        assert_eq!(
            Flavor::Oracle.render_order_item("d.id", false, true),
            "d.id DESC NULLS FIRST"
        );
    }

    #[test]
    fn order_item_emulated_null_precedence() {
        assert_eq!(Flavor::MySQL.render_order_item("d.name", true, true), "d.name ASC");
        assert_eq!(
            Flavor::MySQL.render_order_item("d.name", true, false),
            "CASE WHEN d.name IS NULL THEN 1 ELSE 0 END, d.name ASC"
        );
    }

    #[test]
    fn limit_offset_matrix() {
        let cases = [
            (Flavor::PostgreSQL, "LIMIT :l OFFSET :o"),
            (Flavor::MySQL, "LIMIT :l OFFSET :o"),
            (Flavor::SQLServer, "ORDER BY 1 OFFSET :o ROWS FETCH NEXT :l ROWS ONLY"),
            (Flavor::Oracle, "OFFSET :o ROWS FETCH NEXT :l ROWS ONLY"),
        ];
        for (flavor, expected) in cases {
            let mut buf = StringBuilder::new();
            flavor.write_limit_offset(&mut buf, Some(":l"), Some(":o"), false);
            assert_eq!(buf.into_string(), expected, "{flavor}");
        }
    }
}
