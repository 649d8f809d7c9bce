//! 参数值类型：字面量一律作为参数绑定，不会拼进查询文本。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// 查询参数值。
///
/// 序列化形态是外部标签（`{"i64": 3}`），这样 keyset 元组反序列化后仍能保留原始类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    DateTime(#[serde(with = "time::serde::rfc3339")] time::OffsetDateTime),
}

/// 参数声明类型，供执行引擎做类型注册。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// 只有 NULL 或尚未绑定值时无法推断。
    Unknown,
    Boolean,
    Integer,
    UnsignedInteger,
    Float,
    Text,
    Binary,
    Timestamp,
}

impl SqlValue {
    /// 将 `Option<T>` 映射为 `SqlValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<SqlValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Null => ParameterType::Unknown,
            Self::Bool(_) => ParameterType::Boolean,
            Self::I64(_) => ParameterType::Integer,
            Self::U64(_) => ParameterType::UnsignedInteger,
            Self::F64(_) => ParameterType::Float,
            Self::String(_) => ParameterType::Text,
            Self::Bytes(_) => ParameterType::Binary,
            Self::DateTime(_) => ParameterType::Timestamp,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "'{v}'"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::DateTime(v) => write!(f, "{v}"),
        }
    }
}

impl From<()> for SqlValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for SqlValue {
    fn from(v: i8) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u8> for SqlValue {
    fn from(v: u8) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u16> for SqlValue {
    fn from(v: u16) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::F64(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for SqlValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<time::OffsetDateTime> for SqlValue {
    fn from(v: time::OffsetDateTime) -> Self {
        Self::DateTime(v)
    }
}

#[cfg(test)]
mod tests {
    use super::{ParameterType, SqlValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn from_option_some() {
        assert_eq!(SqlValue::from_option(Some(123_i64)), SqlValue::I64(123));
    }

    #[test]
    fn from_option_none() {
        assert_eq!(SqlValue::from_option::<i64>(None), SqlValue::Null);
    }

    #[test]
    fn parameter_type_follows_value_kind() {
        assert_eq!(SqlValue::from("x").parameter_type(), ParameterType::Text);
        assert_eq!(SqlValue::from(7_u32).parameter_type(), ParameterType::UnsignedInteger);
        assert_eq!(SqlValue::Null.parameter_type(), ParameterType::Unknown);
    }

    #[test]
    fn serde_keeps_value_kind() {
        let json = serde_json::to_string(&SqlValue::I64(42)).unwrap();
        assert_eq!(json, r#"{"i64":42}"#);
        let back: SqlValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SqlValue::I64(42));

        let null: SqlValue = serde_json::from_str(r#""null""#).unwrap();
        assert_eq!(null, SqlValue::Null);
    }

    #[test]
    fn serde_datetime_is_rfc3339() {
        let v = SqlValue::from(time::macros::datetime!(2024-03-01 10:00 UTC));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"date_time":"2024-03-01T10:00:00Z"}"#);
        let back: SqlValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
