//! 参数登记与位置占位符编译。
//!
//! 渲染期所有值都以命名记号出现在查询文本里：字面量登记为隐式参数 `:param_N`，
//! 调用方的显式参数保持 `:name`。执行前可用 [`RenderedQuery::compile_with_flavor`]
//! 把命名记号换成方言的位置占位符。

use crate::flavor::Flavor;
use crate::keyset::KEYSET_PARAMETER_PREFIX;
use crate::parser::is_identifier;
use crate::string_builder::StringBuilder;
use crate::value::{ParameterType, SqlValue};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("parameter `:{0}` has no bound value")]
    UnboundParameter(String),
}

pub(crate) const IMPLICIT_PREFIX: &str = "param";

/// 形如 `param_N` / `keyset_N` 的名字只由注册表生成，调用方不能使用。
pub(crate) fn is_generated_name(name: &str) -> bool {
    [IMPLICIT_PREFIX, KEYSET_PARAMETER_PREFIX].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// 单次渲染的参数表：显式名称 + 隐式字面量绑定。
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    counters: HashMap<&'static str, usize>,
    generated: HashSet<String>,
    bindings: BTreeMap<String, SqlValue>,
    types: Vec<(String, ParameterType)>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个字面量，返回文本记号（`:param_N`）。
    pub fn add_literal(&mut self, value: SqlValue) -> String {
        self.add_prefixed(IMPLICIT_PREFIX, value)
    }

    /// 以 `{prefix}_N` 命名登记一个生成参数。
    pub fn add_prefixed(&mut self, prefix: &'static str, value: SqlValue) -> String {
        let name = loop {
            let n = self.counters.entry(prefix).or_insert(0);
            let name = format!("{prefix}_{n}");
            *n += 1;
            if !self.is_registered(&name) && !self.bindings.contains_key(&name) {
                break name;
            }
        };
        let ty = value.parameter_type();
        self.bindings.insert(name.clone(), value);
        self.declare(&name, ty);
        self.generated.insert(name.clone());
        format!(":{name}")
    }

    /// 登记一个显式参数名；值可以稍后绑定，也可以在执行前由调用方提供。
    pub fn register_explicit(&mut self, name: &str) -> String {
        self.declare(name, ParameterType::Unknown);
        format!(":{name}")
    }

    pub fn bind_explicit(&mut self, name: &str, value: SqlValue) {
        let ty = value.parameter_type();
        self.bindings.insert(name.to_string(), value);
        self.set_type(name, ty);
    }

    /// 调用方声明的类型优先于从值推断的类型。
    pub fn declare_type(&mut self, name: &str, ty: ParameterType) {
        if let Some(slot) = self.types.iter_mut().find(|(n, _)| n == name) {
            slot.1 = ty;
        } else {
            self.types.push((name.to_string(), ty));
        }
    }

    /// 该名字由本注册表生成。
    pub fn is_generated(&self, name: &str) -> bool {
        self.generated.contains(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.iter().any(|(n, _)| n == name)
    }

    pub(crate) fn into_rendered(self, sql: String) -> RenderedQuery {
        RenderedQuery {
            sql,
            bindings: self.bindings,
            parameter_types: self.types,
        }
    }

    fn declare(&mut self, name: &str, ty: ParameterType) {
        if !self.is_registered(name) {
            self.types.push((name.to_string(), ty));
        }
    }

    fn set_type(&mut self, name: &str, ty: ParameterType) {
        match self.types.iter_mut().find(|(n, _)| n == name) {
            Some(slot) if slot.1 == ParameterType::Unknown => slot.1 = ty,
            Some(_) => {}
            None => self.types.push((name.to_string(), ty)),
        }
    }
}

/// 渲染结果：带命名记号的查询文本、绑定值，以及按登记顺序排列的参数类型。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub bindings: BTreeMap<String, SqlValue>,
    pub parameter_types: Vec<(String, ParameterType)>,
}

impl RenderedQuery {
    /// 绑定（或覆盖）一个命名参数的值。
    pub fn bind(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.bindings.insert(name.to_string(), value.into());
        self
    }

    /// 没有值的参数名，按登记顺序。
    pub fn unbound_parameters(&self) -> Vec<&str> {
        self.parameter_types
            .iter()
            .filter(|(n, _)| !self.bindings.contains_key(n))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// 把 `:name` 记号换成 `flavor` 的位置占位符，返回 SQL 与按位置排列的值。
    ///
    /// `::` 类型转换与字符串字面量内的冒号原样保留。编号占位符的方言中，
    /// 同名参数复用同一个编号；`?` 方言每次出现都追加一个值。
    pub fn compile_with_flavor(&self, flavor: Flavor) -> Result<(String, Vec<SqlValue>), CompileError> {
        let mut ctx = CompileContext {
            buf: StringBuilder::new(),
            flavor,
            values: Vec::new(),
            positions: HashMap::new(),
        };

        let mut rest = self.sql.as_str();
        while let Some(pos) = rest.find([':', '\'']) {
            ctx.buf.write_str(&rest[..pos]);
            rest = &rest[pos..];

            if rest.starts_with('\'') {
                let end = rest[1..].find('\'').map(|i| i + 2).unwrap_or(rest.len());
                ctx.buf.write_str(&rest[..end]);
                rest = &rest[end..];
                continue;
            }

            if rest.starts_with("::") {
                ctx.buf.write_str("::");
                rest = &rest[2..];
                continue;
            }

            let name_len = rest[1..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len() - 1);
            let name = &rest[1..1 + name_len];
            if !is_identifier(name) {
                ctx.buf.write_char(':');
                rest = &rest[1..];
                continue;
            }

            let value = self
                .bindings
                .get(name)
                .ok_or_else(|| CompileError::UnboundParameter(name.to_string()))?;
            ctx.write_placeholder_and_push(name, value);
            rest = &rest[1 + name_len..];
        }
        ctx.buf.write_str(rest);

        Ok((ctx.buf.into_string(), ctx.values))
    }
}

#[derive(Debug)]
struct CompileContext<'a> {
    buf: StringBuilder,
    flavor: Flavor,
    values: Vec<SqlValue>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> CompileContext<'a> {
    fn write_placeholder_and_push(&mut self, name: &'a str, value: &SqlValue) {
        let numbered = !matches!(self.flavor, Flavor::MySQL | Flavor::SQLite);
        if numbered && let Some(&idx) = self.positions.get(name) {
            self.flavor.write_placeholder(idx, &mut self.buf);
            return;
        }
        self.values.push(value.clone());
        let idx = self.values.len();
        self.positions.insert(name, idx);
        self.flavor.write_placeholder(idx, &mut self.buf);
    }
}
