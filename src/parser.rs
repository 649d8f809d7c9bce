//! 文本表达式解析器接口与一个只认识简单形式的默认实现。
//!
//! 完整的表达式语法属于外部协作方；默认实现只把路径、命名参数与字面量解析成结构化节点，
//! 其余文本在括号与引号配平的前提下原样保留为 [`Expr::Raw`]。

use crate::args::is_generated_name;
use crate::expr::{Expr, PathReference};
use crate::value::SqlValue;
use dyn_clone::DynClone;
use std::fmt;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unbalanced parenthesis at byte {0}")]
    UnbalancedParenthesis(usize),
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),
    #[error("invalid parameter name `{0}`")]
    InvalidParameterName(String),
    #[error("parameter name `{0}` is reserved for generated parameters")]
    ReservedParameterName(String),
}

/// 把调用方的表达式文本变成表达式节点。
pub trait ExpressionParser: DynClone + fmt::Debug {
    fn parse(&self, text: &str) -> Result<Expr, ParseError>;
}

dyn_clone::clone_trait_object!(ExpressionParser);

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleExpressionParser;

impl ExpressionParser for SimpleExpressionParser {
    fn parse(&self, text: &str) -> Result<Expr, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        check_balanced(text)?;
        parse_term(text)
    }
}

fn parse_term(text: &str) -> Result<Expr, ParseError> {
    if let Some(name) = text.strip_prefix(':') {
        if !is_identifier(name) {
            return Err(ParseError::InvalidParameterName(name.to_string()));
        }
        if is_generated_name(name) {
            return Err(ParseError::ReservedParameterName(name.to_string()));
        }
        return Ok(Expr::Parameter(name.to_string()));
    }

    if let Some(v) = parse_literal(text) {
        return Ok(Expr::Literal(v));
    }

    if is_path(text) {
        return Ok(Expr::Path(PathReference::parse_dotted(text)));
    }

    if let Some((name, args)) = split_function_call(text) {
        let mut parsed = Vec::with_capacity(args.len());
        for a in args {
            let a = a.trim();
            if a.is_empty() {
                return Ok(Expr::Raw(text.to_string()));
            }
            parsed.push(parse_term(a)?);
        }
        return Ok(Expr::Function {
            name: name.to_string(),
            args: parsed,
        });
    }

    Ok(Expr::Raw(text.to_string()))
}

fn parse_literal(text: &str) -> Option<SqlValue> {
    if text.eq_ignore_ascii_case("NULL") {
        return Some(SqlValue::Null);
    }
    if text.eq_ignore_ascii_case("TRUE") {
        return Some(SqlValue::Bool(true));
    }
    if text.eq_ignore_ascii_case("FALSE") {
        return Some(SqlValue::Bool(false));
    }
    if let Some(inner) = text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        // 只接受整体就是一个字符串字面量的情况
        if !inner.replace("''", "").contains('\'') {
            return Some(SqlValue::from(inner.replace("''", "'")));
        }
        return None;
    }
    let first = text.as_bytes()[0];
    if first.is_ascii_digit() || (first == b'-' && text.len() > 1) {
        if let Ok(v) = text.parse::<i64>() {
            return Some(SqlValue::I64(v));
        }
        if let Ok(v) = text.parse::<u64>() {
            return Some(SqlValue::U64(v));
        }
        if text.contains('.') && !text.ends_with('.') {
            if let Ok(v) = text.parse::<f64>() {
                return Some(SqlValue::F64(v));
            }
        }
    }
    None
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_path(s: &str) -> bool {
    s.split('.').all(is_identifier)
}

/// `NAME(a, b)` 形式拆出函数名和顶层参数；嵌套括号与字符串中的逗号不参与拆分。
fn split_function_call(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('(')?;
    let name = text[..open].trim();
    if !is_identifier(name) || !text.ends_with(')') {
        return None;
    }
    let body = &text[open + 1..text.len() - 1];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0usize;
    let mut args = Vec::new();
    for (i, c) in body.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                // 形如 `f(a) + g(b)`：第一个括号在末尾之前已经闭合
                if depth < 0 {
                    return None;
                }
            }
            ',' if !in_string && depth == 0 => {
                args.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if body.trim().is_empty() {
        return Some((name, Vec::new()));
    }
    args.push(&body[start..]);
    Some((name, args))
}

fn check_balanced(text: &str) -> Result<(), ParseError> {
    let mut stack = Vec::new();
    let mut string_start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if string_start.is_some() {
            if c == '\'' {
                string_start = None;
            }
            continue;
        }
        match c {
            '\'' => string_start = Some(i),
            '(' => stack.push(i),
            ')' => {
                if stack.pop().is_none() {
                    return Err(ParseError::UnbalancedParenthesis(i));
                }
            }
            _ => {}
        }
    }
    if let Some(start) = string_start {
        return Err(ParseError::UnterminatedString(start));
    }
    if let Some(open) = stack.pop() {
        return Err(ParseError::UnbalancedParenthesis(open));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Result<Expr, ParseError> {
        SimpleExpressionParser.parse(s)
    }

    #[test]
    fn parses_paths_parameters_and_literals() {
        assert_eq!(parse("d.owner.name").unwrap(), Expr::path("d.owner.name"));
        assert_eq!(parse(":minAge").unwrap(), Expr::parameter("minAge"));
        assert_eq!(parse("42").unwrap(), Expr::literal(42_i64));
        assert_eq!(parse("-1.5").unwrap(), Expr::literal(-1.5_f64));
        assert_eq!(parse("'it''s'").unwrap(), Expr::literal("it's"));
        assert_eq!(parse("null").unwrap(), Expr::Literal(SqlValue::Null));
    }

    #[test]
    fn parses_simple_function_calls() {
        assert_eq!(
            parse("UPPER(d.name)").unwrap(),
            Expr::Function {
                name: "UPPER".into(),
                args: vec![Expr::path("d.name")],
            }
        );
        assert_eq!(
            parse("COALESCE(d.age, 0)").unwrap(),
            Expr::Function {
                name: "COALESCE".into(),
                args: vec![Expr::path("d.age"), Expr::literal(0_i64)],
            }
        );
    }

    #[test]
    fn keeps_other_text_raw() {
        assert_eq!(parse("d.age + 1").unwrap(), Expr::raw("d.age + 1"));
        assert_eq!(parse("f(a) + g(b)").unwrap(), Expr::raw("f(a) + g(b)"));
    }

    #[test]
    fn reports_syntax_errors() {
        assert_eq!(parse("  "), Err(ParseError::Empty));
        assert_eq!(parse("f(a"), Err(ParseError::UnbalancedParenthesis(1)));
        assert_eq!(parse("a)"), Err(ParseError::UnbalancedParenthesis(1)));
        assert_eq!(parse("'abc"), Err(ParseError::UnterminatedString(0)));
        assert_eq!(
            parse(":keyset_0"),
            Err(ParseError::ReservedParameterName("keyset_0".into()))
        );
        assert_eq!(
            parse(":1x"),
            Err(ParseError::InvalidParameterName("1x".into()))
        );
    }
}
