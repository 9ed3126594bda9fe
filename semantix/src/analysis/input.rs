//! Input bindings: `name = literal` lines

use crate::ast::Language;
use crate::error::SyntaxError;
use crate::interp::Value;
use crate::parser::parse_expression;
use num_traits::{Signed, ToPrimitive};

/// Parse the input text into `(name, value)` pairs in order of appearance.
///
/// Blank lines and lines starting with `#` or `//` are skipped. Values use
/// the literal subset of `language`'s expression grammar; errors point at
/// the offending input line.
pub fn parse_inputs(text: &str, language: Language) -> Result<Vec<(String, Value)>, SyntaxError> {
    let mut bindings: Vec<(String, Value)> = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i as u32 + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }
        let Some(split) = trimmed.find(['=', ':']) else {
            return Err(SyntaxError::on_line(
                format!("expected `name = value`, found `{trimmed}`"),
                line,
            ));
        };
        let name = trimmed[..split].trim();
        if !is_identifier(name) {
            return Err(SyntaxError::on_line(
                format!("`{name}` is not a valid input name"),
                line,
            ));
        }
        let literal = trimmed[split + 1..].trim().trim_end_matches(';');
        let expr = parse_expression(literal, language)
            .map_err(|e| SyntaxError::on_line(e.message, line))?;
        let value = Value::from_literal(&expr.node).ok_or_else(|| {
            SyntaxError::on_line(format!("`{literal}` is not a constant"), line)
        })?;
        match bindings.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => bindings.push((name.to_string(), value)),
        }
    }
    log::debug!("parsed {} input binding(s)", bindings.len());
    Ok(bindings)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// The size parameter of a run: the largest array or string length or
/// non-negative integer among the bindings
pub fn input_size(inputs: &[(String, Value)]) -> u64 {
    inputs
        .iter()
        .filter_map(|(_, value)| match value {
            Value::Int(n) if !n.is_negative() => n.to_u64(),
            Value::Array(items) => Some(items.borrow().len() as u64),
            Value::Str(s) => Some(s.chars().count() as u64),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}
