//! Guard conditions and arithmetic on plain numbers
//!
//! Both work on text whose variables have already been substituted.
//! Division only happens inside parentheses, so `16px/1.5` stays as
//! written.

use std::fmt;

use crate::error::{RenderError, RenderResult};
use crate::render::parse::split_top_level;
use crate::render::scope::unquote;

/// Named colors recognised by `iscolor()`
const COLOR_KEYWORDS: &[&str] = &[
    "aqua", "black", "blue", "fuchsia", "gray", "green", "grey", "lime", "maroon", "navy", "olive", "orange",
    "purple", "red", "silver", "teal", "transparent", "white", "yellow",
];

/// A number with an optional unit, e.g. `10px`, `50%`, `-2`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Dimension<'a> {
    value: f64,
    unit: &'a str,
}

impl fmt::Display for Dimension<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.value == 0.0 { 0.0 } else { self.value };
        if value.fract() == 0.0 && value.abs() < 1e15 {
            return write!(f, "{}{}", value as i64, self.unit);
        }
        let text = format!("{:.8}", value);
        write!(f, "{}{}", text.trim_end_matches('0').trim_end_matches('.'), self.unit)
    }
}

fn dimension(text: &str) -> Option<Dimension<'_>> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = end;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end == digits {
        return None;
    }
    let value = text[..end].parse().ok()?;
    let unit = &text[end..];
    unit.chars()
        .all(|c| c.is_ascii_alphabetic() || c == '%')
        .then_some(Dimension { value, unit })
}

/// Value of `text` when it is arithmetic on numbers, such as `3 - 1` or
/// `(10px * 2)`
pub(crate) fn reduce(text: &str) -> Option<String> {
    let mut arithmetic = Arithmetic {
        text: text.trim(),
        pos: 0,
        operators: 0,
    };
    let value = arithmetic.sum(0)?;
    arithmetic.skip_spaces();
    let complete = arithmetic.pos == arithmetic.text.len();
    (complete && arithmetic.operators > 0).then(|| value.to_string())
}

struct Arithmetic<'a> {
    text: &'a str,
    pos: usize,
    operators: usize,
}

impl<'a> Arithmetic<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_spaces(&mut self) -> bool {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
        skipped > 0
    }

    fn sum(&mut self, depth: usize) -> Option<Dimension<'a>> {
        let mut left = self.product(depth)?;
        loop {
            let mark = self.pos;
            let spaced_before = self.skip_spaces();
            let op = match self.peek() {
                Some(op @ ('+' | '-')) => op,
                _ => {
                    self.pos = mark;
                    return Some(left);
                }
            };
            self.pos += 1;
            let spaced_after = self.skip_spaces();
            // `1px -1px` is two values
            if spaced_before && !spaced_after {
                self.pos = mark;
                return Some(left);
            }
            let right = self.product(depth)?;
            left = self.combine(left, op, right)?;
        }
    }

    fn product(&mut self, depth: usize) -> Option<Dimension<'a>> {
        let mut left = self.factor(depth)?;
        loop {
            let mark = self.pos;
            self.skip_spaces();
            let op = match self.peek() {
                Some('*') => '*',
                Some('/') if depth > 0 => '/',
                Some('/') => return None,
                _ => {
                    self.pos = mark;
                    return Some(left);
                }
            };
            self.pos += 1;
            self.skip_spaces();
            let right = self.factor(depth)?;
            left = self.combine(left, op, right)?;
        }
    }

    fn factor(&mut self, depth: usize) -> Option<Dimension<'a>> {
        self.skip_spaces();
        if self.peek() == Some('(') {
            self.pos += 1;
            let value = self.sum(depth + 1)?;
            self.skip_spaces();
            if self.peek() != Some(')') {
                return None;
            }
            self.pos += 1;
            return Some(value);
        }

        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '.' || c == '%') {
            self.pos += 1;
        }
        dimension(&self.text[start..self.pos])
    }

    fn combine(&mut self, left: Dimension<'a>, op: char, right: Dimension<'a>) -> Option<Dimension<'a>> {
        self.operators += 1;
        let unit = if left.unit.is_empty() { right.unit } else { left.unit };
        let value = match op {
            '+' => left.value + right.value,
            '-' => left.value - right.value,
            '*' => left.value * right.value,
            '/' if right.value != 0.0 => left.value / right.value,
            _ => return None,
        };
        Some(Dimension { value, unit })
    }
}

/// Whether a `when` guard holds. `fallback` is the value of `default()`.
pub(crate) fn guard(text: &str, fallback: bool) -> RenderResult<bool> {
    for alternative in split_top_level(text, ',') {
        if conjunction(alternative.trim(), fallback)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `guard` mentions `default()`
pub(crate) fn uses_default(guard: &str) -> bool {
    guard.contains("default()")
}

fn invalid(text: &str) -> RenderError {
    RenderError::syntax(format!("Invalid guard `{}`", text))
}

/// `(a) and not (b) or (c)`, evaluated left to right
fn conjunction(text: &str, fallback: bool) -> RenderResult<bool> {
    let mut result: Option<bool> = None;
    let mut joiner: Option<&str> = None;
    let mut negate = false;

    for word in split_top_level(text, ' ').into_iter().filter(|w| !w.is_empty()) {
        match word {
            "not" => negate = !negate,
            "and" | "or" if result.is_some() && joiner.is_none() => joiner = Some(word),
            _ => {
                let inner = word
                    .strip_prefix('(')
                    .and_then(|w| w.strip_suffix(')'))
                    .ok_or_else(|| invalid(text))?;
                let value = condition(inner, fallback)? != negate;
                negate = false;
                result = Some(match (result, joiner.take()) {
                    (None, None) => value,
                    (Some(acc), Some("and")) => acc && value,
                    (Some(acc), Some(_)) => acc || value,
                    _ => return Err(invalid(text)),
                });
            }
        }
    }

    match (result, joiner) {
        (Some(result), None) => Ok(result),
        _ => Err(invalid(text)),
    }
}

fn condition(text: &str, fallback: bool) -> RenderResult<bool> {
    let text = text.trim();
    let Some((left, op, right)) = split_comparison(text) else {
        return truthy(text, fallback);
    };
    for side in [left, right] {
        if let Some(name) = function_name(side).filter(|name| !VALUE_FUNCTIONS.contains(name)) {
            return Err(unsupported(name));
        }
    }
    Ok(compare(left, op, right))
}

/// Functions whose calls are compared as plain values
const VALUE_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla", "url"];

fn unsupported(name: &str) -> RenderError {
    RenderError::syntax(format!("guard function {}() is not supported", name))
}

/// `name` of a `name(...)` call
fn function_name(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let name = &text[..open];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    (valid && text.ends_with(')')).then_some(name)
}

/// Split `a >= b` at its top-level comparison operator
fn split_comparison(text: &str) -> Option<(&str, &str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '<' | '>' | '=' if depth == 0 => {
                let len = match &text[i..] {
                    rest if rest.starts_with(">=") || rest.starts_with("<=") => 2,
                    rest if rest.starts_with("=<") || rest.starts_with("=>") => 2,
                    _ => 1,
                };
                return Some((text[..i].trim(), &text[i..i + len], text[i + len..].trim()));
            }
            _ => {}
        }
    }
    None
}

fn operand(text: &str) -> String {
    reduce(text).unwrap_or_else(|| text.to_string())
}

fn compare(left: &str, op: &str, right: &str) -> bool {
    let (left, right) = (operand(left), operand(right));
    match (dimension(&left), dimension(&right)) {
        (Some(a), Some(b)) => {
            if !a.unit.is_empty() && !b.unit.is_empty() && a.unit != b.unit {
                return false;
            }
            match op {
                ">" => a.value > b.value,
                ">=" | "=>" => a.value >= b.value,
                "<" => a.value < b.value,
                "<=" | "=<" => a.value <= b.value,
                _ => a.value == b.value,
            }
        }
        _ => op == "=" && unquote(&left) == unquote(&right),
    }
}

/// A condition without a comparison: `true`, `default()` or a type check
fn truthy(text: &str, fallback: bool) -> RenderResult<bool> {
    let Some(name) = function_name(text) else {
        return Ok(text == "true");
    };
    let open = name.len();
    let args: Vec<&str> = split_top_level(&text[open + 1..text.len() - 1], ',')
        .into_iter()
        .map(str::trim)
        .collect();
    let value = args.first().copied().unwrap_or_default();
    let unit = |expected: &str| dimension(value).is_some_and(|d| d.unit.eq_ignore_ascii_case(expected));

    let result = match name {
        "default" => fallback,
        "isnumber" => dimension(value).is_some(),
        "isstring" => value.len() >= 2 && (value.starts_with('"') || value.starts_with('\'')),
        "iscolor" => is_color(value),
        "iskeyword" => {
            !value.is_empty()
                && dimension(value).is_none()
                && value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        }
        "isurl" => value.to_ascii_lowercase().starts_with("url("),
        "ispixel" => unit("px"),
        "ispercentage" => unit("%"),
        "isem" => unit("em"),
        "isunit" => unit(args.get(1).map(|u| unquote(u)).unwrap_or_default()),
        _ => return Err(unsupported(name)),
    };
    Ok(result)
}

fn is_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let lowered = value.to_ascii_lowercase();
    ["rgb(", "rgba(", "hsl(", "hsla("].iter().any(|f| lowered.starts_with(f)) || COLOR_KEYWORDS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce() {
        assert_eq!(reduce("3 - 1").as_deref(), Some("2"));
        assert_eq!(reduce("2 * 5px").as_deref(), Some("10px"));
        assert_eq!(reduce("(10px / 4)").as_deref(), Some("2.5px"));
        assert_eq!(reduce("(1 + 2) * 3").as_deref(), Some("9"));
        assert_eq!(reduce("4-1").as_deref(), Some("3"));
    }

    #[test]
    fn test_reduce_leaves_non_arithmetic_alone() {
        for text in ["10px", "1px solid red", "16px/1.5", "0 -1px", "a - b", "", "-2px"] {
            assert_eq!(reduce(text), None, "{text}");
        }
    }

    #[test]
    fn test_literal_guards() {
        assert!(guard("(true)", false).unwrap());
        assert!(!guard("(false)", false).unwrap());
        assert!(guard("(false), (true)", false).unwrap());
        assert!(!guard("(true) and (false)", false).unwrap());
        assert!(guard("not (false)", false).unwrap());
    }

    #[test]
    fn test_comparisons() {
        assert!(guard("(3 > 0)", false).unwrap());
        assert!(!guard("(0 > 0)", false).unwrap());
        assert!(guard("(10px >= 10px)", false).unwrap());
        assert!(guard("(2 =< 3)", false).unwrap());
        assert!(guard("(dark = dark)", false).unwrap());
        assert!(guard("(\"dark\" = dark)", false).unwrap());
        assert!(!guard("(dark = light)", false).unwrap());
        assert!(guard("(3 - 1 = 2)", false).unwrap());
        assert!(!guard("(10px = 10em)", false).unwrap());
    }

    #[test]
    fn test_type_checks_and_default() {
        assert!(guard("(iscolor(#fff))", false).unwrap());
        assert!(guard("(isnumber(12px)) and (ispixel(12px))", false).unwrap());
        assert!(!guard("(isstring(12px))", false).unwrap());
        assert!(guard("(isunit(50%, %))", false).unwrap());
        assert!(guard("(default())", true).unwrap());
        assert!(!guard("(default())", false).unwrap());
    }

    #[test]
    fn test_invalid_guards() {
        assert!(guard("true", false).is_err());
        assert!(guard("(true) and", false).is_err());
        assert_eq!(
            guard("(lightness(#fff) > 50%)", false).map_err(|e| e.message).unwrap_err(),
            "guard function lightness() is not supported"
        );
        assert!(guard("(unknown(1))", false).is_err());
    }
}
