//! Variable scopes and value evaluation

use rustc_hash::FxHashMap;

use crate::error::{RenderError, RenderErrorKind, RenderResult};
use crate::render::expr::reduce;
use crate::render::parse::Node;

/// Nesting limit for variables defined in terms of other variables
const MAX_VARIABLE_DEPTH: usize = 64;

/// Stack of block scopes; inner frames shadow outer ones
#[derive(Debug, Default)]
pub(crate) struct Scope {
    frames: Vec<FxHashMap<String, String>>,
}

impl Scope {
    /// Enter a block, making every variable it defines visible
    pub fn push(&mut self, nodes: &[Node]) {
        let mut frame = FxHashMap::default();
        collect_variables(nodes, &mut frame);
        self.frames.push(frame);
    }

    /// Enter a frame of already known variables, such as mixin arguments
    pub fn push_frame(&mut self, frame: FxHashMap<String, String>) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .map(String::as_str)
    }

    /// Evaluated value of `@name`
    pub fn variable(&self, name: &str) -> RenderResult<String> {
        self.variable_at_depth(name, 0)
    }

    fn variable_at_depth(&self, name: &str, depth: usize) -> RenderResult<String> {
        if depth > MAX_VARIABLE_DEPTH {
            return Err(RenderError::new(
                RenderErrorKind::Name,
                format!("Recursive variable definition for @{}", name),
            ));
        }
        let raw = self
            .lookup(name)
            .ok_or_else(|| RenderError::new(RenderErrorKind::Name, format!("variable @{} is undefined", name)))?;
        let value = self.evaluate_at_depth(raw, depth + 1)?;
        if raw.trim_start().starts_with('~') {
            return Ok(value);
        }
        Ok(reduce(&value).unwrap_or(value))
    }

    /// Replace `@{name}` interpolations with unquoted variable values
    pub fn interpolate(&self, text: &str) -> RenderResult<String> {
        self.interpolate_at_depth(text, 0)
    }

    fn interpolate_at_depth(&self, text: &str, depth: usize) -> RenderResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("@{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let value = self.variable_at_depth(after[..end].trim(), depth)?;
                    out.push_str(unquote(&value));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Evaluate a declaration or variable value: variable references are
    /// substituted and escaped strings (`~"..."`) are unquoted. The
    /// contents of an unquoted `url(...)` are literal apart from `@{...}`
    /// and a lone `@variable`.
    pub fn evaluate(&self, text: &str) -> RenderResult<String> {
        self.evaluate_at_depth(text, 0)
    }

    fn evaluate_at_depth(&self, text: &str, depth: usize) -> RenderResult<String> {
        let mut out = String::with_capacity(text.len());
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '~' if matches!(chars.get(i + 1), Some('"') | Some('\'')) => {
                    let (literal, next) = read_quoted(&chars, i + 1);
                    out.push_str(&self.interpolate_at_depth(&literal, depth)?);
                    i = next;
                }
                '"' | '\'' => {
                    let (literal, next) = read_quoted(&chars, i);
                    out.push(c);
                    out.push_str(&self.interpolate_at_depth(&literal, depth)?);
                    out.push(c);
                    i = next;
                }
                'u' | 'U' if opens_unquoted_url(&chars, i) => {
                    let open = i + "url(".len();
                    let close = chars[open..]
                        .iter()
                        .position(|&c| c == ')')
                        .map(|p| open + p)
                        .unwrap_or(chars.len());
                    let contents: String = chars[open..close].iter().collect();
                    out.extend(&chars[i..open]);
                    out.push_str(&self.url_at_depth(&contents, depth)?);
                    if close < chars.len() {
                        out.push(')');
                    }
                    i = close + 1;
                }
                '@' if chars.get(i + 1) == Some(&'{') => {
                    let end = chars[i..].iter().position(|&c| c == '}').map(|p| i + p);
                    match end {
                        Some(end) => {
                            let name: String = chars[i + 2..end].iter().collect();
                            out.push_str(unquote(&self.variable_at_depth(name.trim(), depth)?));
                            i = end + 1;
                        }
                        None => {
                            out.extend(&chars[i..]);
                            i = chars.len();
                        }
                    }
                }
                '@' => {
                    // `@@name` looks up the variable named by `@name`
                    let indirect = chars.get(i + 1) == Some(&'@');
                    let start = if indirect { i + 2 } else { i + 1 };
                    let end = chars[start..]
                        .iter()
                        .position(|&c| !is_name_char(c))
                        .map(|p| start + p)
                        .unwrap_or(chars.len());
                    if end == start {
                        out.push(c);
                        i += 1;
                        continue;
                    }
                    let name: String = chars[start..end].iter().collect();
                    let value = self.variable_at_depth(&name, depth)?;
                    if indirect {
                        out.push_str(&self.variable_at_depth(unquote(&value), depth)?);
                    } else {
                        out.push_str(&value);
                    }
                    i = end;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        Ok(out)
    }

    fn url_at_depth(&self, contents: &str, depth: usize) -> RenderResult<String> {
        let trimmed = contents.trim();
        match trimmed.strip_prefix('@') {
            Some(name) if !name.is_empty() && name.chars().all(is_name_char) => self.variable_at_depth(name, depth),
            _ => self.interpolate_at_depth(contents, depth),
        }
    }
}

/// `url(` at `i`, not part of a longer name, with contents that are not a
/// quoted string
fn opens_unquoted_url(chars: &[char], i: usize) -> bool {
    let name: String = chars[i..].iter().take(4).collect();
    if !name.eq_ignore_ascii_case("url(") || (i > 0 && is_name_char(chars[i - 1])) {
        return false;
    }
    !matches!(
        chars[i + 4..].iter().copied().find(|c| !c.is_whitespace()),
        Some('"' | '\'')
    )
}

/// Gather variable definitions of a block, including those of imported files
fn collect_variables(nodes: &[Node], frame: &mut FxHashMap<String, String>) {
    for node in nodes {
        match node {
            Node::Variable { name, value } => {
                frame.insert(name.clone(), value.clone());
            }
            Node::Imported { nodes, .. } => collect_variables(nodes, frame),
            _ => {}
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Contents of the string opening at `start`, and the index after it
fn read_quoted(chars: &[char], start: usize) -> (String, usize) {
    let quote = chars[start];
    let mut literal = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                literal.push('\\');
                literal.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return (literal, i + 1),
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    (literal, i)
}

/// Strip `~"..."`, `"..."` or `'...'` quoting
pub(crate) fn unquote(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix('~').unwrap_or(value);
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, value: &str) -> Node {
        Node::Variable {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_interpolation() {
        let mut scope = Scope::default();
        scope.push(&[var("name", "banner"), var("quoted", "\"title\"")]);

        assert_eq!(scope.interpolate(".@{name}-x").unwrap(), ".banner-x");
        assert_eq!(scope.interpolate(".@{quoted}").unwrap(), ".title");
    }

    #[test]
    fn test_last_definition_wins() {
        let mut scope = Scope::default();
        scope.push(&[var("a", "1"), var("a", "2")]);
        assert_eq!(scope.variable("a").unwrap(), "2");
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scope = Scope::default();
        scope.push(&[var("color", "red"), var("size", "1px")]);
        scope.push(&[var("color", "blue")]);
        assert_eq!(scope.evaluate("@color @size").unwrap(), "blue 1px");
        scope.pop();
        assert_eq!(scope.evaluate("@color").unwrap(), "red");
    }

    #[test]
    fn test_recursive_resolution() {
        let mut scope = Scope::default();
        scope.push(&[var("base", "10px"), var("gap", "@base"), var("prefix", "~\"app\"")]);
        assert_eq!(scope.evaluate("@gap solid").unwrap(), "10px solid");
        assert_eq!(scope.interpolate(".@{prefix}-root").unwrap(), ".app-root");
    }

    #[test]
    fn test_escaped_strings_are_unquoted() {
        let mut scope = Scope::default();
        scope.push(&[var("w", "3px")]);
        assert_eq!(scope.evaluate("~\"calc(100% - @{w})\"").unwrap(), "calc(100% - 3px)");
        assert_eq!(scope.evaluate("\"@{w}\"").unwrap(), "\"3px\"");
    }

    #[test]
    fn test_variable_variables() {
        let mut scope = Scope::default();
        scope.push(&[var("primary", "green"), var("which", "\"primary\"")]);
        assert_eq!(scope.evaluate("@@which").unwrap(), "green");
    }

    #[test]
    fn test_undefined_variable() {
        let scope = Scope::default();
        let err = scope.interpolate(".@{missing}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Name);
        assert_eq!(err.message, "variable @missing is undefined");
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut scope = Scope::default();
        scope.push(&[var("loop", "@loop")]);
        let err = scope.evaluate("@loop").unwrap_err();
        assert_eq!(err.message, "Recursive variable definition for @loop");
    }

    #[test]
    fn test_unquoted_url_is_literal() {
        let mut scope = Scope::default();
        scope.push(&[var("dir", "img"), var("logo", "\"img/logo.png\"")]);
        assert_eq!(scope.evaluate("url(img/logo@2x.png) no-repeat").unwrap(), "url(img/logo@2x.png) no-repeat");
        assert_eq!(scope.evaluate("URL(@{dir}/a@2x.png)").unwrap(), "URL(img/a@2x.png)");
        assert_eq!(scope.evaluate("url( @logo )").unwrap(), "url(\"img/logo.png\")");
        assert_eq!(scope.evaluate("url('@{dir}/b.png')").unwrap(), "url('img/b.png')");
        assert_eq!(scope.evaluate("myurl(@dir)").unwrap(), "myurl(img)");
    }

    #[test]
    fn test_arithmetic_in_variables() {
        let mut scope = Scope::default();
        scope.push(&[var("i", "3"), var("next", "@i - 1"), var("ratio", "16/9"), var("raw", "~\"1 + 1\"")]);
        assert_eq!(scope.variable("next").unwrap(), "2");
        assert_eq!(scope.interpolate(".w-@{next}").unwrap(), ".w-2");
        assert_eq!(scope.variable("ratio").unwrap(), "16/9");
        assert_eq!(scope.variable("raw").unwrap(), "1 + 1");
    }

    #[test]
    fn test_pushed_frame() {
        let mut scope = Scope::default();
        scope.push(&[var("a", "outer")]);
        let mut frame = FxHashMap::default();
        frame.insert("a".to_string(), "bound".to_string());
        scope.push_frame(frame);
        assert_eq!(scope.variable("a").unwrap(), "bound");
        scope.pop();
        assert_eq!(scope.variable("a").unwrap(), "outer");
    }

    #[test]
    fn test_lone_at_sign_is_kept() {
        let scope = Scope::default();
        assert_eq!(scope.evaluate("a @ b").unwrap(), "a @ b");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("~'b'"), "b");
        assert_eq!(unquote("c"), "c");
    }
}
