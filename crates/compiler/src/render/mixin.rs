//! Mixin signatures, calls and argument binding

use rustc_hash::FxHashMap;

use crate::render::parse::{find_top_level, split_top_level, Location};
use crate::render::scope::unquote;

/// One parameter of a mixin definition
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    /// `@name` or `@name: default`
    Variable { name: String, default: Option<String> },
    /// A value the argument has to equal, as in `.m(dark; @color)`
    Literal(String),
    /// `...` or `@rest...`
    Rest(Option<String>),
}

/// One argument of a mixin call
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Arg {
    /// Set for `@name: value`
    pub name: Option<String>,
    pub value: String,
}

/// `.m(args)`, `#ns > .m;` or `.m() !important`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MixinCall {
    /// `["#ns", ".m"]`
    pub path: Vec<String>,
    pub args: Vec<Arg>,
    pub important: bool,
    pub location: Location,
}

impl MixinCall {
    /// The callee as written, without arguments
    pub fn name(&self) -> String {
        self.path.join(" > ")
    }
}

/// Arguments split on `;` when there is one at top level, otherwise on `,`
fn split_arguments(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let separator = if find_top_level(text, ';').is_some() { ';' } else { ',' };
    split_top_level(text, separator)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// `@name: value` split into its name (without `@`) and value
fn named(part: &str) -> Option<(&str, &str)> {
    let rest = part.strip_prefix('@')?;
    let colon = find_top_level(rest, ':')?;
    let name = rest[..colon].trim();
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    valid.then(|| (name, rest[colon + 1..].trim()))
}

pub(crate) fn parse_params(text: &str) -> Vec<Param> {
    split_arguments(text)
        .into_iter()
        .map(|part| {
            if part == "..." {
                return Param::Rest(None);
            }
            if let Some(name) = part.strip_suffix("...").and_then(|p| p.strip_prefix('@')) {
                return Param::Rest(Some(name.to_string()));
            }
            if let Some((name, default)) = named(part) {
                return Param::Variable {
                    name: name.to_string(),
                    default: Some(default.to_string()),
                };
            }
            match part.strip_prefix('@') {
                Some(name) if !name.starts_with('{') => Param::Variable {
                    name: name.to_string(),
                    default: None,
                },
                _ => Param::Literal(part.to_string()),
            }
        })
        .collect()
}

pub(crate) fn parse_args(text: &str) -> Vec<Arg> {
    split_arguments(text)
        .into_iter()
        .map(|part| match named(part) {
            Some((name, value)) => Arg {
                name: Some(name.to_string()),
                value: value.to_string(),
            },
            None => Arg {
                name: None,
                value: part.to_string(),
            },
        })
        .collect()
}

/// Split a callee such as `#ns > .m` or `#ns.m` into its segments
pub(crate) fn parse_path(head: &str) -> Option<Vec<String>> {
    let compact: String = head.chars().filter(|c| !c.is_whitespace() && *c != '>').collect();
    let mut path = Vec::new();
    let mut start = None;

    for (i, c) in compact.char_indices() {
        match c {
            '.' | '#' => {
                if let Some(start) = start {
                    path.push(compact[start..i].to_string());
                }
                start = Some(i);
            }
            c if c.is_alphanumeric() || c == '-' || c == '_' => {}
            _ => return None,
        }
    }

    path.push(compact[start?..].to_string());
    (compact.starts_with(|c: char| c == '.' || c == '#') && path.iter().all(|segment| segment.len() > 1)).then_some(path)
}

/// Byte index of the `)` closing the `(` at `open`
pub(crate) fn closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text[open..].char_indices();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Variables a call binds for a definition with `params`, or `None` when
/// the arguments do not fit the definition. `@arguments` holds every
/// argument.
pub(crate) fn bind(params: &[Param], args: &[Arg]) -> Option<FxHashMap<String, String>> {
    let mut bindings = FxHashMap::default();

    for arg in args {
        let Some(name) = &arg.name else { continue };
        let declared = params
            .iter()
            .any(|param| matches!(param, Param::Variable { name: declared, .. } if declared == name));
        if !declared {
            return None;
        }
        bindings.insert(name.clone(), arg.value.clone());
    }

    let mut positional = args.iter().filter(|arg| arg.name.is_none()).map(|arg| arg.value.as_str());
    let mut variadic = false;

    for param in params {
        match param {
            Param::Variable { name, .. } if bindings.contains_key(name) => {}
            Param::Variable { name, default } => {
                let value = match positional.next() {
                    Some(value) => value.to_string(),
                    None => default.clone()?,
                };
                bindings.insert(name.clone(), value);
            }
            Param::Literal(literal) => {
                if unquote(positional.next()?) != unquote(literal) {
                    return None;
                }
            }
            Param::Rest(name) => {
                let rest: Vec<&str> = positional.by_ref().collect();
                if let Some(name) = name {
                    bindings.insert(name.clone(), rest.join(" "));
                }
                variadic = true;
            }
        }
    }

    if !variadic && positional.next().is_some() {
        return None;
    }

    let all: Vec<&str> = args.iter().map(|arg| arg.value.as_str()).collect();
    bindings.insert("arguments".to_string(), all.join(" "));
    Some(bindings)
}
