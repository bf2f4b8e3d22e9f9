//! LESS statement parser
//!
//! Splits LESS source into a tree of statements and blocks. Values and
//! selectors are kept as text; interpolation happens during evaluation.

use std::path::Path;

use crate::error::{RenderError, RenderResult};
use crate::render::mixin::{closing_paren, parse_args, parse_params, parse_path, MixinCall, Param};

/// At-rules whose block contains rules and declarations
pub(crate) const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "document",
    "-moz-document",
    "layer",
    "container",
    "scope",
];

/// Position of a statement in one of the files of a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    /// Index into the compilation's file table
    pub file: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AtRuleBody {
    /// `@name prelude;`
    Statement,
    /// Block of rules and declarations (`@media`, `@supports`, ...)
    Rules(Vec<Node>),
    /// Block emitted verbatim (`@keyframes`, `@font-face`, ...)
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Variable {
        name: String,
        value: String,
    },
    Import {
        options: Vec<String>,
        target: String,
        /// Written as `url(...)`
        url: bool,
        media: String,
        location: Location,
    },
    Declaration {
        property: String,
        value: String,
        location: Location,
    },
    MixinCall(MixinCall),
    /// `.m(@a; @b: 1) when (...) { ... }`, never emitted itself
    MixinDefinition {
        /// `.m` or `#m`
        name: String,
        params: Vec<Param>,
        guard: Option<String>,
        children: Vec<Node>,
        location: Location,
    },
    /// `@name: { ... }`
    DetachedRuleset {
        name: String,
        children: Vec<Node>,
    },
    /// `@name();`
    DetachedCall {
        name: String,
        location: Location,
    },
    Rule {
        selector: String,
        /// Condition after `when`
        guard: Option<String>,
        children: Vec<Node>,
        location: Location,
    },
    AtRule {
        name: String,
        prelude: String,
        body: AtRuleBody,
        location: Location,
    },
    /// Contents of an imported stylesheet
    Imported {
        nodes: Vec<Node>,
        reference: bool,
    },
    /// CSS text passed through unchanged
    Raw(String),
}

/// Character-level parser for one LESS source
pub(crate) struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    file: usize,
    filename: &'a Path,
}

impl<'a> Parser<'a> {
    pub fn new(source: &str, file: usize, filename: &'a Path) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
            filename,
        }
    }

    /// Parse the whole source as a stylesheet
    pub fn parse(mut self) -> RenderResult<Vec<Node>> {
        self.parse_block(false)
    }

    fn location(&self) -> Location {
        Location {
            file: self.file,
            line: self.line,
            column: self.column,
        }
    }

    fn error_at(&self, message: impl Into<String>, location: Location) -> RenderError {
        RenderError::syntax(message).at(self.filename, location.line, location.column)
    }

    fn error(&self, message: impl Into<String>) -> RenderError {
        self.error_at(message, self.location())
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skip a comment starting at the cursor. Returns false when there is none.
    fn skip_comment(&mut self, allow_line_comment: bool) -> RenderResult<bool> {
        match (self.peek(0), self.peek(1)) {
            (Some('/'), Some('*')) => {
                let start = self.location();
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        Some('*') if self.peek(0) == Some('/') => {
                            self.bump();
                            return Ok(true);
                        }
                        Some(_) => {}
                        None => return Err(self.error_at("missing closing `*/`", start)),
                    }
                }
            }
            (Some('/'), Some('/')) if allow_line_comment => {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn skip_trivia(&mut self) -> RenderResult<()> {
        loop {
            match self.peek(0) {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    if !self.skip_comment(true)? {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Copy a quoted string, including its quotes, into `out`
    fn read_string(&mut self, out: &mut String) -> RenderResult<()> {
        let start = self.location();
        let quote = self.bump().unwrap_or('"');
        out.push(quote);
        loop {
            match self.bump() {
                Some('\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some(c) if c == quote => {
                    out.push(c);
                    return Ok(());
                }
                Some(c) => out.push(c),
                None => return Err(self.error_at("unterminated string", start)),
            }
        }
    }

    /// Copy an `@{name}` interpolation into `out`
    fn read_interpolation(&mut self, out: &mut String) -> RenderResult<()> {
        let start = self.location();
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '}' {
                return Ok(());
            }
        }
        Err(self.error_at("missing closing `}` in interpolation", start))
    }

    /// Read up to the next `;`, `{` or `}` outside strings and parentheses.
    /// The terminator is left unconsumed.
    fn read_prelude(&mut self) -> RenderResult<(String, Option<char>)> {
        let mut text = String::new();
        let mut depth = 0usize;

        loop {
            let c = match self.peek(0) {
                Some(c) => c,
                None => return Ok((text.trim().to_string(), None)),
            };

            match c {
                ';' | '{' | '}' if depth == 0 => return Ok((text.trim().to_string(), Some(c))),
                '"' | '\'' => self.read_string(&mut text)?,
                '@' if self.peek(1) == Some('{') => self.read_interpolation(&mut text)?,
                '/' if self.skip_comment(depth == 0)? => text.push(' '),
                '(' | '[' => {
                    depth += 1;
                    text.push(c);
                    self.bump();
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    text.push(c);
                    self.bump();
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Read a block body verbatim, after its `{`, consuming the closing `}`
    fn read_raw_block(&mut self) -> RenderResult<String> {
        let start = self.location();
        let mut text = String::new();
        let mut depth = 0usize;

        loop {
            let c = match self.peek(0) {
                Some(c) => c,
                None => return Err(self.error_at("missing closing `}`", start)),
            };

            match c {
                '"' | '\'' => self.read_string(&mut text)?,
                '@' if self.peek(1) == Some('{') => self.read_interpolation(&mut text)?,
                '/' if self.skip_comment(true)? => text.push(' '),
                '{' => {
                    depth += 1;
                    text.push(c);
                    self.bump();
                }
                '}' => {
                    self.bump();
                    if depth == 0 {
                        return Ok(text.trim().to_string());
                    }
                    depth -= 1;
                    text.push(c);
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Parse statements until EOF (top level) or the closing `}` (nested)
    fn parse_block(&mut self, nested: bool) -> RenderResult<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            self.skip_trivia()?;

            match self.peek(0) {
                None if nested => return Err(self.error("missing closing `}`")),
                None => break,
                Some('}') if nested => {
                    self.bump();
                    break;
                }
                Some('}') => return Err(self.error("Unrecognised input. Possibly missing opening '{'")),
                Some(';') => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let location = self.location();
            let (text, terminator) = self.read_prelude()?;

            let node = match terminator {
                Some('{') => {
                    self.bump();
                    self.parse_block_statement(text, location)?
                }
                Some(';') => {
                    self.bump();
                    self.parse_statement(text, location)?
                }
                // `}` closes the enclosing block on the next iteration
                _ => self.parse_statement(text, location)?,
            };

            if let Some(node) = node {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    /// A statement followed by a `{ ... }` block
    fn parse_block_statement(&mut self, text: String, location: Location) -> RenderResult<Option<Node>> {
        if text.is_empty() {
            return Err(self.error_at("Unrecognised input", location));
        }

        if text.starts_with('@') && !text.starts_with("@{") {
            if let Some(name) = variable_name(&text) {
                let children = self.parse_block(true)?;
                return Ok(Some(Node::DetachedRuleset {
                    name: name[1..].to_string(),
                    children,
                }));
            }

            let (name, prelude) = split_at_rule(&text);
            let lowered = name.to_ascii_lowercase();

            let body = if GROUPING_AT_RULES.contains(&lowered.as_str()) {
                AtRuleBody::Rules(self.parse_block(true)?)
            } else {
                AtRuleBody::Raw(self.read_raw_block()?)
            };

            let name = if matches!(body, AtRuleBody::Rules(_)) { lowered } else { name.to_string() };
            return Ok(Some(Node::AtRule {
                name,
                prelude: prelude.to_string(),
                body,
                location,
            }));
        }

        let children = self.parse_block(true)?;

        if is_mixin_definition(&text) {
            return self.mixin_definition(&text, children, location).map(Some);
        }

        let (selector, guard) = split_guard(&text);
        Ok(Some(Node::Rule {
            selector: strip_extend(&selector),
            guard,
            children,
            location,
        }))
    }

    fn mixin_definition(&self, text: &str, children: Vec<Node>, location: Location) -> RenderResult<Node> {
        let open = text.find('(').ok_or_else(|| self.error_at("Unrecognised input", location))?;
        let close = closing_paren(text, open)
            .ok_or_else(|| self.error_at("missing closing `)` in mixin definition", location))?;

        let rest = text[close + 1..].trim();
        let guard = match rest.strip_prefix("when") {
            _ if rest.is_empty() => None,
            Some(guard) if guard.starts_with(|c: char| c == ' ' || c == '(') => Some(guard.trim().to_string()),
            _ => return Err(self.error_at("Unrecognised input", location)),
        };

        Ok(Node::MixinDefinition {
            name: text[..open].trim().to_string(),
            params: parse_params(&text[open + 1..close]),
            guard,
            children,
            location,
        })
    }

    /// `.m(args)`, `.m;`, `#ns > .m()` or `.m() !important`
    fn mixin_call(&self, text: &str, location: Location) -> RenderResult<Node> {
        let (text, important) = match text.strip_suffix("!important") {
            Some(rest) => (rest.trim_end(), true),
            None => (text, false),
        };

        let (head, args) = match text.find('(') {
            Some(open) => {
                let close = closing_paren(text, open)
                    .ok_or_else(|| self.error_at("missing closing `)` in mixin call", location))?;
                if !text[close + 1..].trim().is_empty() {
                    return Err(self.error_at("Unrecognised input", location));
                }
                (&text[..open], parse_args(&text[open + 1..close]))
            }
            None => (text, Vec::new()),
        };

        let path = parse_path(head).ok_or_else(|| self.error_at("Unrecognised input", location))?;
        Ok(Node::MixinCall(MixinCall {
            path,
            args,
            important,
            location,
        }))
    }

    /// A statement ended by `;`, `}` or EOF
    fn parse_statement(&mut self, text: String, location: Location) -> RenderResult<Option<Node>> {
        if text.is_empty() {
            return Ok(None);
        }

        if text.starts_with('@') && !text.starts_with("@{") {
            if let Some(name) = variable_name(&text) {
                let value = text[name.len()..].trim_start();
                let value = value.strip_prefix(':').unwrap_or(value).trim();
                return Ok(Some(Node::Variable {
                    name: name[1..].to_string(),
                    value: value.to_string(),
                }));
            }

            let (name, prelude) = split_at_rule(&text);

            if name.eq_ignore_ascii_case("import") {
                return self.parse_import(prelude, location).map(Some);
            }
            if name.eq_ignore_ascii_case("plugin") {
                return Ok(None);
            }
            // Detached ruleset call, `@rules();`
            if prelude.starts_with('(') {
                if prelude.trim_start_matches('(').trim_start().starts_with(')') {
                    return Ok(Some(Node::DetachedCall {
                        name: name.to_string(),
                        location,
                    }));
                }
                return Err(self.error_at("Unrecognised input", location));
            }

            return Ok(Some(Node::AtRule {
                name: name.to_string(),
                prelude: prelude.to_string(),
                body: AtRuleBody::Statement,
                location,
            }));
        }

        if text.starts_with('.') || text.starts_with('#') {
            return self.mixin_call(&text, location).map(Some);
        }

        if text.starts_with("&:extend") {
            return Ok(None);
        }

        match find_top_level(&text, ':') {
            Some(index) if index > 0 => Ok(Some(Node::Declaration {
                property: text[..index].trim().to_string(),
                value: text[index + 1..].trim().to_string(),
                location,
            })),
            _ => Err(self.error_at("Unrecognised input", location)),
        }
    }

    fn parse_import(&self, prelude: &str, location: Location) -> RenderResult<Node> {
        let mut rest = prelude.trim();
        let mut options = Vec::new();

        if let Some(inner) = rest.strip_prefix('(') {
            let close = inner
                .find(')')
                .ok_or_else(|| self.error_at("missing closing `)` in @import options", location))?;
            options = inner[..close]
                .split(',')
                .map(|o| o.trim().to_ascii_lowercase())
                .filter(|o| !o.is_empty())
                .collect();
            rest = inner[close + 1..].trim_start();
        }

        let (target, url, media) = if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let close = rest[1..]
                .find(quote)
                .ok_or_else(|| self.error_at("unterminated string in @import", location))?;
            (rest[1..close + 1].to_string(), false, &rest[close + 2..])
        } else if rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("url(") {
            let close = rest
                .find(')')
                .ok_or_else(|| self.error_at("missing closing `)` in @import", location))?;
            let inner = rest[4..close].trim();
            (unquote_literal(inner).to_string(), true, &rest[close + 1..])
        } else {
            return Err(self.error_at("Unrecognised input in @import", location));
        };

        Ok(Node::Import {
            options,
            target,
            url,
            media: media.trim().to_string(),
            location,
        })
    }
}

/// `@name` when `text` is a variable definition (`@name: value`)
fn variable_name(text: &str) -> Option<&str> {
    let end = text[1..]
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map(|i| i + 1)
        .unwrap_or(text.len());
    if end == 1 {
        return None;
    }
    text[end..].trim_start().starts_with(':').then(|| &text[..end])
}

/// Split `@name prelude` into its name (without `@`) and prelude
fn split_at_rule(text: &str) -> (&str, &str) {
    let body = &text[1..];
    let end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    (&body[..end], body[end..].trim())
}

/// `.name(` or `#name(` at the start of a selector
fn is_mixin_definition(selector: &str) -> bool {
    let mut chars = selector.chars();
    if !matches!(chars.next(), Some('.') | Some('#')) {
        return false;
    }
    let rest = chars.as_str();
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    end > 0 && rest[end..].trim_start().starts_with('(')
}

/// Byte index of `needle` outside strings, parentheses, brackets and
/// interpolations
pub(crate) fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();

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
            '@' if matches!(chars.peek(), Some((_, '{'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
            }
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on a top-level separator
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(index) = find_top_level(rest, separator) {
        parts.push(&rest[..index]);
        rest = &rest[index + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Split a rule prelude into its selector and its `when` guard
fn split_guard(prelude: &str) -> (String, Option<String>) {
    let text = prelude.split_whitespace().collect::<Vec<_>>().join(" ");
    match find_guard(&text) {
        Some(index) => (
            text[..index].trim().to_string(),
            Some(text[index + "when".len()..].trim().to_string()),
        ),
        None => (text, None),
    }
}

/// Drop `:extend(...)` from a rule selector
fn strip_extend(selector: &str) -> String {
    let mut text = selector.to_string();
    while let Some(start) = text.find(":extend(") {
        let end = text[start..].find(')').map(|i| start + i + 1).unwrap_or(text.len());
        text.replace_range(start..end, "");
    }
    text.trim().to_string()
}

/// Byte index of a top-level ` when ` keyword
fn find_guard(selector: &str) -> Option<usize> {
    let mut offset = 0;
    for part in split_top_level(selector, ' ') {
        if part == "when" && offset > 0 {
            return Some(offset);
        }
        offset += part.len() + 1;
    }
    None
}

fn unquote_literal(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
