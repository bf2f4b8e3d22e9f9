//! Stylesheet structure
//!
//! Compiled LESS is split into rules and declarations. Selectors are parsed
//! from the source text of each rule prelude; declaration values are kept
//! verbatim.

use crate::error::{CssError, CssResult, SourceLocation};
use crate::selector::Selector;
use crate::tokenizer::{Token, Tokenizer};

/// At-rules whose block contains rules rather than declarations
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "document",
    "-moz-document",
    "layer",
    "container",
    "scope",
    "starting-style",
];

#[derive(Debug, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

#[derive(Debug)]
pub enum Rule {
    Style(StyleRule),
    /// `@media`, `@supports` and friends
    Group(GroupRule),
    /// Any other at-rule. Its block, if any, is skipped.
    At(AtRule),
}

#[derive(Debug)]
pub struct StyleRule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
    pub location: SourceLocation,
}

#[derive(Debug)]
pub struct GroupRule {
    /// Lowercased, without `@`
    pub name: String,
    pub prelude: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug)]
pub struct AtRule {
    pub name: String,
    pub prelude: String,
    pub has_block: bool,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    /// Lowercased property name
    pub property: String,
    /// Source text of the value, trimmed and without `!important`
    pub value: String,
    pub important: bool,
    pub location: SourceLocation,
}

impl Stylesheet {
    pub fn parse(css: &str) -> CssResult<Self> {
        let tokens = Tokenizer::new(css).tokenize_located()?;
        let mut parser = Parser { src: css, tokens, index: 0 };
        let rules = parser.rules(None)?;
        Ok(Self { rules })
    }

    /// Style rules in source order, including those nested in grouping
    /// at-rules
    pub fn style_rules(&self) -> Vec<&StyleRule> {
        fn walk<'a>(rules: &'a [Rule], out: &mut Vec<&'a StyleRule>) {
            for rule in rules {
                match rule {
                    Rule::Style(style) => out.push(style),
                    Rule::Group(group) => walk(&group.rules, out),
                    Rule::At(_) => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.rules, &mut out);
        out
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Token, SourceLocation)>,
    index: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn bump(&mut self) {
        self.index += 1;
    }

    fn location(&self) -> SourceLocation {
        match self.tokens.get(self.index) {
            Some((_, location)) => *location,
            None => self.end(),
        }
    }

    /// Location just past the input
    fn end(&self) -> SourceLocation {
        let mut location = SourceLocation::default();
        for c in self.src.chars() {
            if c == '\n' {
                location.line += 1;
                location.column = 1;
            } else {
                location.column += 1;
            }
        }
        location.offset = self.src.len();
        location
    }

    fn skip_whitespace(&mut self) {
        while self.peek() == Some(&Token::Whitespace) {
            self.bump();
        }
    }

    /// Source text between a start offset and the current token
    fn text_from(&self, start: usize) -> &'a str {
        let src = self.src;
        src[start..self.location().offset].trim()
    }

    /// Rules up to the end of input, or up to and including the `}` that
    /// closes the block opened at `open`
    fn rules(&mut self, open: Option<SourceLocation>) -> CssResult<Vec<Rule>> {
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => match open {
                    Some(location) => return Err(CssError::UnclosedBlock { location }),
                    None => return Ok(rules),
                },
                Some(Token::CloseBrace) => {
                    if open.is_none() {
                        return Err(CssError::syntax("Unexpected '}'", self.location()));
                    }
                    self.bump();
                    return Ok(rules);
                }
                Some(Token::Semicolon) => self.bump(),
                Some(Token::AtKeyword(_)) => rules.push(self.at_rule()?),
                Some(_) => rules.push(Rule::Style(self.style_rule()?)),
            }
        }
    }

    fn at_rule(&mut self) -> CssResult<Rule> {
        let name = match self.peek() {
            Some(Token::AtKeyword(name)) => name.to_ascii_lowercase(),
            _ => return Err(CssError::syntax("Expected at-rule", self.location())),
        };
        self.bump();

        let start = self.location().offset;
        while !matches!(self.peek(), None | Some(Token::Semicolon | Token::OpenBrace | Token::CloseBrace)) {
            self.bump();
        }
        let prelude = self.text_from(start).to_string();

        if self.peek() != Some(&Token::OpenBrace) {
            if self.peek() == Some(&Token::Semicolon) {
                self.bump();
            }
            return Ok(Rule::At(AtRule { name, prelude, has_block: false }));
        }

        let open = self.location();
        self.bump();
        if GROUPING_AT_RULES.contains(&name.as_str()) {
            let rules = self.rules(Some(open))?;
            return Ok(Rule::Group(GroupRule { name, prelude, rules }));
        }
        self.skip_block(open)?;
        Ok(Rule::At(AtRule { name, prelude, has_block: true }))
    }

    /// Skip past the `}` matching an already consumed `{`
    fn skip_block(&mut self, open: SourceLocation) -> CssResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(CssError::UnclosedBlock { location: open }),
                Some(Token::OpenBrace) => depth += 1,
                Some(Token::CloseBrace) => depth -= 1,
                Some(_) => {}
            }
            self.bump();
        }
        Ok(())
    }

    fn style_rule(&mut self) -> CssResult<StyleRule> {
        let location = self.location();
        while !matches!(self.peek(), None | Some(Token::OpenBrace)) {
            self.bump();
        }
        let src = self.src;
        let prelude = &src[location.offset..self.location().offset];
        if self.peek().is_none() {
            return Err(CssError::syntax(format!("Expected '{{' after '{}'", prelude.trim()), location));
        }

        let selectors = Selector::parse_list(prelude).map_err(|err| match err {
            CssError::InvalidSelector { selector, location: inner } => CssError::InvalidSelector {
                selector,
                location: location.shifted(inner),
            },
            other => other,
        })?;

        let open = self.location();
        self.bump();
        let declarations = self.declarations(open)?;
        Ok(StyleRule { selectors, declarations, location })
    }

    /// Declarations up to and including the closing `}`
    fn declarations(&mut self, open: SourceLocation) -> CssResult<Vec<Declaration>> {
        let mut declarations = Vec::new();
        loop {
            self.skip_whitespace();
            let location = self.location();
            let property = match self.peek() {
                None => return Err(CssError::UnclosedBlock { location: open }),
                Some(Token::CloseBrace) => {
                    self.bump();
                    return Ok(declarations);
                }
                Some(Token::Semicolon) => {
                    self.bump();
                    continue;
                }
                Some(Token::Ident(name)) => name.to_ascii_lowercase(),
                Some(_) => String::new(),
            };
            self.bump();
            self.skip_whitespace();

            let well_formed = !property.is_empty() && self.peek() == Some(&Token::Colon);
            if well_formed {
                self.bump();
            }
            let start = self.location().offset;
            self.skip_value(open)?;

            if well_formed {
                let (value, important) = split_important(self.text_from(start));
                declarations.push(Declaration { property, value: value.to_string(), important, location });
            }
            if self.peek() == Some(&Token::Semicolon) {
                self.bump();
            }
        }
    }

    /// Move to the `;` or `}` ending a declaration value
    fn skip_value(&mut self, open: SourceLocation) -> CssResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(CssError::UnclosedBlock { location: open }),
                Some(Token::Semicolon | Token::CloseBrace) if depth == 0 => return Ok(()),
                Some(Token::OpenParen | Token::Function(_) | Token::OpenSquare | Token::OpenBrace) => depth += 1,
                Some(Token::CloseParen | Token::CloseSquare | Token::CloseBrace) => depth = depth.saturating_sub(1),
                Some(_) => {}
            }
            self.bump();
        }
    }
}

fn split_important(value: &str) -> (&str, bool) {
    if let Some(bang) = value.rfind('!') {
        if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            return (value[..bang].trim_end(), true);
        }
    }
    (value, false)
}
