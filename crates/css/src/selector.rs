//! Selector lists
//!
//! Selectors are parsed far enough to tell which class names they mention
//! and whether CSS-modules scoping (`:global`, `:local`) hides them.
//! Attribute selectors and pseudo-class arguments are kept as text.

use crate::error::{CssError, CssResult, SourceLocation};
use crate::tokenizer::{Token, Tokenizer};

/// Pseudo-classes that take a selector list argument
const NESTED_LIST_PSEUDOS: &[&str] = &[
    "not", "is", "where", "has", "matches", "any", "-moz-any", "-webkit-any", "global", "local",
];

/// Pseudo-elements that may be written with a single colon
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    Universal,
    /// Element name, lowercased
    Type(String),
    Class(String),
    Id(String),
    /// `&`
    Nesting,
    /// Bracket contents, e.g. `type="text"`
    Attribute(String),
    PseudoClass {
        name: String,
        args: Option<String>,
        /// `args` parsed, for pseudo-classes that take selectors
        selectors: Vec<Selector>,
    },
    PseudoElement(String),
    Combinator(Combinator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

impl Selector {
    /// Parse a single complex selector
    pub fn parse(input: &str) -> CssResult<Self> {
        let mut list = Self::parse_list(input)?;
        match list.len() {
            1 => Ok(list.remove(0)),
            _ => Err(CssError::InvalidSelector {
                selector: input.trim().to_string(),
                location: SourceLocation::default(),
            }),
        }
    }

    /// Parse a comma separated selector list
    pub fn parse_list(input: &str) -> CssResult<Vec<Self>> {
        let tokens = Tokenizer::new(input).tokenize_located()?;
        let mut cursor = Cursor { tokens, index: 0, text: input.trim() };
        cursor.selector_list()
    }

    /// Class names exported under CSS-modules scoping. Classes inside
    /// `:global(...)`, or after a bare `:global` until the next bare
    /// `:local`, are left out.
    pub fn local_class_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.walk_classes(false, &mut names);
        names
    }

    fn walk_classes<'a>(&'a self, mut global: bool, names: &mut Vec<&'a str>) {
        for part in &self.parts {
            let SelectorPart::PseudoClass { name, args, selectors } = part else {
                if let SelectorPart::Class(class) = part {
                    if !global {
                        names.push(class);
                    }
                }
                continue;
            };
            let nested_global = match (name.as_str(), args.is_some()) {
                ("global", false) => {
                    global = true;
                    continue;
                }
                ("local", false) => {
                    global = false;
                    continue;
                }
                ("global", true) => continue,
                ("local", true) => false,
                _ => global,
            };
            for selector in selectors {
                selector.walk_classes(nested_global, names);
            }
        }
    }
}

struct Cursor<'a> {
    tokens: Vec<(Token, SourceLocation)>,
    index: usize,
    text: &'a str,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(token, _)| token.clone());
        self.index += 1;
        token
    }

    fn location(&self) -> SourceLocation {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map(|(_, location)| *location)
            .unwrap_or_default()
    }

    fn invalid(&self) -> CssError {
        CssError::InvalidSelector { selector: self.text.to_string(), location: self.location() }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.index;
        while self.peek() == Some(&Token::Whitespace) {
            self.index += 1;
        }
        self.index != start
    }

    fn selector_list(&mut self) -> CssResult<Vec<Selector>> {
        let mut list = Vec::new();
        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(list);
        }
        loop {
            list.push(self.selector()?);
            match self.next() {
                None => return Ok(list),
                Some(Token::Comma) => {}
                Some(_) => {
                    self.index -= 1;
                    return Err(self.invalid());
                }
            }
        }
    }

    /// Compound selectors and combinators up to a comma or the end
    fn selector(&mut self) -> CssResult<Selector> {
        let mut parts: Vec<SelectorPart> = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let open = matches!(parts.last(), Some(part) if !matches!(part, SelectorPart::Combinator(_)));

            let combinator = match self.peek() {
                None | Some(Token::Comma) => break,
                Some(Token::Delim('>')) => Some(Combinator::Child),
                Some(Token::Delim('+')) => Some(Combinator::NextSibling),
                Some(Token::Delim('~')) => Some(Combinator::SubsequentSibling),
                _ => None,
            };
            if let Some(combinator) = combinator {
                self.index += 1;
                // A leading combinator makes a relative selector, as in `:has(> a)`
                if open {
                    parts.push(SelectorPart::Combinator(combinator));
                } else if !parts.is_empty() {
                    return Err(self.invalid());
                }
                continue;
            }

            let part = self.simple()?;
            if spaced && open {
                parts.push(SelectorPart::Combinator(Combinator::Descendant));
            }
            parts.push(part);
        }

        if matches!(parts.last(), None | Some(SelectorPart::Combinator(_))) {
            return Err(self.invalid());
        }
        Ok(Selector { parts })
    }

    fn simple(&mut self) -> CssResult<SelectorPart> {
        let location = self.index;
        let part = match self.next() {
            Some(Token::Delim('*')) => SelectorPart::Universal,
            Some(Token::Delim('&')) => SelectorPart::Nesting,
            Some(Token::Ident(name)) => SelectorPart::Type(name.to_ascii_lowercase()),
            Some(Token::Hash(name)) => SelectorPart::Id(name),
            Some(Token::Delim('.')) => match self.next() {
                Some(Token::Ident(name)) => SelectorPart::Class(name),
                _ => return Err(self.invalid_at(location)),
            },
            Some(Token::OpenSquare) => SelectorPart::Attribute(self.until(Token::CloseSquare, location)?),
            Some(Token::Colon) => self.pseudo(location)?,
            _ => return Err(self.invalid_at(location)),
        };
        Ok(part)
    }

    fn invalid_at(&mut self, index: usize) -> CssError {
        self.index = index;
        self.invalid()
    }

    /// Text up to the matching `close`, which is consumed
    fn until(&mut self, close: Token, start: usize) -> CssResult<String> {
        let mut depth = 0usize;
        let mut text = String::new();
        loop {
            let token = self.next().ok_or_else(|| self.invalid_at(start))?;
            match token {
                Token::OpenParen | Token::Function(_) | Token::OpenSquare => depth += 1,
                ref t if *t == close && depth == 0 => return Ok(text.trim().to_string()),
                Token::CloseParen | Token::CloseSquare => depth = depth.saturating_sub(1),
                _ => {}
            }
            text.push_str(&token.to_css());
        }
    }

    fn pseudo(&mut self, start: usize) -> CssResult<SelectorPart> {
        let element = self.peek() == Some(&Token::Colon);
        if element {
            self.index += 1;
        }
        let (name, args) = match self.next() {
            Some(Token::Ident(name)) => (name.to_ascii_lowercase(), None),
            Some(Token::Function(name)) => (name.to_ascii_lowercase(), Some(self.until(Token::CloseParen, start)?)),
            _ => return Err(self.invalid_at(start)),
        };

        if element || LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
            return Ok(SelectorPart::PseudoElement(name));
        }
        let selectors = match &args {
            Some(text) if NESTED_LIST_PSEUDOS.contains(&name.as_str()) => Selector::parse_list(text)?,
            _ => Vec::new(),
        };
        Ok(SelectorPart::PseudoClass { name, args, selectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(input: &str) -> Vec<String> {
        Selector::parse_list(input)
            .unwrap()
            .iter()
            .flat_map(|s| s.local_class_names())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_compound() {
        let selector = Selector::parse("DIV.container#main").unwrap();
        assert_eq!(
            selector.parts,
            vec![
                SelectorPart::Type("div".into()),
                SelectorPart::Class("container".into()),
                SelectorPart::Id("main".into()),
            ]
        );
    }

    #[test]
    fn test_combinators() {
        let combinators = |input: &str| -> Vec<Combinator> {
            Selector::parse(input)
                .unwrap()
                .parts
                .into_iter()
                .filter_map(|p| match p {
                    SelectorPart::Combinator(c) => Some(c),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(combinators("a b"), vec![Combinator::Descendant]);
        assert_eq!(combinators("a>b"), vec![Combinator::Child]);
        assert_eq!(
            combinators("a + b ~ c"),
            vec![Combinator::NextSibling, Combinator::SubsequentSibling]
        );
    }

    #[test]
    fn test_attribute_is_kept_as_text() {
        let selector = Selector::parse("input[type=\"text\" i]").unwrap();
        assert_eq!(selector.parts[1], SelectorPart::Attribute("type=\"text\" i".into()));
    }

    #[test]
    fn test_pseudo_parts() {
        let selector = Selector::parse("a:nth-child(2n+1)::after").unwrap();
        assert!(matches!(
            &selector.parts[1],
            SelectorPart::PseudoClass { name, args: Some(_), selectors } if name == "nth-child" && selectors.is_empty()
        ));
        assert_eq!(selector.parts[2], SelectorPart::PseudoElement("after".into()));

        let legacy = Selector::parse("a:before").unwrap();
        assert_eq!(legacy.parts[1], SelectorPart::PseudoElement("before".into()));
    }

    #[test]
    fn test_list() {
        assert_eq!(Selector::parse_list("div, .class, #id").unwrap().len(), 3);
        assert!(Selector::parse_list("").unwrap().is_empty());
        assert!(Selector::parse("a, b").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        for input in [".a | .b", ".", "a >", "a,", "[x", ":not(.a", "a > > b", ".a {"] {
            assert!(Selector::parse_list(input).is_err(), "{input}");
        }
    }

    #[test]
    fn test_error_points_at_token() {
        let err = Selector::parse_list(".a | .b").unwrap_err();
        assert!(matches!(err, CssError::InvalidSelector { ref selector, .. } if selector == ".a | .b"));
        assert_eq!(err.location().column, 4);
    }

    #[test]
    fn test_classes_across_combinators() {
        assert_eq!(classes("div.a > p.b:hover + [data-x] ~ .c::after"), ["a", "b", "c"]);
    }

    #[test]
    fn test_classes_inside_nested_lists() {
        assert_eq!(classes(":where(.where-selector) a:not(.x, .y)"), ["where-selector", "x", "y"]);
        assert_eq!(classes(".card:has(> .image)"), ["card", "image"]);
    }

    #[test]
    fn test_escaped_class() {
        assert_eq!(classes(".sm\\:flex"), ["sm:flex"]);
    }

    #[test]
    fn test_global_scoping() {
        assert_eq!(classes(":global(.theme-dark) .button"), ["button"]);
        assert_eq!(classes(".root :global .external :local .inner"), ["root", "inner"]);
        assert_eq!(classes(":global .a :local(.b)"), ["b"]);
        assert_eq!(classes(":global .a :not(.b)"), Vec::<String>::new());
    }
}
