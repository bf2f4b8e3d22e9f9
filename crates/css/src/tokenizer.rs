//! Tokenizer for compiled CSS
//!
//! Only selectors and the `composes` property are ever interpreted, so
//! numbers and dimensions stay as their source text and comments fold
//! into whitespace.

use crate::error::{CssError, CssResult, SourceLocation};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Name with escapes resolved, e.g. `sm:flex` for `sm\:flex`
    Ident(String),
    /// Name directly followed by `(`; the paren is part of the token
    Function(String),
    AtKeyword(String),
    /// `#name`, without the hash
    Hash(String),
    /// Quoted string, unquoted
    Quoted(String),
    /// Unquoted `url(...)` contents
    Url(String),
    /// Number, percentage or dimension exactly as written
    Numeric(String),
    Whitespace,
    Colon,
    Semicolon,
    Comma,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    Delim(char),
    Eof,
}

impl Token {
    /// CSS text for the token, with identifiers re-escaped
    pub fn to_css(&self) -> String {
        match self {
            Token::Ident(name) => escape_name(name),
            Token::Function(name) => format!("{}(", escape_name(name)),
            Token::AtKeyword(name) => format!("@{}", escape_name(name)),
            Token::Hash(name) => format!("#{}", escape_name(name)),
            Token::Quoted(text) => {
                let mut out = String::with_capacity(text.len() + 2);
                out.push('"');
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
                out
            }
            Token::Url(url) => format!("url({})", url),
            Token::Numeric(text) => text.clone(),
            Token::Whitespace => " ".into(),
            Token::Colon => ":".into(),
            Token::Semicolon => ";".into(),
            Token::Comma => ",".into(),
            Token::OpenBrace => "{".into(),
            Token::CloseBrace => "}".into(),
            Token::OpenParen => "(".into(),
            Token::CloseParen => ")".into(),
            Token::OpenSquare => "[".into(),
            Token::CloseSquare => "]".into(),
            Token::Delim(c) => c.to_string(),
            Token::Eof => String::new(),
        }
    }
}

fn name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || !c.is_ascii()
}

fn name_char(c: char) -> bool {
    name_start(c) || c == '-' || c.is_ascii_digit()
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    // A leading digit cannot start an identifier, except after `-`
    if let Some(&first) = chars.peek() {
        if first.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", first as u32));
            chars.next();
        }
    }
    for c in chars {
        if !name_char(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1, column: 1 }
    }

    /// Position of the next unread character
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn single(&mut self, token: Token) -> CssResult<Token> {
        self.bump();
        Ok(token)
    }

    /// `\` followed by anything but a newline
    fn at_escape(&self, n: usize) -> bool {
        self.nth(n) == Some('\\') && !matches!(self.nth(n + 1), None | Some('\n'))
    }

    fn at_name_start(&self) -> bool {
        match self.nth(0) {
            Some('-') => match self.nth(1) {
                Some('-') => true,
                Some(c) if name_start(c) => true,
                _ => self.at_escape(1),
            },
            Some(c) if name_start(c) => true,
            _ => self.at_escape(0),
        }
    }

    fn at_number(&self) -> bool {
        let digit = |n: usize| self.nth(n).map_or(false, |c| c.is_ascii_digit());
        match self.nth(0) {
            Some('+') | Some('-') => digit(1) || (self.nth(1) == Some('.') && digit(2)),
            Some('.') => digit(1),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    /// Skip whitespace and comments, reporting whether anything was skipped
    fn skip_trivia(&mut self) -> bool {
        let start = self.pos;
        loop {
            if self.nth(0).map_or(false, |c| c.is_ascii_whitespace()) {
                self.bump();
            } else if self.rest().starts_with("/*") {
                self.bump();
                self.bump();
                while !self.rest().is_empty() && !self.rest().starts_with("*/") {
                    self.bump();
                }
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
        self.pos != start
    }

    /// Resolve the escape after a consumed `\`
    fn escaped(&mut self) -> char {
        let mut hex = String::new();
        while hex.len() < 6 && self.nth(0).map_or(false, |c| c.is_ascii_hexdigit()) {
            hex.extend(self.bump());
        }
        if hex.is_empty() {
            return self.bump().unwrap_or('\u{FFFD}');
        }
        if self.nth(0).map_or(false, |c| c.is_ascii_whitespace()) {
            self.bump();
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .filter(|c| *c != '\0')
            .unwrap_or('\u{FFFD}')
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        loop {
            match self.nth(0) {
                Some(c) if name_char(c) => {
                    self.bump();
                    name.push(c);
                }
                Some('\\') if self.at_escape(0) => {
                    self.bump();
                    name.push(self.escaped());
                }
                _ => return name,
            }
        }
    }

    fn quoted(&mut self) -> CssResult<Token> {
        let start = self.location();
        let quote = self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(CssError::UnclosedString { location: start }),
                Some(c) if Some(c) == quote => return Ok(Token::Quoted(text)),
                Some('\\') => match self.nth(0) {
                    None => {}
                    Some('\n') => {
                        self.bump();
                    }
                    Some(_) => text.push(self.escaped()),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn numeric(&mut self) -> Token {
        let mut text = String::new();
        if matches!(self.nth(0), Some('+') | Some('-')) {
            text.extend(self.bump());
        }
        while self.nth(0).map_or(false, |c| c.is_ascii_digit()) {
            text.extend(self.bump());
        }
        if self.nth(0) == Some('.') && self.nth(1).map_or(false, |c| c.is_ascii_digit()) {
            text.extend(self.bump());
            while self.nth(0).map_or(false, |c| c.is_ascii_digit()) {
                text.extend(self.bump());
            }
        }
        if self.nth(0) == Some('%') {
            text.extend(self.bump());
        } else if self.at_name_start() {
            text.push_str(&self.name());
        }
        Token::Numeric(text)
    }

    fn ident_like(&mut self) -> CssResult<Token> {
        let name = self.name();
        if self.nth(0) != Some('(') {
            return Ok(Token::Ident(name));
        }
        self.bump();
        if !name.eq_ignore_ascii_case("url") {
            return Ok(Token::Function(name));
        }

        // `url("...")` keeps the string as its own token
        let mark = (self.pos, self.line, self.column);
        self.skip_trivia();
        if matches!(self.nth(0), Some('"') | Some('\'')) {
            (self.pos, self.line, self.column) = mark;
            return Ok(Token::Function(name));
        }
        self.url()
    }

    fn url(&mut self) -> CssResult<Token> {
        let start = self.location();
        let mut url = String::new();
        loop {
            match self.nth(0) {
                None => return Err(CssError::syntax("Unclosed url()", start)),
                Some(')') => {
                    self.bump();
                    return Ok(Token::Url(url));
                }
                Some(c) if c.is_ascii_whitespace() => {
                    self.skip_trivia();
                    if self.nth(0) != Some(')') {
                        return Err(CssError::syntax("Whitespace inside url()", self.location()));
                    }
                }
                Some('\\') if self.at_escape(0) => {
                    self.bump();
                    url.push(self.escaped());
                }
                Some(c @ ('"' | '\'' | '(')) => {
                    return Err(CssError::syntax(format!("Unexpected '{}' inside url()", c), self.location()));
                }
                Some(c) => {
                    self.bump();
                    url.push(c);
                }
            }
        }
    }

    pub fn next_token(&mut self) -> CssResult<Token> {
        if self.skip_trivia() {
            return Ok(Token::Whitespace);
        }
        let Some(c) = self.nth(0) else {
            return Ok(Token::Eof);
        };

        match c {
            ':' => self.single(Token::Colon),
            ';' => self.single(Token::Semicolon),
            ',' => self.single(Token::Comma),
            '{' => self.single(Token::OpenBrace),
            '}' => self.single(Token::CloseBrace),
            '(' => self.single(Token::OpenParen),
            ')' => self.single(Token::CloseParen),
            '[' => self.single(Token::OpenSquare),
            ']' => self.single(Token::CloseSquare),
            '"' | '\'' => self.quoted(),
            '#' if self.nth(1).map_or(false, name_char) || self.at_escape(1) => {
                self.bump();
                Ok(Token::Hash(self.name()))
            }
            '@' => {
                self.bump();
                if self.at_name_start() {
                    Ok(Token::AtKeyword(self.name()))
                } else {
                    Ok(Token::Delim('@'))
                }
            }
            _ if self.at_number() => Ok(self.numeric()),
            _ if self.at_name_start() => self.ident_like(),
            _ => self.single(Token::Delim(c)),
        }
    }

    /// Every token up to, not including, the end of input
    pub fn tokenize_all(&mut self) -> CssResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token()? {
                Token::Eof => return Ok(tokens),
                token => tokens.push(token),
            }
        }
    }

    /// Like `tokenize_all`, pairing each token with where it starts
    pub fn tokenize_located(&mut self) -> CssResult<Vec<(Token, SourceLocation)>> {
        let mut tokens = Vec::new();
        loop {
            let location = self.location();
            match self.next_token()? {
                Token::Eof => return Ok(tokens),
                token => tokens.push((token, location)),
            }
        }
    }
}
