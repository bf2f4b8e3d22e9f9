//! Errors raised while reading compiled CSS

use std::fmt;
use thiserror::Error;

pub type CssResult<T> = Result<T, CssError>;

/// Position in the compiled stylesheet. Line and column start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the input
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Location of a position inside a fragment that starts at `self`
    pub fn shifted(self, inner: SourceLocation) -> Self {
        let column = if inner.line == 1 {
            self.column + inner.column - 1
        } else {
            inner.column
        };
        Self::new(self.line + inner.line - 1, column, self.offset + inner.offset)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum CssError {
    #[error("{message} at {location}")]
    Syntax { message: String, location: SourceLocation },

    #[error("Unclosed block at {location}")]
    UnclosedBlock { location: SourceLocation },

    #[error("Unclosed string at {location}")]
    UnclosedString { location: SourceLocation },

    #[error("Invalid selector '{selector}' at {location}")]
    InvalidSelector { selector: String, location: SourceLocation },

    #[error("referenced class name \"{name}\" in composes not found")]
    ComposesNotFound { name: String, location: SourceLocation },
}

impl CssError {
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Syntax { message: message.into(), location }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Self::Syntax { location, .. }
            | Self::UnclosedBlock { location }
            | Self::UnclosedString { location }
            | Self::InvalidSelector { location, .. }
            | Self::ComposesNotFound { location, .. } => *location,
        }
    }
}
