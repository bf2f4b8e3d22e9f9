//! Compiler error types

use std::path::Path;

use thiserror::Error;
use typed_less_css::CssError;

/// Render operation result type
pub type RenderResult<T> = Result<T, RenderError>;

/// Alias resolution errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid alias config for key: {key}")]
    InvalidAlias { key: String },

    #[error("Invalid aliasPrefix config for key: {prefix}")]
    InvalidAliasPrefix { prefix: String },
}

/// Category of a render failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// A file could not be read or an import could not be resolved
    File,
    /// Malformed LESS input
    Syntax,
    /// Reference to an undefined variable
    Name,
    /// The compiled CSS could not be processed
    Css,
}

/// A failure while compiling a stylesheet, with the location when known
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}{}", location_suffix(.filename, .line, .column))]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
    pub filename: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            filename: None,
            line: None,
            column: None,
        }
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::File, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Syntax, message)
    }

    /// Attach the file and position the error refers to
    pub fn at(mut self, filename: &Path, line: usize, column: usize) -> Self {
        self.filename = Some(filename.display().to_string());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Convert a class name extraction failure for `filename`
    pub fn from_css(err: CssError, filename: &Path) -> Self {
        let location = err.location();
        let message = match &err {
            CssError::ComposesNotFound { .. } => err.to_string(),
            _ => format!("Failed to read compiled CSS: {}", err),
        };
        Self::new(RenderErrorKind::Css, message).at(filename, location.line, location.column)
    }
}

/// ` ({file}[{line}:{column}])`, or just the file when the position is unknown
fn location_suffix(filename: &Option<String>, line: &Option<usize>, column: &Option<usize>) -> String {
    match (filename, line, column) {
        (Some(filename), Some(line), Some(column)) => format!(" ({}[{}:{}])", filename, line, column),
        (Some(filename), _, _) => format!(" ({})", filename),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::InvalidAlias { key: "~missing".to_string() };
        assert_eq!(err.to_string(), "Invalid alias config for key: ~missing");

        let err = ResolveError::InvalidAliasPrefix { prefix: "~".to_string() };
        assert_eq!(err.to_string(), "Invalid aliasPrefix config for key: ~");
    }

    #[test]
    fn test_display_with_location() {
        let err = RenderError::syntax("Unrecognised input").at(&PathBuf::from("/s/a.less"), 3, 7);
        assert_eq!(err.to_string(), "Unrecognised input (/s/a.less[3:7])");
    }

    #[test]
    fn test_display_with_file_only() {
        let mut err = RenderError::file("unreadable");
        err.filename = Some("/s/b.less".to_string());
        assert_eq!(err.to_string(), "unreadable (/s/b.less)");

        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }

    #[test]
    fn test_display_without_location() {
        let err = RenderError::file("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
