//! Typed LESS Compiler
//!
//! Renders LESS stylesheets to CSS, resolves aliased imports and turns a
//! stylesheet file into its list of exported class names.

mod class_names;
mod error;
mod name_format;
mod render;
mod resolver;

pub use class_names::file_to_class_names;
pub use error::{RenderError, RenderErrorKind, RenderResult, ResolveError};
pub use name_format::{expand_formats, multiplex, NameFormat, ParseNameFormatError};
pub use render::{LessRenderer, RenderOptions, Renderer};
pub use resolver::{has_stylesheet_extension, normalize_path, Alias, AliasTable, ImportHook, ImportResolver};
