//! Typed LESS TypeScript
//!
//! Type definition synthesis for class name lists, artifact path
//! derivation and optional formatting of the generated text.

mod declarations;
mod definition_path;
mod formatter;

pub use declarations::{
    class_names_to_type_definitions, ExportType, ParseOptionError, QuoteType, SkipReason, SkippedClassName,
    TypeDefinitionOptions, TypeDefinitions, RESERVED_KEYWORDS,
};
pub use definition_path::type_definition_path;
pub use formatter::{Formatter, Passthrough, Prettier};
