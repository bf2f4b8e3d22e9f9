//! Type definition text for a list of class names

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Words that cannot be used as an exported binding
pub const RESERVED_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
    "await",
];

/// Shape of the generated module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// One `export declare const` per class name
    #[default]
    Named,
    /// A default-exported object typed by an interface
    Default,
}

/// Quote used around keys of the default export type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteType {
    #[default]
    Single,
    Double,
}

impl QuoteType {
    fn as_char(self) -> char {
        match self {
            QuoteType::Single => '\'',
            QuoteType::Double => '"',
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {option} '{value}'. Expected one of: {expected}")]
pub struct ParseOptionError {
    pub option: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for ExportType {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "named" => Ok(ExportType::Named),
            "default" => Ok(ExportType::Default),
            other => Err(ParseOptionError {
                option: "export type",
                value: other.to_string(),
                expected: "named, default",
            }),
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportType::Named => "named",
            ExportType::Default => "default",
        })
    }
}

impl FromStr for QuoteType {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(QuoteType::Single),
            "double" => Ok(QuoteType::Double),
            other => Err(ParseOptionError {
                option: "quote type",
                value: other.to_string(),
                expected: "single, double",
            }),
        }
    }
}

impl fmt::Display for QuoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuoteType::Single => "single",
            QuoteType::Double => "double",
        })
    }
}

/// Options that shape the generated text
#[derive(Debug, Clone)]
pub struct TypeDefinitionOptions {
    pub banner: String,
    pub export_type: ExportType,
    pub export_type_name: String,
    pub export_type_interface: String,
    pub quote_type: QuoteType,
}

impl Default for TypeDefinitionOptions {
    fn default() -> Self {
        Self {
            banner: String::new(),
            export_type: ExportType::Named,
            export_type_name: "ClassNames".to_string(),
            export_type_interface: "Styles".to_string(),
            quote_type: QuoteType::Single,
        }
    }
}

/// Why a class name was left out of a named export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ReservedKeyword,
    ContainsDashes,
    InvalidCharacters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClassName {
    pub name: String,
    pub reason: SkipReason,
}

impl SkippedClassName {
    /// Warning shown to the user for this name
    pub fn message(&self) -> String {
        match self.reason {
            SkipReason::ReservedKeyword => format!(
                "[SKIPPING] '{}' is a reserved keyword (consider renaming or using --exportType default).",
                self.name
            ),
            SkipReason::ContainsDashes => format!(
                "[SKIPPING] '{}' contains dashes (consider using 'camelCase' or 'dashes' for --nameFormat or using --exportType default).",
                self.name
            ),
            SkipReason::InvalidCharacters => format!(
                "[SKIPPING] '{}' contains characters that are invalid in a variable name (consider renaming or using --exportType default).",
                self.name
            ),
        }
    }
}

/// Generated text, if any, and the names that could not be exported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDefinitions {
    pub text: Option<String>,
    pub skipped: Vec<SkippedClassName>,
}

fn skip_reason(name: &str) -> Option<SkipReason> {
    if RESERVED_KEYWORDS.contains(&name) {
        return Some(SkipReason::ReservedKeyword);
    }
    if name.contains('-') {
        return Some(SkipReason::ContainsDashes);
    }
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return Some(SkipReason::InvalidCharacters);
    }
    None
}

/// Build the type definition text for `class_names`.
///
/// Returns no text when there is nothing to export.
pub fn class_names_to_type_definitions(class_names: &[String], options: &TypeDefinitionOptions) -> TypeDefinitions {
    if class_names.is_empty() {
        return TypeDefinitions::default();
    }

    let mut skipped = Vec::new();
    let body = match options.export_type {
        ExportType::Named => {
            let mut lines = String::new();
            for name in class_names {
                match skip_reason(name) {
                    Some(reason) => skipped.push(SkippedClassName {
                        name: name.clone(),
                        reason,
                    }),
                    None => lines.push_str(&format!("export declare const {}: string;\n", name)),
                }
            }
            debug!("{} of {} class names exported", class_names.len() - skipped.len(), class_names.len());
            if lines.is_empty() {
                return TypeDefinitions { text: None, skipped };
            }
            lines
        }
        ExportType::Default => default_export(class_names, options),
    };

    let text = if options.banner.is_empty() {
        body
    } else {
        format!("{}\n{}", options.banner, body)
    };

    TypeDefinitions {
        text: Some(text),
        skipped,
    }
}

fn default_export(class_names: &[String], options: &TypeDefinitionOptions) -> String {
    let quote = options.quote_type.as_char();
    let mut out = format!("export type {} = {{\n", options.export_type_interface);
    for name in class_names {
        out.push_str(&format!("  {q}{}{q}: string;\n", name, q = quote));
    }
    out.push_str("};\n\n");
    out.push_str(&format!(
        "export type {} = keyof {};\n\n",
        options.export_type_name, options.export_type_interface
    ));
    out.push_str(&format!("declare const styles: {};\n\n", options.export_type_interface));
    out.push_str("export default styles;\n");
    out
}
