//! Class name transforms

use std::fmt;
use std::str::FromStr;

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How exported class names are rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameFormat {
    /// `some-class` -> `someClass`
    Camel,
    /// camel case, only for names containing `-`
    Dashes,
    /// `someClass` -> `some-class`
    Kebab,
    /// unchanged
    None,
    /// same as kebab
    Param,
    /// `some-class` -> `some_class`
    Snake,
    /// every transform above
    All,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid name format '{0}'. Expected one of: camel, dashes, kebab, none, param, snake, all")]
pub struct ParseNameFormatError(pub String);

impl NameFormat {
    /// Every format with a transform of its own
    pub const TRANSFORMS: [NameFormat; 6] = [
        NameFormat::Camel,
        NameFormat::Dashes,
        NameFormat::Kebab,
        NameFormat::None,
        NameFormat::Param,
        NameFormat::Snake,
    ];

    pub const DEFAULT: NameFormat = NameFormat::Camel;

    pub fn as_str(self) -> &'static str {
        match self {
            NameFormat::Camel => "camel",
            NameFormat::Dashes => "dashes",
            NameFormat::Kebab => "kebab",
            NameFormat::None => "none",
            NameFormat::Param => "param",
            NameFormat::Snake => "snake",
            NameFormat::All => "all",
        }
    }

    /// Apply the transform to one class name. `All` is expanded by
    /// [`expand_formats`] and leaves the name unchanged here.
    pub fn transform(self, name: &str) -> String {
        match self {
            NameFormat::Camel => name.to_lower_camel_case(),
            NameFormat::Dashes if name.contains('-') => name.to_lower_camel_case(),
            NameFormat::Kebab | NameFormat::Param => name.to_kebab_case(),
            NameFormat::Snake => name.to_snake_case(),
            NameFormat::Dashes | NameFormat::None | NameFormat::All => name.to_string(),
        }
    }
}

impl fmt::Display for NameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameFormat {
    type Err = ParseNameFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camel" => Ok(NameFormat::Camel),
            "dashes" => Ok(NameFormat::Dashes),
            "kebab" => Ok(NameFormat::Kebab),
            "none" => Ok(NameFormat::None),
            "param" => Ok(NameFormat::Param),
            "snake" => Ok(NameFormat::Snake),
            "all" => Ok(NameFormat::All),
            other => Err(ParseNameFormatError(other.to_string())),
        }
    }
}

/// The transforms to run: the default when none are given, every
/// transform when `all` is present.
pub fn expand_formats(formats: &[NameFormat]) -> Vec<NameFormat> {
    if formats.is_empty() {
        return vec![NameFormat::DEFAULT];
    }
    if formats.contains(&NameFormat::All) {
        return NameFormat::TRANSFORMS.to_vec();
    }
    let mut expanded = Vec::with_capacity(formats.len());
    for format in formats {
        if !expanded.contains(format) {
            expanded.push(*format);
        }
    }
    expanded
}

/// Run every class name through every transform, collapsing identical
/// results, sorted by code point.
pub fn multiplex(names: &[String], formats: &[NameFormat]) -> Vec<String> {
    let formats = expand_formats(formats);
    let mut transformed = FxHashSet::default();

    for name in names {
        for format in &formats {
            transformed.insert(format.transform(name));
        }
    }

    let mut result: Vec<String> = transformed.into_iter().collect();
    result.sort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn complex() -> Vec<String> {
        names(&["some-styles", "nested-class", "nested-another", "number-1", "where-selector"])
    }

    #[test]
    fn test_default_is_camel() {
        assert_eq!(
            multiplex(&complex(), &[]),
            vec!["nestedAnother", "nestedClass", "number1", "someStyles", "whereSelector"]
        );
    }

    #[test]
    fn test_kebab_and_param() {
        let expected = vec!["nested-another", "nested-class", "number-1", "some-styles", "where-selector"];
        assert_eq!(multiplex(&complex(), &[NameFormat::Kebab]), expected);
        assert_eq!(multiplex(&complex(), &[NameFormat::Param]), expected);
    }

    #[test]
    fn test_snake() {
        assert_eq!(
            multiplex(&complex(), &[NameFormat::Snake]),
            vec!["nested_another", "nested_class", "number_1", "some_styles", "where_selector"]
        );
    }

    #[test]
    fn test_dashes_only_touches_dashed_names() {
        let dashes = names(&["App", "App-Header", "Logo"]);
        assert_eq!(multiplex(&dashes, &[NameFormat::Dashes]), vec!["App", "Logo", "appHeader"]);
        assert_eq!(multiplex(&dashes, &[NameFormat::None]), vec!["App", "App-Header", "Logo"]);
    }

    #[test]
    fn test_all_expands_every_transform() {
        assert_eq!(
            multiplex(&complex(), &[NameFormat::All]),
            vec![
                "nested-another",
                "nested-class",
                "nestedAnother",
                "nestedClass",
                "nested_another",
                "nested_class",
                "number-1",
                "number1",
                "number_1",
                "some-styles",
                "someStyles",
                "some_styles",
                "where-selector",
                "whereSelector",
                "where_selector",
            ]
        );
    }

    #[test]
    fn test_all_is_superset_of_each_format() {
        let all = multiplex(&complex(), &[NameFormat::All]);
        for format in NameFormat::TRANSFORMS {
            for name in multiplex(&complex(), &[format]) {
                assert!(all.contains(&name), "{} missing from all ({})", name, format);
            }
        }
    }

    #[test]
    fn test_multiple_formats() {
        assert_eq!(
            multiplex(&complex(), &[NameFormat::Kebab, NameFormat::Snake]),
            vec![
                "nested-another",
                "nested-class",
                "nested_another",
                "nested_class",
                "number-1",
                "number_1",
                "some-styles",
                "some_styles",
                "where-selector",
                "where_selector",
            ]
        );
    }

    #[test]
    fn test_deterministic_order() {
        let first = multiplex(&complex(), &[NameFormat::All]);
        let second = multiplex(&complex(), &[NameFormat::All]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("snake".parse::<NameFormat>().unwrap(), NameFormat::Snake);
        assert_eq!(NameFormat::Param.to_string(), "param");
        let err = "shout".parse::<NameFormat>().unwrap_err();
        assert!(err.to_string().starts_with("Invalid name format 'shout'"));
    }

    #[test]
    fn test_serde_lowercase() {
        let formats: Vec<NameFormat> = serde_json::from_str(r#"["camel", "all"]"#).unwrap();
        assert_eq!(formats, vec![NameFormat::Camel, NameFormat::All]);
    }
}
