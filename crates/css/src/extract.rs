//! Class name extraction
//!
//! Collects the class names a compiled stylesheet exports under CSS-modules
//! scoping, and validates `composes` declarations against them.

use log::debug;
use rustc_hash::FxHashSet;

use crate::error::{CssError, CssResult};
use crate::parser::{StyleRule, Stylesheet};

/// Where the names of a `composes` declaration come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposesSource {
    /// Classes of the same stylesheet
    Local,
    /// `from global`
    Global,
    /// `from "path"`
    File(String),
}

/// A parsed `composes` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composes {
    pub names: Vec<String>,
    pub source: ComposesSource,
}

impl Composes {
    /// Parse the value of a `composes` (or `compose-with`) declaration
    pub fn parse(value: &str) -> Self {
        let words: Vec<&str> = value.split_whitespace().collect();
        match words.iter().position(|w| *w == "from") {
            Some(index) => {
                let names = words[..index].iter().map(|w| w.to_string()).collect();
                let source = words[index + 1..].join(" ");
                let source = if source == "global" {
                    ComposesSource::Global
                } else {
                    ComposesSource::File(unquote(&source).to_string())
                };
                Self { names, source }
            }
            None => Self {
                names: words.iter().map(|w| w.to_string()).collect(),
                source: ComposesSource::Local,
            },
        }
    }
}

fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    trimmed
}

fn is_composes(property: &str) -> bool {
    property == "composes" || property == "compose-with"
}

/// Extract the exported class names of a compiled stylesheet, deduplicated
/// in discovery order.
pub fn extract_class_names(css: &str) -> CssResult<Vec<String>> {
    let stylesheet = Stylesheet::parse(css)?;
    let rules = stylesheet.style_rules();

    let mut seen = FxHashSet::default();
    let mut names = Vec::new();

    for rule in &rules {
        for selector in &rule.selectors {
            for name in selector.local_class_names() {
                if seen.insert(name) {
                    names.push(name.to_string());
                }
            }
        }
    }

    for rule in &rules {
        check_composes(rule, &seen)?;
    }

    debug!("extracted {} class names", names.len());
    Ok(names)
}

fn check_composes(rule: &StyleRule, local: &FxHashSet<&str>) -> CssResult<()> {
    for decl in rule.declarations.iter().filter(|d| is_composes(&d.property)) {
        let composes = Composes::parse(&decl.value);
        if composes.source != ComposesSource::Local {
            continue;
        }
        if let Some(missing) = composes.names.iter().find(|name| !local.contains(name.as_str())) {
            return Err(CssError::ComposesNotFound {
                name: missing.clone(),
                location: decl.location,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_discovery_order() {
        let css = ".some-styles { color: red; }\n.nested-class .nested-another { color: blue; }";
        assert_eq!(
            extract_class_names(css).unwrap(),
            vec!["some-styles", "nested-class", "nested-another"]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let css = ".a { color: red; } .a:hover { color: blue; } .b.a { color: green; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_ignores_non_class_selectors() {
        let css = "div, #main, *, [data-x=\"y\"], a::before { color: red; }";
        assert!(extract_class_names(css).unwrap().is_empty());
    }

    #[test]
    fn test_empty_stylesheet_is_valid() {
        assert!(extract_class_names("").unwrap().is_empty());
    }

    #[test]
    fn test_classes_inside_media_and_where() {
        let css = "@media (max-width: 100px) { .small { color: red; } }\n:where(.where-selector) { color: red; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["small", "where-selector"]);
    }

    #[test]
    fn test_keyframes_and_strings_produce_nothing() {
        let css = "@keyframes spin { from { opacity: 0; } to { opacity: 1; } }\n.a::after { content: \".fake\"; }\n/* .comment */";
        assert_eq!(extract_class_names(css).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_global_classes_are_not_exported() {
        let css = ":global(.theme) .button { color: red; }\n:global .outside { color: red; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["button"]);
    }

    #[test]
    fn test_local_composes() {
        let css = ".base { color: red; }\n.composed-class { composes: base; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["base", "composed-class"]);
    }

    #[test]
    fn test_local_composes_defined_later() {
        let css = ".composed-class { composes: base; }\n.base { color: red; }";
        assert!(extract_class_names(css).is_ok());
    }

    #[test]
    fn test_missing_local_composes() {
        let css = ".composed-class {\n  composes: missing;\n}";
        let err = extract_class_names(css).unwrap_err();
        assert!(matches!(err, CssError::ComposesNotFound { ref name, .. } if name == "missing"));
        assert_eq!(err.location().line, 2);
    }

    #[test]
    fn test_composes_from_file_is_not_reexported() {
        let css = ".composed-class { composes: button from \"/abs/composes.less\"; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["composed-class"]);
    }

    #[test]
    fn test_composes_from_global_is_ignored() {
        let css = ".a { composes: b c from global; }";
        assert_eq!(extract_class_names(css).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_parse_composes() {
        assert_eq!(
            Composes::parse("a b from './x.less'"),
            Composes {
                names: vec!["a".to_string(), "b".to_string()],
                source: ComposesSource::File("./x.less".to_string()),
            }
        );
        assert_eq!(Composes::parse("a").source, ComposesSource::Local);
        assert_eq!(Composes::parse("a from global").source, ComposesSource::Global);
    }

    #[test]
    fn test_round_trip_from_named_declarations() {
        let names = ["alpha", "beta", "gamma"];
        let css: String = names.iter().map(|n| format!(".{} {{ color: red; }}\n", n)).collect();
        assert_eq!(extract_class_names(&css).unwrap(), names);
    }
}
