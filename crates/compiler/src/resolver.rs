//! Import aliasing
//!
//! Rewrites `@import` tokens through exact-match aliases and prefix aliases
//! before the renderer falls back to its default lookup.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::error::ResolveError;

/// Extensions tried, in priority order, for tokens without one
const EXTENSIONS: &[&str] = &["less", "css"];

/// Replacement for an aliased import token
#[derive(Clone)]
pub enum Alias {
    /// Literal replacement path (or prefix replacement)
    Path(String),
    /// Computes the replacement from the full import token
    Resolver(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Alias {
    pub fn resolver(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Resolver(Arc::new(f))
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for Alias {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Alias {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl<'de> Deserialize<'de> for Alias {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Alias::Path)
    }
}

/// Ordered alias map; iteration order is declaration order
pub type AliasTable = IndexMap<String, Alias>;

/// Hook the renderer consults before its default import lookup
pub trait ImportHook: Send + Sync {
    /// Resolve `token` imported from a file in `current_dir`.
    ///
    /// `Ok(None)` means the hook does not handle the token.
    fn resolve(&self, token: &str, current_dir: &Path) -> Result<Option<PathBuf>, ResolveError>;
}

/// Alias-aware import resolver
#[derive(Debug, Clone, Default)]
pub struct ImportResolver {
    aliases: AliasTable,
    alias_prefixes: AliasTable,
    include_paths: Vec<PathBuf>,
    root: PathBuf,
}

impl ImportResolver {
    /// `include_paths` are interpreted relative to `root` (the working directory)
    pub fn new(aliases: AliasTable, alias_prefixes: AliasTable, include_paths: Vec<PathBuf>, root: PathBuf) -> Self {
        Self {
            aliases,
            alias_prefixes,
            include_paths,
            root,
        }
    }

    /// Whether any alias or prefix is configured
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.alias_prefixes.is_empty()
    }

    /// Resolve an import token to an existing file
    pub fn resolve(&self, token: &str, current_dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(alias) = self.aliases.get(token) {
            let candidate = match alias {
                Alias::Path(path) => path.clone(),
                Alias::Resolver(f) => f(token),
            };
            debug!("alias {} -> {}", token, candidate);
            return self
                .validate(&candidate, current_dir)
                .map(Some)
                .ok_or_else(|| ResolveError::InvalidAlias { key: token.to_string() });
        }

        let matched = self
            .alias_prefixes
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix.as_str()));

        if let Some((prefix, alias)) = matched {
            let candidate = match alias {
                Alias::Path(path) => format!("{}{}", path, &token[prefix.len()..]),
                Alias::Resolver(f) => f(token),
            };
            debug!("alias prefix {} rewrote {} -> {}", prefix, token, candidate);
            return self
                .validate(&candidate, current_dir)
                .map(Some)
                .ok_or_else(|| ResolveError::InvalidAliasPrefix { prefix: prefix.clone() });
        }

        Ok(None)
    }

    /// Try the current directory, then each include path
    fn validate(&self, candidate: &str, current_dir: &Path) -> Option<PathBuf> {
        normalize_path(candidate, current_dir).or_else(|| {
            self.include_paths
                .iter()
                .find_map(|include| normalize_path(candidate, &self.root.join(include)))
        })
    }
}

impl ImportHook for ImportResolver {
    fn resolve(&self, token: &str, current_dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        ImportResolver::resolve(self, token, current_dir)
    }
}

/// Whether `name` already ends in a recognised stylesheet extension
pub fn has_stylesheet_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Accept `candidate` under `dir` as-is when it has an extension, else try
/// `.less` then `.css`.
pub fn normalize_path(candidate: &str, dir: &Path) -> Option<PathBuf> {
    let base = dir.join(candidate);

    if has_stylesheet_extension(candidate) {
        return base.is_file().then_some(base);
    }

    EXTENSIONS.iter().find_map(|ext| {
        let mut path = OsString::from(base.as_os_str());
        path.push(".");
        path.push(ext);
        let path = PathBuf::from(path);
        path.is_file().then_some(path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("complex.less"), ".some-styles { color: red; }").unwrap();
        fs::write(dir.path().join("style.less"), ".a { color: red; }").unwrap();
        fs::write(dir.path().join("plain.css"), ".b { color: red; }").unwrap();
        fs::create_dir(dir.path().join("nested-styles")).unwrap();
        fs::write(dir.path().join("nested-styles/style.less"), ".c { color: red; }").unwrap();
        fs::create_dir(dir.path().join("include")).unwrap();
        fs::write(dir.path().join("include/vars.less"), "@x: 1;").unwrap();
        dir
    }

    fn table(entries: &[(&str, &str)]) -> AliasTable {
        entries.iter().map(|(k, v)| (k.to_string(), Alias::from(*v))).collect()
    }

    #[test]
    fn test_exact_alias() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            table(&[("~fancy-import", "complex"), ("~another", "style")]),
            AliasTable::new(),
            Vec::new(),
            dir.path().to_path_buf(),
        );

        let resolved = resolver.resolve("~fancy-import", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("complex.less")));

        let resolved = resolver.resolve("~another", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("style.less")));
    }

    #[test]
    fn test_function_alias_receives_token() {
        let dir = fixture();
        let mut aliases = AliasTable::new();
        aliases.insert("~fn".to_string(), Alias::resolver(|token| token.replace("~fn", "plain")));
        let resolver = ImportResolver::new(aliases, AliasTable::new(), Vec::new(), dir.path().to_path_buf());

        let resolved = resolver.resolve("~fn", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("plain.css")));
    }

    #[test]
    fn test_alias_falls_back_to_include_paths() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            table(&[("~vars", "vars")]),
            AliasTable::new(),
            vec![PathBuf::from("include")],
            dir.path().to_path_buf(),
        );

        let resolved = resolver.resolve("~vars", &dir.path().join("nested-styles")).unwrap();
        assert_eq!(resolved, Some(dir.path().join("include").join("vars.less")));
    }

    #[test]
    fn test_invalid_alias_reports_key() {
        let dir = fixture();
        let resolver =
            ImportResolver::new(table(&[("~gone", "missing")]), AliasTable::new(), Vec::new(), dir.path().to_path_buf());

        let err = resolver.resolve("~gone", dir.path()).unwrap_err();
        assert_eq!(err, ResolveError::InvalidAlias { key: "~gone".to_string() });
    }

    #[test]
    fn test_prefix_alias() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            AliasTable::new(),
            table(&[("~", "nested-styles/")]),
            Vec::new(),
            dir.path().to_path_buf(),
        );

        let resolved = resolver.resolve("~style", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("nested-styles/style.less")));
    }

    #[test]
    fn test_first_declared_prefix_wins() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            AliasTable::new(),
            table(&[("~", "nested-styles/"), ("~st", "does-not-exist/")]),
            Vec::new(),
            dir.path().to_path_buf(),
        );

        let resolved = resolver.resolve("~style", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("nested-styles/style.less")));
    }

    #[test]
    fn test_invalid_prefix_reports_prefix() {
        let dir = fixture();
        let resolver =
            ImportResolver::new(AliasTable::new(), table(&[("~", "nope/")]), Vec::new(), dir.path().to_path_buf());

        let err = resolver.resolve("~style", dir.path()).unwrap_err();
        assert_eq!(err, ResolveError::InvalidAliasPrefix { prefix: "~".to_string() });
    }

    #[test]
    fn test_exact_alias_beats_prefix() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            table(&[("~style", "complex")]),
            table(&[("~", "nested-styles/")]),
            Vec::new(),
            dir.path().to_path_buf(),
        );

        let resolved = resolver.resolve("~style", dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("complex.less")));
    }

    #[test]
    fn test_unaliased_token_is_not_handled() {
        let dir = fixture();
        let resolver = ImportResolver::new(
            table(&[("~a", "complex")]),
            table(&[("~", "nested-styles/")]),
            Vec::new(),
            dir.path().to_path_buf(),
        );
        assert_eq!(resolver.resolve("./style.less", dir.path()).unwrap(), None);
    }

    #[test]
    fn test_explicit_extension_must_exist_exactly() {
        let dir = fixture();
        assert_eq!(normalize_path("style.less", dir.path()), Some(dir.path().join("style.less")));
        assert_eq!(normalize_path("style.css", dir.path()), None);
        assert_eq!(normalize_path("plain", dir.path()), Some(dir.path().join("plain.css")));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_stylesheet_extension("a.LESS"));
        assert!(has_stylesheet_extension("dir/a.Css"));
        assert!(!has_stylesheet_extension("a.scss"));
        assert!(!has_stylesheet_extension("complex"));
    }

    #[test]
    fn test_deserialize_alias_from_string() {
        let table: AliasTable = serde_json::from_str(r#"{"~a": "x", "~b": "y"}"#).unwrap();
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["~a", "~b"]);
        assert!(matches!(&table["~a"], Alias::Path(p) if p == "x"));
    }
}
