//! LESS rendering
//!
//! The [`Renderer`] trait compiles a stylesheet source into plain CSS.
//! [`LessRenderer`] implements the subset of LESS needed to produce
//! resolved, flattened selectors: imports, nesting, `&`, variables,
//! arithmetic, mixins with guards, detached rulesets and at-rule bubbling.

mod emit;
mod expr;
mod mixin;
mod parse;
mod scope;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashSet;

use crate::error::{RenderError, RenderResult};
use crate::resolver::ImportHook;
use emit::Emitter;
use parse::{AtRuleBody, Location, Node, Parser};
use scope::Scope;

/// Options for a single render
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Extra directories searched for imports, after the importing file's own
    pub search_paths: Vec<PathBuf>,
    /// LESS source prepended to every file
    pub additional_data: Option<String>,
    /// Consulted before the default import lookup
    pub hook: Option<Arc<dyn ImportHook>>,
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("search_paths", &self.search_paths)
            .field("additional_data", &self.additional_data)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Compiles stylesheet source to CSS
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str, filename: &Path, options: &RenderOptions) -> RenderResult<String>;
}

/// Built-in LESS renderer
#[derive(Debug, Default, Clone, Copy)]
pub struct LessRenderer;

impl LessRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for LessRenderer {
    fn render(&self, source: &str, filename: &Path, options: &RenderOptions) -> RenderResult<String> {
        let mut compilation = Compilation::new(options, filename);

        let mut nodes = Vec::new();
        if let Some(data) = options.additional_data.as_deref().filter(|d| !d.is_empty()) {
            nodes.extend(Parser::new(data, 0, filename).parse()?);
        }
        nodes.extend(Parser::new(source, 0, filename).parse()?);

        let nodes = compilation.expand_imports(nodes, &mut Scope::default())?;
        debug!("rendered {} ({} files)", filename.display(), compilation.files.len());

        let mut emitter = Emitter::new(options, &compilation.files);
        emitter.emit_block(&nodes, &[], &[])?;
        Ok(emitter.finish())
    }
}

/// Per-render state: the files loaded so far
struct Compilation<'a> {
    options: &'a RenderOptions,
    files: Vec<PathBuf>,
    imported: FxHashSet<PathBuf>,
}

impl<'a> Compilation<'a> {
    fn new(options: &'a RenderOptions, root: &Path) -> Self {
        let mut imported = FxHashSet::default();
        imported.insert(canonical(root));
        Self {
            options,
            files: vec![root.to_path_buf()],
            imported,
        }
    }

    fn error_at(&self, err: RenderError, location: Location) -> RenderError {
        if err.filename.is_some() {
            return err;
        }
        err.at(&self.files[location.file], location.line, location.column)
    }

    /// Replace `@import` statements with the parsed contents of their files
    fn expand_imports(&mut self, nodes: Vec<Node>, scope: &mut Scope) -> RenderResult<Vec<Node>> {
        scope.push(&nodes);
        let result = self.expand_block(nodes, scope);
        scope.pop();
        result
    }

    fn expand_block(&mut self, nodes: Vec<Node>, scope: &mut Scope) -> RenderResult<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Import {
                    options,
                    target,
                    url,
                    media,
                    location,
                } => {
                    let target = scope.interpolate(&target).map_err(|e| self.error_at(e, location))?;
                    if let Some(node) = self.import(&options, &target, url, &media, location, scope)? {
                        out.push(node);
                    }
                }
                Node::Rule {
                    selector,
                    guard,
                    children,
                    location,
                } => out.push(Node::Rule {
                    selector,
                    guard,
                    children: self.expand_imports(children, scope)?,
                    location,
                }),
                Node::MixinDefinition {
                    name,
                    params,
                    guard,
                    children,
                    location,
                } => out.push(Node::MixinDefinition {
                    name,
                    params,
                    guard,
                    children: self.expand_imports(children, scope)?,
                    location,
                }),
                Node::DetachedRuleset { name, children } => out.push(Node::DetachedRuleset {
                    name,
                    children: self.expand_imports(children, scope)?,
                }),
                Node::AtRule {
                    name,
                    prelude,
                    body: AtRuleBody::Rules(children),
                    location,
                } => out.push(Node::AtRule {
                    name,
                    prelude,
                    body: AtRuleBody::Rules(self.expand_imports(children, scope)?),
                    location,
                }),
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn import(
        &mut self,
        options: &[String],
        target: &str,
        url: bool,
        media: &str,
        location: Location,
        scope: &mut Scope,
    ) -> RenderResult<Option<Node>> {
        let has = |option: &str| options.iter().any(|o| o == option);

        if has("css") || (is_plain_css(target, url) && !has("less") && !has("inline")) {
            let written = if url {
                format!("url(\"{}\")", target)
            } else {
                format!("\"{}\"", target)
            };
            let statement = if media.is_empty() {
                format!("@import {};", written)
            } else {
                format!("@import {} {};", written, media)
            };
            return Ok(Some(Node::Raw(statement)));
        }

        let path = match self.resolve_import(target, location) {
            Ok(path) => path,
            Err(err) if has("optional") => {
                debug!("skipping optional import: {}", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if !has("multiple") && !self.imported.insert(canonical(&path)) {
            debug!("{} already imported", path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            self.error_at(RenderError::file(format!("Failed to read {}: {}", path.display(), e)), location)
        })?;

        let reference = has("reference");

        if has("inline") {
            return Ok((!reference).then_some(Node::Raw(contents)));
        }

        let file = self.files.len();
        self.files.push(path.clone());
        debug!("importing {}", path.display());

        let parsed = Parser::new(&contents, file, &path).parse()?;
        let nodes = self.expand_imports(parsed, scope)?;

        Ok(Some(Node::Imported { nodes, reference }))
    }

    /// Ask the hook, then look next to the importing file and in each search path
    fn resolve_import(&self, target: &str, location: Location) -> RenderResult<PathBuf> {
        let current_dir = self.files[location.file]
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();

        if let Some(hook) = &self.options.hook {
            match hook.resolve(target, &current_dir) {
                Ok(Some(path)) => return Ok(path),
                Ok(None) => {}
                Err(err) => return Err(self.error_at(RenderError::file(err.to_string()), location)),
            }
        }

        let name = if Path::new(target).extension().is_some() {
            target.to_string()
        } else {
            format!("{}.less", target)
        };

        let mut tried = Vec::new();
        for dir in std::iter::once(&current_dir).chain(self.options.search_paths.iter()) {
            let candidate = dir.join(&name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            tried.push(candidate.display().to_string());
        }

        Err(self.error_at(
            RenderError::file(format!("'{}' wasn't found. Tried - {}", name, tried.join(","))),
            location,
        ))
    }
}

/// Imports that stay as CSS `@import` statements
fn is_plain_css(target: &str, url: bool) -> bool {
    let path = target.split(|c: char| c == '?' || c == '#').next().unwrap_or(target);
    url || path.to_ascii_lowercase().ends_with(".css") || target.contains("://") || target.starts_with("//")
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn render(source: &str) -> RenderResult<String> {
        LessRenderer.render(source, Path::new("/virtual/style.less"), &RenderOptions::default())
    }

    fn render_file(dir: &Path, name: &str, options: &RenderOptions) -> RenderResult<String> {
        let path = dir.join(name);
        let source = fs::read_to_string(&path).unwrap();
        LessRenderer.render(&source, &path, options)
    }

    #[test]
    fn test_plain_rules_pass_through() {
        let css = render(".a { color: red; }").unwrap();
        assert_eq!(css, ".a {\n  color: red;\n}\n");
    }

    #[test]
    fn test_nesting_and_parent_selector() {
        let css = render(".some-styles { color: red; .nested-class { color: blue; &:hover { color: green; } &-suffix { top: 0; } } }").unwrap();
        assert!(css.contains(".some-styles {\n  color: red;\n}"));
        assert!(css.contains(".some-styles .nested-class {\n  color: blue;\n}"));
        assert!(css.contains(".some-styles .nested-class:hover {"));
        assert!(css.contains(".some-styles .nested-class-suffix {"));
    }

    #[test]
    fn test_selector_lists_multiply() {
        let css = render(".a, .b { .c, .d { color: red; } }").unwrap();
        assert!(css.contains(".a .c,\n.b .c,\n.a .d,\n.b .d {"));
    }

    #[test]
    fn test_empty_rules_are_dropped() {
        let css = render(".outer { .inner { color: red; } }").unwrap();
        assert!(!css.contains(".outer {"));
        assert!(css.contains(".outer .inner {"));
    }

    #[test]
    fn test_mixin_declarations_join_the_caller() {
        let css = render(".m() { color: red; }\n.uses { .m(); top: 0; }").unwrap();
        assert_eq!(css, ".uses {\n  color: red;\n  top: 0;\n}\n");
    }

    #[test]
    fn test_mixin_nested_rules_join_the_caller() {
        let css = render(".m() { &-big { color: red; } .inner { top: 0; } }\n.btn { .m(); }").unwrap();
        assert!(css.contains(".btn-big {\n  color: red;\n}"));
        assert!(css.contains(".btn .inner {\n  top: 0;\n}"));
        assert!(!css.contains(".btn {"));
    }

    #[test]
    fn test_mixin_arguments_and_defaults() {
        let css = render(".pad(@a; @b: 2px) { padding: @a @b; }\n.x { .pad(1px); }\n.y { .pad(@b: 4px; @a: 3px); }").unwrap();
        assert!(css.contains(".x {\n  padding: 1px 2px;\n}"));
        assert!(css.contains(".y {\n  padding: 3px 4px;\n}"));
    }

    #[test]
    fn test_plain_rule_called_as_mixin() {
        let css = render(".base { color: red; }\n.x { .base; }").unwrap();
        assert!(css.contains(".base {\n  color: red;\n}"));
        assert!(css.contains(".x {\n  color: red;\n}"));
    }

    #[test]
    fn test_namespaced_mixin() {
        let css = render("#ns { .m() { color: red; } }\n.x { #ns > .m(); }\n.y { #ns.m(); }").unwrap();
        assert!(css.contains(".x {\n  color: red;\n}"));
        assert!(css.contains(".y {\n  color: red;\n}"));
    }

    #[test]
    fn test_important_mixin_call() {
        let css = render(".m() { color: red; }\n.x { .m() !important; }").unwrap();
        assert!(css.contains("color: red !important;"));
    }

    #[test]
    fn test_recursive_mixin_with_guard() {
        let css = render(".loop(@i) when (@i > 0) { .w-@{i} { width: @i * 10px; } .loop(@i - 1); }\n.loop(3);").unwrap();
        assert!(css.contains(".w-3 {\n  width: 30px;\n}"));
        assert!(css.contains(".w-2 {\n  width: 20px;\n}"));
        assert!(css.contains(".w-1 {\n  width: 10px;\n}"));
        assert!(!css.contains(".w-0"));
    }

    #[test]
    fn test_mixin_guards_select_definitions() {
        let source = "
            .theme(@mode) when (@mode = dark) { color: white; }
            .theme(@mode) when (default()) { color: black; }
            .a { .theme(dark); }
            .b { .theme(light); }
        ";
        let css = render(source).unwrap();
        assert!(css.contains(".a {\n  color: white;\n}"));
        assert!(css.contains(".b {\n  color: black;\n}"));
    }

    #[test]
    fn test_rule_guards() {
        let css = render("@mode: dark;\n.k when (false) { color: red; }\n.t when (true) { color: red; }\n.d when (@mode = dark) { top: 0; }").unwrap();
        assert!(!css.contains(".k"));
        assert!(css.contains(".t {"));
        assert!(css.contains(".d {"));
    }

    #[test]
    fn test_detached_ruleset_call() {
        let css = render("@detached: { .nn { color: red; } };\n@detached();\n.a { @detached(); }").unwrap();
        assert!(css.contains(".nn {\n  color: red;\n}"));
        assert!(css.contains(".a .nn {\n  color: red;\n}"));
    }

    #[test]
    fn test_undefined_mixin_is_an_error() {
        let err = render(".h {\n  .i();\n}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Name);
        assert_eq!(err.message, ".i is undefined");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_mixin_without_matching_arguments_is_an_error() {
        let err = render(".m(@a) { top: @a; }\n.x { .m(1; 2); }").unwrap_err();
        assert!(err.message.starts_with("No matching definition was found for `.m("));
    }

    #[test]
    fn test_unbounded_recursion_is_an_error() {
        let err = render(".m() { .m(); }\n.x { .m(); }").unwrap_err();
        assert!(err.message.starts_with("Too many nested mixin calls"));
    }

    #[test]
    fn test_unquoted_url_keeps_at_sign() {
        let css = render("@dir: img;\n.a { background: url(img/logo@2x.png); }\n.b { background: url(@{dir}/x@2x.png); }").unwrap();
        assert!(css.contains("background: url(img/logo@2x.png);"));
        assert!(css.contains("background: url(img/x@2x.png);"));
    }

    #[test]
    fn test_media_bubbles_out_of_rule() {
        let css = render(".a { color: red; @media (max-width: 10px) { color: blue; .b { top: 0; } } }").unwrap();
        assert!(css.contains("@media (max-width: 10px) {\n  .a {\n    color: blue;\n  }\n}"));
        assert!(css.contains("@media (max-width: 10px) {\n  .a .b {\n    top: 0;\n  }\n}"));
    }

    #[test]
    fn test_variable_interpolation() {
        let css = render("@prefix: app;\n@prop: color;\n.@{prefix}-header { @{prop}: @c; }\n@c: red;").unwrap();
        assert!(css.contains(".app-header {\n  color: red;\n}"));
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let err = render(".a { color: @nope; }").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Name);
        assert_eq!(err.message, "variable @nope is undefined");
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_additional_data_is_prepended() {
        let options = RenderOptions {
            additional_data: Some("@global-red: red;".to_string()),
            ..Default::default()
        };
        let css = LessRenderer
            .render(".a { color: @global-red; }", Path::new("/virtual/style.less"), &options)
            .unwrap();
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn test_keyframes_emitted_verbatim() {
        let css = render("@keyframes spin { from { opacity: 0; } to { opacity: 1; } }").unwrap();
        assert!(css.starts_with("@keyframes spin {"));
        assert!(css.contains("from { opacity: 0; }"));
    }

    #[test]
    fn test_root_declaration_is_an_error() {
        let err = render("color: red;").unwrap_err();
        assert_eq!(err.message, "properties must be inside selector blocks");
    }

    #[test]
    fn test_imports_relative_and_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.less"), "@color: red;\n.base { color: @color; }").unwrap();
        fs::write(
            dir.path().join("main.less"),
            "@import \"base\";\n@import \"base.less\";\n.main { color: @color; }",
        )
        .unwrap();

        let css = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap();
        assert_eq!(css.matches(".base {").count(), 1);
        assert!(css.contains(".main {\n  color: red;\n}"));
    }

    #[test]
    fn test_reference_import_contributes_variables_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("vars.less"), "@size: 2px;\n.hidden { top: 0; }").unwrap();
        fs::write(dir.path().join("main.less"), "@import (reference) \"vars\";\n.main { width: @size; }").unwrap();

        let css = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap();
        assert!(!css.contains(".hidden"));
        assert!(css.contains("width: 2px;"));
    }

    #[test]
    fn test_search_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/shared.less"), ".shared { top: 0; }").unwrap();
        fs::write(dir.path().join("main.less"), "@import \"shared\";").unwrap();

        let options = RenderOptions {
            search_paths: vec![dir.path().join("lib")],
            ..Default::default()
        };
        let css = render_file(dir.path(), "main.less", &options).unwrap();
        assert!(css.contains(".shared {"));
    }

    #[test]
    fn test_missing_import_lists_tried_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.less"), "\n@import \"missing\";").unwrap();

        let err = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::File);
        assert!(err.message.starts_with("'missing.less' wasn't found. Tried - "));
        assert!(err.message.contains("missing.less"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_optional_import_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.less"), "@import (optional) \"missing\";\n.a { top: 0; }").unwrap();
        let css = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap();
        assert!(css.contains(".a {"));
    }

    #[test]
    fn test_css_imports_are_kept() {
        let css = render("@import \"reset.css\";\n@import url(http://x.test/a.css) print;\n.a { top: 0; }").unwrap();
        assert!(css.contains("@import \"reset.css\";"));
        assert!(css.contains("@import url(\"http://x.test/a.css\") print;"));
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.less"), "@import \"b\";\n.a { top: 0; }").unwrap();
        fs::write(dir.path().join("b.less"), "@import \"a\";\n.b { top: 0; }").unwrap();

        let css = render_file(dir.path(), "a.less", &RenderOptions::default()).unwrap();
        assert!(css.contains(".a {"));
        assert!(css.contains(".b {"));
    }

    #[test]
    fn test_composes_from_file_is_rewritten() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("composes.less"), ".button { top: 0; }").unwrap();
        fs::write(dir.path().join("main.less"), ".composed-class { composes: button from \"./composes\"; }").unwrap();

        let css = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap();
        assert!(css.contains("composes: button from \""));
        assert!(css.contains("composes.less\""));
    }

    #[test]
    fn test_composes_from_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.less"), ".x { composes: a from \"./nope.less\"; }").unwrap();

        let err = render_file(dir.path(), "main.less", &RenderOptions::default()).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::File);
    }
}
