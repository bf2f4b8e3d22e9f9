//! Flattening of the evaluated LESS tree into plain CSS
//!
//! Nested rules are joined to their parents, grouping at-rules bubble up
//! around the rules they contain, variables are substituted and mixin
//! calls are expanded in place.

use std::path::{Path, PathBuf};

use log::debug;
use rustc_hash::FxHashMap;
use typed_less_css::{Composes, ComposesSource};

use crate::error::{RenderError, RenderErrorKind, RenderResult};
use crate::render::expr::{self, reduce, uses_default};
use crate::render::mixin::{bind, Arg, MixinCall, Param};
use crate::render::parse::{split_top_level, AtRuleBody, Location, Node};
use crate::render::scope::Scope;
use crate::render::RenderOptions;
use crate::resolver::normalize_path;

/// Nesting limit for mixin calls, recursive ones included
const MAX_MIXIN_DEPTH: usize = 128;

/// One top-level piece of output, wrapped in zero or more grouping at-rules
#[derive(Debug)]
struct Chunk {
    wrappers: Vec<String>,
    body: ChunkBody,
}

#[derive(Debug)]
enum ChunkBody {
    Rule {
        selectors: Vec<String>,
        declarations: Vec<String>,
    },
    Raw(String),
}

/// A mixin definition, or a plain `.name` / `#name` rule called as one
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    params: &'a [Param],
    guard: Option<&'a str>,
    children: &'a [Node],
}

pub(crate) struct Emitter<'a> {
    options: &'a RenderOptions,
    files: &'a [PathBuf],
    scope: Scope,
    /// Blocks being emitted, innermost last; mixins are looked up here
    blocks: Vec<&'a [Node]>,
    chunks: Vec<Chunk>,
    /// Mixin calls being expanded
    depth: usize,
    /// Expanding a call marked `!important`
    important: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(options: &'a RenderOptions, files: &'a [PathBuf]) -> Self {
        Self {
            options,
            files,
            scope: Scope::default(),
            blocks: Vec::new(),
            chunks: Vec::new(),
            depth: 0,
            important: 0,
        }
    }

    fn filename(&self, location: Location) -> &Path {
        &self.files[location.file]
    }

    fn locate(&self, err: RenderError, location: Location) -> RenderError {
        if err.filename.is_some() {
            return err;
        }
        err.at(self.filename(location), location.line, location.column)
    }

    fn push(&mut self, wrappers: &[String], body: ChunkBody) {
        self.chunks.push(Chunk {
            wrappers: wrappers.to_vec(),
            body,
        });
    }

    /// Emit a block whose rules are nested under `selectors`
    pub fn emit_block(&mut self, nodes: &'a [Node], selectors: &[String], wrappers: &[String]) -> RenderResult<()> {
        // The rule goes out before its nested rules; it is dropped later if
        // it ends up without declarations
        let slot = (!selectors.is_empty()).then(|| {
            self.push(
                wrappers,
                ChunkBody::Rule {
                    selectors: selectors.to_vec(),
                    declarations: Vec::new(),
                },
            );
            self.chunks.len() - 1
        });
        self.within(nodes, None, |emitter| emitter.emit_nodes(nodes, selectors, wrappers, slot))
    }

    /// Run `f` with the variables and mixins of `nodes` in scope
    fn within(
        &mut self,
        nodes: &'a [Node],
        bindings: Option<FxHashMap<String, String>>,
        f: impl FnOnce(&mut Self) -> RenderResult<()>,
    ) -> RenderResult<()> {
        let bound = bindings.is_some();
        if let Some(bindings) = bindings {
            self.scope.push_frame(bindings);
        }
        self.scope.push(nodes);
        self.blocks.push(nodes);

        let result = f(self);

        self.blocks.pop();
        self.scope.pop();
        if bound {
            self.scope.pop();
        }
        result
    }

    fn declare(&mut self, slot: usize, declaration: String) {
        if let ChunkBody::Rule { declarations, .. } = &mut self.chunks[slot].body {
            declarations.push(declaration);
        }
    }

    fn emit_nodes(
        &mut self,
        nodes: &'a [Node],
        selectors: &[String],
        wrappers: &[String],
        slot: Option<usize>,
    ) -> RenderResult<()> {
        let mut visible = Vec::new();
        visible_nodes(nodes, &mut visible);

        for node in visible {
            match node {
                Node::Declaration { property, value, location } => {
                    let Some(slot) = slot else {
                        return Err(RenderError::syntax("properties must be inside selector blocks").at(
                            self.filename(*location),
                            location.line,
                            location.column,
                        ));
                    };
                    let declaration = self.declaration(property, value, *location)?;
                    self.declare(slot, declaration);
                }
                Node::Rule {
                    selector,
                    guard,
                    children,
                    location,
                } => {
                    if let Some(guard) = guard {
                        if !self.guard(guard, None, false, *location)? {
                            debug!("guard {} failed for {}", guard, selector);
                            continue;
                        }
                    }
                    let resolved = self.resolve_selectors(selector, selectors, *location)?;
                    self.emit_block(children, &resolved, wrappers)?;
                }
                Node::MixinCall(call) => self.call_mixin(call, selectors, wrappers, slot)?,
                Node::DetachedCall { name, location } => {
                    let children = self.find_detached(name).ok_or_else(|| {
                        self.locate(
                            RenderError::new(RenderErrorKind::Name, format!("variable @{} is undefined", name)),
                            *location,
                        )
                    })?;
                    self.within(children, None, |emitter| emitter.emit_nodes(children, selectors, wrappers, slot))?;
                }
                Node::AtRule {
                    name,
                    prelude,
                    body,
                    location,
                } => {
                    let prelude = self
                        .scope
                        .interpolate(prelude)
                        .map_err(|e| self.locate(e, *location))?;
                    let header = if prelude.is_empty() {
                        format!("@{}", name)
                    } else {
                        format!("@{} {}", name, prelude)
                    };
                    match body {
                        AtRuleBody::Rules(children) => {
                            let mut nested = wrappers.to_vec();
                            nested.push(header);
                            self.emit_block(children, selectors, &nested)?;
                        }
                        AtRuleBody::Raw(raw) => {
                            let raw = self.scope.interpolate(raw).map_err(|e| self.locate(e, *location))?;
                            self.push(wrappers, ChunkBody::Raw(format!("{} {{\n  {}\n}}", header, raw)));
                        }
                        AtRuleBody::Statement => {
                            self.push(wrappers, ChunkBody::Raw(format!("{};", header)));
                        }
                    }
                }
                Node::Raw(text) => self.push(wrappers, ChunkBody::Raw(text.clone())),
                _ => {}
            }
        }

        Ok(())
    }

    /// Evaluate a `when` guard, with `bindings` in scope when given
    fn guard(
        &mut self,
        guard: &str,
        bindings: Option<&FxHashMap<String, String>>,
        fallback: bool,
        location: Location,
    ) -> RenderResult<bool> {
        if let Some(bindings) = bindings {
            self.scope.push_frame(bindings.clone());
        }
        let result = self.scope.evaluate(guard).and_then(|text| expr::guard(&text, fallback));
        if bindings.is_some() {
            self.scope.pop();
        }
        result.map_err(|e| self.locate(e, location))
    }

    /// Expand every definition matching `call` in place of the call: its
    /// declarations join the caller's rule and its nested rules are joined
    /// to the caller's selectors.
    fn call_mixin(
        &mut self,
        call: &MixinCall,
        selectors: &[String],
        wrappers: &[String],
        slot: Option<usize>,
    ) -> RenderResult<()> {
        let location = call.location;
        if self.depth >= MAX_MIXIN_DEPTH {
            return Err(self.locate(
                RenderError::syntax(format!("Too many nested mixin calls in {}", call.name())),
                location,
            ));
        }

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let value = self.scope.evaluate(&arg.value).map_err(|e| self.locate(e, location))?;
            args.push(Arg {
                name: arg.name.clone(),
                value: reduce(&value).unwrap_or(value),
            });
        }

        let candidates = self.find_mixins(&call.path);
        if candidates.is_empty() {
            return Err(self.locate(
                RenderError::new(RenderErrorKind::Name, format!("{} is undefined", call.name())),
                location,
            ));
        }

        let bound: Vec<_> = candidates
            .into_iter()
            .filter_map(|candidate| bind(candidate.params, &args).map(|bindings| (candidate, bindings)))
            .collect();
        if bound.is_empty() {
            let written: Vec<&str> = args.iter().map(|arg| arg.value.as_str()).collect();
            return Err(self.locate(
                RenderError::new(
                    RenderErrorKind::Name,
                    format!("No matching definition was found for `{}({})`", call.name(), written.join(", ")),
                ),
                location,
            ));
        }

        // `default()` holds when no other definition matches
        let mut passes = Vec::with_capacity(bound.len());
        for (candidate, bindings) in &bound {
            passes.push(match candidate.guard {
                Some(guard) if uses_default(guard) => None,
                Some(guard) => Some(self.guard(guard, Some(bindings), false, location)?),
                None => Some(true),
            });
        }
        let fallback = !passes.contains(&Some(true));

        self.depth += 1;
        if call.important {
            self.important += 1;
        }
        let result = self.expand(bound, passes, fallback, selectors, wrappers, slot, location);
        if call.important {
            self.important -= 1;
        }
        self.depth -= 1;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn expand(
        &mut self,
        bound: Vec<(Candidate<'a>, FxHashMap<String, String>)>,
        passes: Vec<Option<bool>>,
        fallback: bool,
        selectors: &[String],
        wrappers: &[String],
        slot: Option<usize>,
        location: Location,
    ) -> RenderResult<()> {
        for ((candidate, bindings), pass) in bound.into_iter().zip(passes) {
            let pass = match (pass, candidate.guard) {
                (Some(pass), _) => pass,
                (None, Some(guard)) => self.guard(guard, Some(&bindings), fallback, location)?,
                (None, None) => true,
            };
            if !pass {
                continue;
            }
            let children = candidate.children;
            self.within(children, Some(bindings), |emitter| {
                emitter.emit_nodes(children, selectors, wrappers, slot)
            })?;
        }
        Ok(())
    }

    /// Definitions for a call path, from the innermost block that has any
    fn find_mixins(&self, path: &[String]) -> Vec<Candidate<'a>> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };

        for &block in self.blocks.iter().rev() {
            let mut found = Vec::new();
            definitions(block, first, &mut found);

            for segment in rest {
                let mut inner = Vec::new();
                for namespace in &found {
                    definitions(namespace.children, segment, &mut inner);
                }
                found = inner;
            }

            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Last detached ruleset named `name` in the innermost block defining one
    fn find_detached(&self, name: &str) -> Option<&'a [Node]> {
        self.blocks.iter().rev().find_map(|&block| detached(block, name))
    }

    fn declaration(&self, property: &str, value: &str, location: Location) -> RenderResult<String> {
        let property = self
            .scope
            .interpolate(property)
            .map_err(|e| self.locate(e, location))?;
        let mut value = self.scope.evaluate(value).map_err(|e| self.locate(e, location))?;
        if let Some(reduced) = reduce(&value) {
            value = reduced;
        }

        if property == "composes" || property == "compose-with" {
            value = self.rewrite_composes(&value, location)?;
        }
        if self.important > 0 && !value.ends_with("!important") {
            value.push_str(" !important");
        }

        Ok(format!("{}: {}", property, value))
    }

    /// Point `composes: x from "file"` at the resolved file
    fn rewrite_composes(&self, value: &str, location: Location) -> RenderResult<String> {
        let composes = Composes::parse(value);
        let target = match &composes.source {
            ComposesSource::File(target) => target,
            _ => return Ok(value.to_string()),
        };

        let dir = self.filename(location).parent().unwrap_or_else(|| Path::new("")).to_path_buf();

        let hooked = match &self.options.hook {
            Some(hook) => hook
                .resolve(target, &dir)
                .map_err(|e| RenderError::file(e.to_string()).at(self.filename(location), location.line, location.column))?,
            None => None,
        };

        let resolved = hooked.or_else(|| normalize_path(target, &dir)).ok_or_else(|| {
            RenderError::file(format!("'{}' wasn't found. Tried - {}", target, dir.join(target).display())).at(
                self.filename(location),
                location.line,
                location.column,
            )
        })?;

        debug!("composes from {} -> {}", target, resolved.display());
        Ok(format!(
            "{} from \"{}\"",
            composes.names.join(" "),
            resolved.display().to_string().replace('\\', "/")
        ))
    }

    /// Join a rule's selector list to its parents
    fn resolve_selectors(&self, selector: &str, parents: &[String], location: Location) -> RenderResult<Vec<String>> {
        let text = self
            .scope
            .interpolate(selector)
            .map_err(|e| self.locate(e, location))?;

        let mut resolved = Vec::new();

        for child in split_top_level(&text, ',').into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            if parents.is_empty() {
                resolved.push(child.replace('&', ""));
            } else if child.contains('&') {
                resolved.extend(expand_nesting(child, parents));
            } else {
                resolved.extend(parents.iter().map(|parent| format!("{} {}", parent, child)));
            }
        }

        Ok(resolved
            .into_iter()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// Serialize every chunk as CSS text
    pub fn finish(self) -> String {
        let mut out = String::new();

        for chunk in &self.chunks {
            if matches!(&chunk.body, ChunkBody::Rule { declarations, .. } if declarations.is_empty()) {
                continue;
            }
            for (depth, wrapper) in chunk.wrappers.iter().enumerate() {
                out.push_str(&indent(depth));
                out.push_str(wrapper);
                out.push_str(" {\n");
            }

            let depth = chunk.wrappers.len();
            match &chunk.body {
                ChunkBody::Rule {
                    selectors,
                    declarations,
                } => {
                    let separator = format!(",\n{}", indent(depth));
                    out.push_str(&indent(depth));
                    out.push_str(&selectors.join(&separator));
                    out.push_str(" {\n");
                    for declaration in declarations {
                        out.push_str(&indent(depth + 1));
                        out.push_str(declaration);
                        out.push_str(";\n");
                    }
                    out.push_str(&indent(depth));
                    out.push_str("}\n");
                }
                ChunkBody::Raw(text) => {
                    out.push_str(&indent(depth));
                    out.push_str(text);
                    out.push('\n');
                }
            }

            for depth in (0..chunk.wrappers.len()).rev() {
                out.push_str(&indent(depth));
                out.push_str("}\n");
            }
        }

        out
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Nodes of a block with the contents of non-reference imports inlined
fn visible_nodes<'n>(nodes: &'n [Node], out: &mut Vec<&'n Node>) {
    for node in nodes {
        match node {
            Node::Imported { nodes, reference: false } => visible_nodes(nodes, out),
            Node::Imported { reference: true, .. } => {}
            other => out.push(other),
        }
    }
}

/// Mixin definitions and plain rules named `name` in a block
fn definitions<'n>(nodes: &'n [Node], name: &str, out: &mut Vec<Candidate<'n>>) {
    for node in nodes {
        match node {
            Node::MixinDefinition {
                name: defined,
                params,
                guard,
                children,
                ..
            } if defined == name => out.push(Candidate {
                params,
                guard: guard.as_deref(),
                children,
            }),
            Node::Rule {
                selector,
                guard,
                children,
                ..
            } if selector == name => out.push(Candidate {
                params: &[],
                guard: guard.as_deref(),
                children,
            }),
            Node::Imported { nodes, .. } => definitions(nodes, name, out),
            _ => {}
        }
    }
}

fn detached<'n>(nodes: &'n [Node], name: &str) -> Option<&'n [Node]> {
    nodes.iter().rev().find_map(|node| match node {
        Node::DetachedRuleset { name: defined, children } if defined == name => Some(children.as_slice()),
        Node::Imported { nodes, .. } => detached(nodes, name),
        _ => None,
    })
}

/// Replace each `&` with every parent selector, in every combination
fn expand_nesting(child: &str, parents: &[String]) -> Vec<String> {
    let mut segments = child.split('&');
    let mut results = vec![segments.next().unwrap_or_default().to_string()];

    for segment in segments {
        results = results
            .iter()
            .flat_map(|prefix| parents.iter().map(move |parent| format!("{}{}{}", prefix, parent, segment)))
            .collect();
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_nesting_suffix() {
        let parents = vec![".button".to_string()];
        assert_eq!(expand_nesting("&-primary", &parents), vec![".button-primary"]);
        assert_eq!(expand_nesting("&:hover", &parents), vec![".button:hover"]);
    }

    #[test]
    fn test_expand_nesting_combinations() {
        let parents = vec![".a".to_string(), ".b".to_string()];
        assert_eq!(
            expand_nesting("& + &", &parents),
            vec![".a + .a", ".a + .b", ".b + .a", ".b + .b"]
        );
    }

    #[test]
    fn test_expand_nesting_parent_after() {
        let parents = vec![".item".to_string()];
        assert_eq!(expand_nesting(".rtl &", &parents), vec![".rtl .item"]);
    }
}
