//! File discovery for a glob pattern

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use log::debug;

use crate::alerts::Alerts;
use crate::error::Result;
use crate::options::MainOptions;

/// Include pattern plus ignore list, matched like the file listing does
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    include: GlobMatcher,
    ignore: GlobSet,
    cwd: PathBuf,
}

impl PatternMatcher {
    pub fn new(pattern: &str, ignore: &[String], cwd: &Path) -> Result<Self> {
        let include = GlobBuilder::new(&absolute_pattern(pattern, cwd))
            .literal_separator(true)
            .build()?
            .compile_matcher();

        let mut builder = GlobSetBuilder::new();
        for pattern in ignore {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }

        Ok(Self {
            include,
            ignore: builder.build()?,
            cwd: cwd.to_path_buf(),
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let absolute = self.cwd.join(path);
        self.ignore.is_match(&absolute)
            || absolute
                .strip_prefix(&self.cwd)
                .map(|relative| self.ignore.is_match(relative))
                .unwrap_or(false)
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.include.is_match(self.cwd.join(path)) && !self.is_ignored(path)
    }
}

/// `pattern` anchored at `cwd` when relative, with forward slashes
pub fn absolute_pattern(pattern: &str, cwd: &Path) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
        format!("{}/{}", cwd.display().to_string().replace('\\', "/").trim_end_matches('/'), pattern)
    }
}

/// `path` relative to `cwd` when it lies inside it
pub fn relative_to_cwd(path: &Path, cwd: &Path) -> PathBuf {
    path.strip_prefix(cwd)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Longest leading directory of `pattern` without glob syntax
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(|c: char| matches!(c, '*' | '?' | '[' | '{')) {
            break;
        }
        base.push(component);
    }
    if base.is_file() {
        base.pop();
    }
    base
}

/// Glob `pattern`, drop ignored files and report what was found.
///
/// Files under `cwd` are returned relative to it, so that messages show
/// the paths the way the pattern was written.
///
/// Reports an error and returns nothing when no file matches.
pub fn list_files_and_perform_sanity_checks(
    pattern: &str,
    options: &MainOptions,
    cwd: &Path,
    alerts: &dyn Alerts,
) -> Result<Vec<PathBuf>> {
    let matcher = PatternMatcher::new(pattern, &options.ignore, cwd)?;
    let mut files = Vec::new();

    for entry in glob::glob(&absolute_pattern(pattern, cwd))? {
        match entry {
            Ok(path) if path.is_file() && !matcher.is_ignored(&path) => files.push(relative_to_cwd(&path, cwd)),
            Ok(path) => debug!("skipping {}", path.display()),
            Err(err) => debug!("unreadable path: {}", err),
        }
    }

    files.sort();

    if files.is_empty() {
        alerts.error("No files found.");
        return Ok(files);
    }

    if files.len() == 1 && !pattern.ends_with(".less") {
        alerts.warn(&format!(
            "Only 1 file found for {}. If using a glob pattern (eg: dir/**/*.less) make sure to wrap in quotes (eg: \"dir/**/*.less\").",
            pattern
        ));
    }

    alerts.success(&format!(
        "Found {} file{}. Generating type definitions...",
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    ));

    Ok(files)
}
