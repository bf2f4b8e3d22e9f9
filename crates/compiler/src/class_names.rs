//! Stylesheet file to exported class names

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use typed_less_css::extract_class_names;

use crate::error::{RenderError, RenderResult};
use crate::name_format::{multiplex, NameFormat};
use crate::render::{RenderOptions, Renderer};

/// Render `file`, extract its class names and apply the name formats.
///
/// The result is deduplicated and sorted by code point.
pub fn file_to_class_names(
    file: &Path,
    renderer: &dyn Renderer,
    options: &RenderOptions,
    formats: &[NameFormat],
) -> RenderResult<Vec<String>> {
    let filename = absolute(file);
    let source = fs::read_to_string(&filename)
        .map_err(|e| RenderError::file(format!("Failed to read {}: {}", filename.display(), e)))?;

    let css = renderer.render(&source, &filename, options)?;
    let names = extract_class_names(&css).map_err(|e| RenderError::from_css(e, &filename))?;
    debug!("{}: {} class names before formatting", filename.display(), names.len());

    Ok(multiplex(&names, formats))
}

fn absolute(file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(file))
        .unwrap_or_else(|_| file.to_path_buf())
}
