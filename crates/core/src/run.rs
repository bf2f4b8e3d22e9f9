//! Entry point tying options, pattern and mode together

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::error::Result;
use crate::generate::generate;
use crate::list_different::list_different;
use crate::options::MainOptions;
use crate::pipeline::Pipeline;
use crate::watch::watch;

/// Expand a directory pattern to every `.less` file beneath it.
///
/// The directory is also added to the include paths so imports relative to
/// it keep resolving.
pub fn resolve_pattern(pattern: &str, options: &mut MainOptions, cwd: &Path) -> String {
    let dir = cwd.join(pattern);
    if !dir.is_dir() {
        return pattern.to_string();
    }

    options.include_paths.push(PathBuf::from(pattern));
    let expanded = format!(
        "{}/**/*.less",
        dir.display().to_string().replace('\\', "/").trim_end_matches('/')
    );
    debug!("directory pattern {} expanded to {}", pattern, expanded);
    expanded
}

/// Run the mode selected by `options` for `pattern`.
///
/// Returns `false` when list-different mode found stale type definitions.
pub async fn run(pattern: &str, options: MainOptions, cwd: PathBuf) -> Result<bool> {
    let mut options = options;
    let pattern = resolve_pattern(pattern, &mut options, &cwd);
    let pipeline = Arc::new(Pipeline::new(options, cwd));
    run_pipeline(pipeline, &pattern).await
}

/// Run with an already configured pipeline
pub async fn run_pipeline(pipeline: Arc<Pipeline>, pattern: &str) -> Result<bool> {
    let check_only = pipeline.options().list_different;
    let watching = pipeline.options().watch;

    if check_only {
        return list_different(pipeline, pattern).await;
    }

    if watching {
        watch(pipeline, pattern).await?;
    } else {
        generate(pipeline, pattern).await?;
    }
    Ok(true)
}
