//! One-shot generation for every matching file

use std::sync::Arc;

use log::debug;
use tokio::task;

use crate::error::Result;
use crate::list_files::list_files_and_perform_sanity_checks;
use crate::pipeline::Pipeline;

/// Write type definitions for every file matching `pattern`, concurrently
pub async fn generate(pipeline: Arc<Pipeline>, pattern: &str) -> Result<()> {
    let files = list_files_and_perform_sanity_checks(pattern, pipeline.options(), pipeline.cwd(), pipeline.alerts())?;

    let tasks: Vec<_> = files
        .into_iter()
        .map(|file| {
            let pipeline = Arc::clone(&pipeline);
            task::spawn_blocking(move || pipeline.write_file(&file))
        })
        .collect();

    debug!("dispatched {} files", tasks.len());
    for handle in tasks {
        handle.await?;
    }

    Ok(())
}
