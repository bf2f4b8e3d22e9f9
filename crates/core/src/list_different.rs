//! Checking existing type definitions without writing

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::task;

use crate::error::Result;
use crate::list_files::list_files_and_perform_sanity_checks;
use crate::pipeline::Pipeline;

impl Pipeline {
    /// Whether the type definitions of `file` are present and current
    pub fn check_file(&self, file: &Path) -> bool {
        let definitions = match self.type_definitions(file) {
            Ok(Some(definitions)) => definitions,
            Ok(None) => return true,
            Err(err) => {
                self.alerts().error(&err.to_string());
                return false;
            }
        };

        let artifact = self.cwd().join(self.definition_path(file));
        match fs::read(&artifact) {
            Ok(existing) if existing == definitions.as_bytes() => true,
            Ok(_) => {
                self.alerts()
                    .error(&format!("[INVALID TYPES] Check type definitions for {}", file.display()));
                false
            }
            Err(_) => {
                self.alerts()
                    .error(&format!("[INVALID TYPES] Type file needs to be generated for {}", file.display()));
                false
            }
        }
    }
}

/// Check every file matching `pattern`. Returns `true` when all type
/// definitions are up to date.
pub async fn list_different(pipeline: Arc<Pipeline>, pattern: &str) -> Result<bool> {
    let files = list_files_and_perform_sanity_checks(pattern, pipeline.options(), pipeline.cwd(), pipeline.alerts())?;

    let tasks: Vec<_> = files
        .into_iter()
        .map(|file| {
            let pipeline = Arc::clone(&pipeline);
            task::spawn_blocking(move || pipeline.check_file(&file))
        })
        .collect();

    let mut up_to_date = true;
    for handle in tasks {
        up_to_date &= handle.await?;
    }

    Ok(up_to_date)
}
