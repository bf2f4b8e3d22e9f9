//! Removing type definition files

use std::fs;
use std::path::Path;

use crate::alerts::Alerts;
use crate::pipeline::Pipeline;

/// Delete `path` if it exists. `shown` is the path used in messages.
pub fn remove_file(path: &Path, shown: &Path, alerts: &dyn Alerts) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => alerts.success(&format!("[REMOVED] {}", shown.display())),
        Err(err) => alerts.error(&format!("An error occurred removing {}:\n{}", shown.display(), err)),
    }
}

impl Pipeline {
    /// Remove the type definitions generated for `file`, if any
    pub fn remove_type_definition_file(&self, file: &Path) {
        let definition_path = self.definition_path(file);
        remove_file(&self.cwd().join(&definition_path), &definition_path, self.alerts());
    }
}
