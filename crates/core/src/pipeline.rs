//! Per-file processing shared by every mode

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use typed_less_compiler::{file_to_class_names, LessRenderer, RenderOptions, RenderResult, Renderer};
use typed_less_typescript::{
    class_names_to_type_definitions, type_definition_path, Formatter, Prettier, TypeDefinitionOptions,
};

use crate::alerts::{Alerts, LogAlerts};
use crate::options::MainOptions;

/// Everything needed to turn one stylesheet into its type definitions.
///
/// Shared read-only between the tasks of a run.
pub struct Pipeline {
    options: MainOptions,
    cwd: PathBuf,
    render_options: RenderOptions,
    type_options: TypeDefinitionOptions,
    renderer: Arc<dyn Renderer>,
    formatter: Arc<dyn Formatter>,
    alerts: Arc<dyn Alerts>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline with the built-in renderer, prettier when available, and
    /// alerts sent to the logger.
    pub fn new(options: MainOptions, cwd: PathBuf) -> Self {
        let alerts = Arc::new(LogAlerts::new(options.log_level));
        Self {
            render_options: options.render_options(&cwd),
            type_options: options.type_definition_options(),
            options,
            cwd,
            renderer: Arc::new(LessRenderer::new()),
            formatter: Arc::new(Prettier::detect()),
            alerts,
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn Alerts>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn options(&self) -> &MainOptions {
        &self.options
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn alerts(&self) -> &dyn Alerts {
        self.alerts.as_ref()
    }

    /// `file` relative to the working directory, unless already absolute
    pub(crate) fn source_path(&self, file: &Path) -> PathBuf {
        self.cwd.join(file)
    }

    /// Type definition path for `file`, as shown to the user
    pub fn definition_path(&self, file: &Path) -> PathBuf {
        PathBuf::from(type_definition_path(file, self.options.output_folder.as_deref(), &self.cwd))
    }

    /// Formatted type definitions for `file`, or `None` when it exports no
    /// usable class names. Skipped class names are reported as warnings.
    pub fn type_definitions(&self, file: &Path) -> RenderResult<Option<String>> {
        let class_names = file_to_class_names(
            &self.source_path(file),
            self.renderer.as_ref(),
            &self.render_options,
            &self.options.name_format,
        )?;
        debug!("{}: {:?}", file.display(), class_names);

        let definitions = class_names_to_type_definitions(&class_names, &self.type_options);
        for skipped in &definitions.skipped {
            self.alerts.warn(&skipped.message());
        }

        Ok(definitions.text.map(|text| self.formatter.format(&text)))
    }
}
