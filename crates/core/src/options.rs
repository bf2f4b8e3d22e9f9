//! Generation options
//!
//! [`PartialOptions`] is what the command line and the config file each
//! provide; [`MainOptions`] is the merged, fully defaulted result shared by
//! every pipeline of a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use typed_less_compiler::{AliasTable, ImportHook, ImportResolver, NameFormat, RenderOptions};
use typed_less_typescript::{ExportType, QuoteType, TypeDefinitionOptions};

use crate::alerts::LogLevel;

/// Fully resolved options for a run
#[derive(Debug, Clone)]
pub struct MainOptions {
    pub banner: String,
    pub include_paths: Vec<PathBuf>,
    pub aliases: AliasTable,
    pub alias_prefixes: AliasTable,
    pub name_format: Vec<NameFormat>,
    pub export_type: ExportType,
    pub export_type_name: String,
    pub export_type_interface: String,
    pub quote_type: QuoteType,
    pub update_stale_only: bool,
    pub output_folder: Option<PathBuf>,
    pub ignore: Vec<String>,
    pub ignore_initial: bool,
    pub watch: bool,
    pub list_different: bool,
    pub log_level: LogLevel,
    pub additional_data: Option<String>,
}

impl Default for MainOptions {
    fn default() -> Self {
        Self {
            banner: String::new(),
            include_paths: Vec::new(),
            aliases: AliasTable::new(),
            alias_prefixes: AliasTable::new(),
            name_format: vec![NameFormat::DEFAULT],
            export_type: ExportType::Named,
            export_type_name: "ClassNames".to_string(),
            export_type_interface: "Styles".to_string(),
            quote_type: QuoteType::Single,
            update_stale_only: false,
            output_folder: None,
            ignore: Vec::new(),
            ignore_initial: false,
            watch: false,
            list_different: false,
            log_level: LogLevel::Verbose,
            additional_data: None,
        }
    }
}

impl MainOptions {
    /// Options for rendering stylesheets relative to `cwd`
    pub fn render_options(&self, cwd: &Path) -> RenderOptions {
        let resolver = ImportResolver::new(
            self.aliases.clone(),
            self.alias_prefixes.clone(),
            self.include_paths.clone(),
            cwd.to_path_buf(),
        );

        let hook: Option<Arc<dyn ImportHook>> = if resolver.is_empty() {
            None
        } else {
            Some(Arc::new(resolver))
        };

        RenderOptions {
            search_paths: self.include_paths.iter().map(|p| cwd.join(p)).collect(),
            additional_data: self.additional_data.clone(),
            hook,
        }
    }

    pub fn type_definition_options(&self) -> TypeDefinitionOptions {
        TypeDefinitionOptions {
            banner: self.banner.clone(),
            export_type: self.export_type,
            export_type_name: self.export_type_name.clone(),
            export_type_interface: self.export_type_interface.clone(),
            quote_type: self.quote_type,
        }
    }
}

/// A single name format or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(NameFormat),
    Many(Vec<NameFormat>),
}

impl From<OneOrMany> for Vec<NameFormat> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(format) => vec![format],
            OneOrMany::Many(formats) => formats,
        }
    }
}

/// Options from one source; unset fields fall through to the next source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialOptions {
    pub banner: Option<String>,
    pub include_paths: Option<Vec<PathBuf>>,
    pub aliases: Option<AliasTable>,
    pub alias_prefixes: Option<AliasTable>,
    pub name_format: Option<OneOrMany>,
    pub export_type: Option<ExportType>,
    pub export_type_name: Option<String>,
    pub export_type_interface: Option<String>,
    pub quote_type: Option<QuoteType>,
    pub update_stale_only: Option<bool>,
    pub output_folder: Option<PathBuf>,
    pub ignore: Option<Vec<String>>,
    pub ignore_initial: Option<bool>,
    pub watch: Option<bool>,
    pub list_different: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub additional_data: Option<String>,
}

impl PartialOptions {
    /// Fill every unset field of `self` from `fallback`
    pub fn or(self, fallback: PartialOptions) -> PartialOptions {
        PartialOptions {
            banner: self.banner.or(fallback.banner),
            include_paths: self.include_paths.or(fallback.include_paths),
            aliases: self.aliases.or(fallback.aliases),
            alias_prefixes: self.alias_prefixes.or(fallback.alias_prefixes),
            name_format: self.name_format.or(fallback.name_format),
            export_type: self.export_type.or(fallback.export_type),
            export_type_name: self.export_type_name.or(fallback.export_type_name),
            export_type_interface: self.export_type_interface.or(fallback.export_type_interface),
            quote_type: self.quote_type.or(fallback.quote_type),
            update_stale_only: self.update_stale_only.or(fallback.update_stale_only),
            output_folder: self.output_folder.or(fallback.output_folder),
            ignore: self.ignore.or(fallback.ignore),
            ignore_initial: self.ignore_initial.or(fallback.ignore_initial),
            watch: self.watch.or(fallback.watch),
            list_different: self.list_different.or(fallback.list_different),
            log_level: self.log_level.or(fallback.log_level),
            additional_data: self.additional_data.or(fallback.additional_data),
        }
    }

    /// Apply defaults to every unset field
    pub fn resolve(self) -> MainOptions {
        let defaults = MainOptions::default();
        let name_format = self
            .name_format
            .map(Vec::from)
            .filter(|formats| !formats.is_empty())
            .unwrap_or(defaults.name_format);

        MainOptions {
            banner: self.banner.unwrap_or(defaults.banner),
            include_paths: self.include_paths.unwrap_or(defaults.include_paths),
            aliases: self.aliases.unwrap_or(defaults.aliases),
            alias_prefixes: self.alias_prefixes.unwrap_or(defaults.alias_prefixes),
            name_format,
            export_type: self.export_type.unwrap_or(defaults.export_type),
            export_type_name: self.export_type_name.unwrap_or(defaults.export_type_name),
            export_type_interface: self.export_type_interface.unwrap_or(defaults.export_type_interface),
            quote_type: self.quote_type.unwrap_or(defaults.quote_type),
            update_stale_only: self.update_stale_only.unwrap_or(defaults.update_stale_only),
            output_folder: self.output_folder.or(defaults.output_folder),
            ignore: self.ignore.unwrap_or(defaults.ignore),
            ignore_initial: self.ignore_initial.unwrap_or(defaults.ignore_initial),
            watch: self.watch.unwrap_or(defaults.watch),
            list_different: self.list_different.unwrap_or(defaults.list_different),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            additional_data: self.additional_data.or(defaults.additional_data),
        }
    }
}

/// Command line options take precedence over the config file, which takes
/// precedence over the defaults.
pub fn merge_options(cli: PartialOptions, config: PartialOptions) -> MainOptions {
    cli.or(config).resolve()
}
