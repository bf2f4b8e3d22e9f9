//! Command line arguments

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use typed_less_compiler::{Alias, AliasTable, NameFormat};
use typed_less_core::{LogLevel, OneOrMany, PartialOptions};
use typed_less_typescript::{ExportType, QuoteType};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dotted flag prefixes and the flag they stand for
const DOTTED_FLAGS: &[(&str, &str)] = &[("--aliases.", "--alias"), ("--aliasPrefixes.", "--aliasPrefix")];

/// Generate TypeScript type definitions for LESS CSS modules
#[derive(Debug, Parser)]
#[command(name = "typed-less-modules")]
#[command(version = VERSION)]
#[command(about = "Generate TypeScript type definitions for LESS CSS modules")]
#[command(after_help = "EXAMPLES:
    typed-less-modules \"src/**/*.less\"
    typed-less-modules src --watch
    typed-less-modules \"src/**/*.less\" --exportType default --nameFormat kebab
    typed-less-modules \"src/**/*.less\" --alias ~theme=src/theme --listDifferent")]
pub struct Cli {
    /// Glob pattern or directory of LESS files
    pub pattern: String,

    /// LESS source prepended to every file before rendering
    #[arg(long = "additionalData", short = 'd')]
    pub additional_data: Option<String>,

    /// Import alias, repeatable. `--aliases.KEY VALUE` is accepted too.
    #[arg(long = "alias", short = 'a', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub aliases: Vec<(String, String)>,

    /// Import alias prefix, repeatable
    #[arg(long = "aliasPrefix", short = 'p', value_name = "PREFIX=VALUE", value_parser = parse_key_value)]
    pub alias_prefixes: Vec<(String, String)>,

    /// Class name format: camel, dashes, kebab, none, param, snake or all
    #[arg(long = "nameFormat", short = 'n')]
    pub name_format: Vec<NameFormat>,

    /// Export type: named or default
    #[arg(long = "exportType", short = 'e')]
    pub export_type: Option<ExportType>,

    /// Name of the class names type for the default export
    #[arg(long = "exportTypeName")]
    pub export_type_name: Option<String>,

    /// Name of the styles interface for the default export
    #[arg(long = "exportTypeInterface")]
    pub export_type_interface: Option<String>,

    /// Regenerate type definitions as files change
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Skip the initial generation in watch mode
    #[arg(long = "ignoreInitial")]
    pub ignore_initial: bool,

    /// Only report files whose type definitions are missing or outdated
    #[arg(long = "listDifferent", short = 'l')]
    pub list_different: bool,

    /// Additional import search directory, repeatable
    #[arg(long = "includePaths", short = 'i')]
    pub include_paths: Vec<PathBuf>,

    /// Glob of files to skip, repeatable
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Directory to write type definitions to instead of next to the source
    #[arg(long = "outputFolder", short = 'o')]
    pub output_folder: Option<PathBuf>,

    /// Quote style for the default export: single or double
    #[arg(long = "quoteType", short = 'q')]
    pub quote_type: Option<QuoteType>,

    /// Only write type definitions that are out of date
    #[arg(long = "updateStaleOnly", short = 'u')]
    pub update_stale_only: bool,

    /// Output verbosity: verbose, error, info or silent
    #[arg(long = "logLevel", short = 'L')]
    pub log_level: Option<LogLevel>,

    /// Text prepended to every generated file
    #[arg(long)]
    pub banner: Option<String>,

    /// Config file to load instead of tlm.config.json
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Rewrite `--aliases.KEY VALUE` and `--aliases.KEY=VALUE` into
/// `--alias KEY=VALUE`, and likewise for `--aliasPrefixes.`
pub fn expand_dotted_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        let dotted = arg.to_str().and_then(|text| {
            DOTTED_FLAGS
                .iter()
                .find_map(|(prefix, flag)| text.strip_prefix(prefix).map(|key| (*flag, key.to_string())))
        });
        let Some((flag, key)) = dotted else {
            out.push(arg);
            continue;
        };

        out.push(OsString::from(flag));
        if key.contains('=') {
            out.push(OsString::from(key));
            continue;
        }
        // A missing value leaves `KEY` alone so clap reports the bad pair
        match args.next() {
            Some(value) => {
                let mut pair = OsString::from(format!("{}=", key));
                pair.push(value);
                out.push(pair);
            }
            None => out.push(OsString::from(key)),
        }
    }

    out
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn alias_table(entries: Vec<(String, String)>) -> Option<AliasTable> {
    if entries.is_empty() {
        return None;
    }
    Some(entries.into_iter().map(|(key, value)| (key, Alias::from(value))).collect())
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl Cli {
    /// Pattern, config file and the options given on the command line
    pub fn into_parts(self) -> (String, Option<PathBuf>, PartialOptions) {
        let options = PartialOptions {
            banner: self.banner,
            include_paths: (!self.include_paths.is_empty()).then_some(self.include_paths),
            aliases: alias_table(self.aliases),
            alias_prefixes: alias_table(self.alias_prefixes),
            name_format: (!self.name_format.is_empty()).then_some(OneOrMany::Many(self.name_format)),
            export_type: self.export_type,
            export_type_name: self.export_type_name,
            export_type_interface: self.export_type_interface,
            quote_type: self.quote_type,
            update_stale_only: flag(self.update_stale_only),
            output_folder: self.output_folder,
            ignore: (!self.ignore.is_empty()).then_some(self.ignore),
            ignore_initial: flag(self.ignore_initial),
            watch: flag(self.watch),
            list_different: flag(self.list_different),
            log_level: self.log_level,
            additional_data: self.additional_data,
        };
        (self.pattern, self.config, options)
    }
}
