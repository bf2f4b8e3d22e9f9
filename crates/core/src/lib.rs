//! Typed LESS Core
//!
//! Options and config loading, notifications, and the generate,
//! list-different and watch modes built on the per-file pipeline.

mod alerts;
mod config;
mod error;
mod generate;
mod list_different;
mod list_files;
mod options;
mod pipeline;
mod remove_file;
mod run;
mod watch;
mod write_file;

pub use alerts::{Alerts, LogAlerts, LogLevel, MemoryAlerts, ParseLogLevelError, Severity};
pub use config::{load_config, ConfigError, CONFIG_FILE};
pub use error::{Error, Result};
pub use generate::generate;
pub use list_different::list_different;
pub use list_files::{list_files_and_perform_sanity_checks, PatternMatcher};
pub use options::{merge_options, MainOptions, OneOrMany, PartialOptions};
pub use pipeline::Pipeline;
pub use remove_file::remove_file;
pub use run::{resolve_pattern, run, run_pipeline};
pub use watch::{dispatch, watch, watch_events, WatchEvent, WatchEventKind};
pub use write_file::{decide, WriteDecision};
