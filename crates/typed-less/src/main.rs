//! typed-less-modules - TypeScript type definitions for LESS CSS modules
//!
//! Usage: typed-less-modules <pattern> [options]

mod cli;

use std::env;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use cli::Cli;
use typed_less_core::{load_config, merge_options, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(cli::expand_dotted_args(env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (pattern, config_path, cli_options) = cli.into_parts();
    let config = match load_config(config_path.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = merge_options(cli_options, config);

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(options.log_level.level_filter().as_str()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(&pattern, options, cwd).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
