//! Config file loading

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::options::PartialOptions;

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "tlm.config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load options from `explicit`, or from [`CONFIG_FILE`] in `cwd`.
///
/// A missing default config file yields empty options; a missing explicit
/// one is an error.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<PartialOptions, ConfigError> {
    let path = match explicit {
        Some(path) => cwd.join(path),
        None => {
            let path = cwd.join(CONFIG_FILE);
            if !path.is_file() {
                debug!("no {} in {}", CONFIG_FILE, cwd.display());
                return Ok(PartialOptions::default());
            }
            path
        }
    };

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    debug!("loading options from {}", path.display());
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
