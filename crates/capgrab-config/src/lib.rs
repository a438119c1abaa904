//! capgrab configuration
//!
//! Locates and parses the KDL configuration file into accounts and
//! launch plans.

pub mod error;
pub mod model;
pub mod parser;

pub use error::{ConfigError, Result};
pub use model::{AccountConfig, Config, NotifyConfig, TemplateConfig};
pub use parser::{parse_config_file, parse_config_string};

use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "CAPGRAB_CONFIG";

/// Find the configuration file
///
/// Search order:
/// 1. `explicit` (the `--config` flag); must exist
/// 2. environment variable `CAPGRAB_CONFIG`
/// 3. current directory: `capgrab.kdl`, `.capgrab.kdl`
/// 4. `<config dir>/capgrab/capgrab.kdl`
pub fn find_config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in ["capgrab.kdl", ".capgrab.kdl"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("capgrab").join("capgrab.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigNotFound)
}

/// Find and parse the configuration file
pub fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    let path = find_config_file(explicit)?;
    tracing::debug!("Loading config from {}", path.display());
    let config = parse_config_file(&path)?;
    Ok((path, config))
}
