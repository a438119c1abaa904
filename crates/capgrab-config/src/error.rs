use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error(
        "No config file found\nSearched: $CAPGRAB_CONFIG, ./capgrab.kdl, ./.capgrab.kdl, <config dir>/capgrab/capgrab.kdl"
    )]
    ConfigNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
