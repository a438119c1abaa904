//! Engine error types

use capgrab_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid launch plan: {0}")]
    InvalidPlan(String),

    #[error("No availability zones to launch into")]
    NoZones,

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),

    #[error("Post-batch command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Configuration problems surface from the gateway as `InvalidConfig`
    pub fn from_prepare(error: CloudError) -> Self {
        match error {
            CloudError::InvalidConfig(message) => EngineError::InvalidPlan(message),
            other => EngineError::Cloud(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
