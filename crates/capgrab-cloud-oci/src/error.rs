//! OCI provider error types

use capgrab_cloud::{CloudError, ServiceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OciError {
    #[error("oci CLI not found. Please install: pip install oci-cli")]
    CliNotFound,

    #[error("oci command failed: {0}")]
    CommandFailed(String),

    #[error("Service error {0}")]
    Service(ServiceError),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Subnet not found: {0}")]
    SubnetNotFound(String),

    #[error("Shape not found: {0}")]
    ShapeNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<OciError> for CloudError {
    fn from(e: OciError) -> Self {
        match e {
            OciError::Service(s) => CloudError::Service(s),
            // Lookups that can only fail because of what the template says
            OciError::ImageNotFound(_)
            | OciError::SubnetNotFound(_)
            | OciError::ShapeNotFound(_)
            | OciError::InvalidConfig(_) => CloudError::InvalidConfig(e.to_string()),
            OciError::JsonError(e) => CloudError::Json(e),
            OciError::IoError(e) => CloudError::Io(e),
            OciError::CliNotFound | OciError::CommandFailed(_) => {
                CloudError::CommandFailed(e.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, OciError>;
