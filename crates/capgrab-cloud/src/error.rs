//! Cloud provider error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejection reported by the provider's API.
///
/// Carries the HTTP status the service answered with and, when present,
/// the machine-readable error code (e.g. `LimitExceeded`, `IncorrectState`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub status: u16,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}): {}", self.status, code, self.message),
            None => write!(f, "{}: {}", self.status, self.message),
        }
    }
}

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Service error {0}")]
    Service(ServiceError),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// The service rejection behind this error, if the provider answered at all
    pub fn service(&self) -> Option<&ServiceError> {
        match self {
            CloudError::Service(e) => Some(e),
            _ => None,
        }
    }

    /// Message suitable for a progress report: the service message when
    /// available, the full error text otherwise.
    pub fn summary(&self) -> String {
        match self {
            CloudError::Service(e) if !e.message.is_empty() => e.message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for CloudError {
    fn from(e: ServiceError) -> Self {
        CloudError::Service(e)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
