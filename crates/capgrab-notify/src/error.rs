//! Notifier error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message was never sent, nothing to edit")]
    Detached,
}

pub type Result<T> = std::result::Result<T, NotifyError>;
