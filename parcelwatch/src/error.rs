//! Application-wide error types.

use thiserror::Error;

use crate::notification::NotificationError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Portal configuration error: {0}")]
    Portal(#[from] parcel_portal::ConfigError),

    #[error("Portal login failed: {0}")]
    Auth(#[from] parcel_portal::AuthError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
