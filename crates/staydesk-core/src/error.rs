use staydesk_api::ApiError;
use staydesk_cache::CacheError;
use thiserror::Error;

/// All the ways an admin action can fail
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(#[from] ApiError),

    #[error("Storage error: {0}")]
    StorageError(#[from] CacheError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Login response did not contain a token")]
    MissingToken,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Text for a toast or an inline error branch
    pub fn user_message(&self) -> String {
        match self {
            Error::ApiError(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Missing booking, enquiry, review and friends
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ApiError(e) if e.status() == Some(404))
    }
}
