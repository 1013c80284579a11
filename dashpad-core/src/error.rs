//! Error types for dashpad.

use thiserror::Error;

/// Errors that can occur across the dashpad core.
#[derive(Error, Debug)]
pub enum DashError {
    #[error("No free port in {0}..{1}")]
    PortExhausted(u16, u16),

    #[error("Missing required files: {0}")]
    MissingAssets(String),

    #[error("Identity provider error: {0}")]
    AuthProvider(String),

    #[error("Device code expired before sign-in completed")]
    AuthTimeout,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Failed to fetch calendar events: {0}")]
    RemoteFetch(String),

    #[error("Could not transform list item: {0}")]
    ItemTransform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for dashpad operations.
pub type DashResult<T> = Result<T, DashError>;
