//! Huginn error types

/// Huginn error types
///
/// Only construction and fetchers return these. A lookup never fails: every
/// failure collapses into a `None` result for the caller.
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Fetch/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP status {status}: {message}")]
    Api { status: u16, message: String },

    /// The host side of a [`FetchBridge`](crate::fetch::FetchBridge) went away
    /// or dropped a request without answering it.
    #[error("fetch bridge closed")]
    BridgeClosed,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no metadata fetcher configured")]
    NoFetcher,

    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => HuginnError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => HuginnError::Http(err.to_string()),
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
