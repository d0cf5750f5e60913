//! Alertmanager Error Types

use thiserror::Error;

/// Errors while deriving the target or submitting a silence
#[derive(Debug, Error)]
pub enum AlertmanagerError {
    /// `client_url` could not be parsed
    #[error("Invalid Alertmanager URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Silence body could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Alertmanager answered with a non-success status
    #[error("Alertmanager returned non-success status code {status}: {body}")]
    Rejected { status: u16, body: String },
}
