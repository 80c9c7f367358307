//! Error types for tarang-client
//!
//! Every failure is locally recoverable: the caller surfaces it and the user
//! retries. A superseded (stale) response is not an error and never appears
//! here; see `LoadOutcome::Discarded` and `StageOutcome::Superseded`.

use tarang_common::AssetId;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Remote service answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Request never completed (connect, timeout, body read)
    #[error("Network error: {0}")]
    Transport(String),

    /// Asset vanished between a listing refresh and a delete / fetch
    #[error("Asset not found (already removed?): {0}")]
    NotFoundAfterDelete(AssetId),

    /// Precondition failed before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Request succeeded but the body reported a failure status
    #[error("Server reported failure: {0}")]
    Rejected(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Media element refused an operation (e.g. play)
    #[error("Media error: {0}")]
    Media(String),

    /// tarang-common error
    #[error("Common error: {0}")]
    Common(#[from] tarang_common::Error),
}

impl ClientError {
    /// True for the NetworkFailure category (non-2xx or transport)
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Http { .. } | ClientError::Transport(_))
    }

    /// True if raised before any network access
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
