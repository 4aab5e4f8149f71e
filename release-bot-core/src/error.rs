//! Error types for the release pipeline.
//!
//! - [`ProviderError`]: failures reported by a [`crate::contract::PullRequestProvider`]
//! - [`ChatError`]: failures reported by a [`crate::contract::ChatClient`]
//! - [`ReleaseError`]: the pipeline taxonomy. Most variants are recoverable and
//!   only ever surface as log lines or skipped entries; run-level operations in
//!   [`crate::pipeline`] fold everything into a `RunOutcome` instead of returning `Err`.

use thiserror::Error;

/// Source-control provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized - invalid token")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Deserialization error: {0}")]
    Decode(String),
}

/// Chat provider errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Chat API rejected the call: {0}")]
    Rejected(String),

    #[error("Deserialization error: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The pull request has no description at all.
    #[error("Pull request #{0} has no description")]
    MissingBody(u64),

    /// The description exists but the summary section delimiters were not found.
    #[error("Pull request #{0} has no '{1}' section")]
    UnparsableSection(u64, String),

    #[error("Invalid version format: '{0}' (expected <major>.<minor>.<patch>)")]
    InvalidVersionFormat(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    #[error("Chat unavailable: {0}")]
    ChatUnavailable(#[from] ChatError),

    #[error("No open pull request titled '{0}'")]
    DeployPullRequestNotFound(String),
}
