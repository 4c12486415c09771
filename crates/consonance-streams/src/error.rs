//! Error types for the generative streams.
//!
//! Every variant is absorbed by the orchestrator and mapped onto a
//! [`StreamFailure`] recorded in the turn's synthesis metadata. None of them
//! ever reaches the client.

use consonance_types::StreamFailure;

/// Errors that can occur while producing one stream's content.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The stream exceeded its deadline.
    #[error("stream timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The backend was unreachable, returned an error status, or replied
    /// with an unusable body.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The backend rejected the call with HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),
}

impl StreamError {
    /// The wire-level failure this error is reported as.
    pub const fn failure(&self) -> StreamFailure {
        match self {
            Self::Timeout { .. } => StreamFailure::Timeout,
            Self::RateLimited(_) => StreamFailure::RateLimited,
            Self::Upstream(_) | Self::Template(_) => StreamFailure::UpstreamError,
        }
    }
}
