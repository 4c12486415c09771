//! Error types for the orchestration server.
//!
//! Connection-level and message-level failures are both local: a
//! [`TransportError`] ends only its own connection, and a
//! [`DispatchError`] drops only the offending frame.

/// A malformed inbound frame. The frame is dropped; the connection stays
/// open.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A binary frame was not valid UTF-8.
    #[error("malformed message: invalid UTF-8: {0}")]
    InvalidEncoding(String),

    /// The frame was not a valid envelope (bad JSON, missing `type`, or a
    /// missing or ill-typed field).
    #[error("malformed message: {0}")]
    InvalidPayload(String),
}

impl From<std::str::Utf8Error> for DispatchError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::InvalidEncoding(e.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidPayload(e.to_string())
    }
}

/// A connection-level failure. Closes only the affected connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Reading from the socket failed.
    #[error("socket read failed: {0}")]
    Read(String),

    /// Writing to the socket failed.
    #[error("socket write failed: {0}")]
    Write(String),
}

/// Errors that can stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: consonance_core::config::ConfigError,
    },

    /// Stream backends or prompt templates could not be built.
    #[error("stream setup error: {source}")]
    Streams {
        /// The underlying stream error.
        #[from]
        source: consonance_streams::StreamError,
    },

    /// The server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: crate::server::ServerError,
    },
}
