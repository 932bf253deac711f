//! crates/chat_client/src/error.rs
//!
//! Errors that can end a chat turn on the client side.

/// Anything that stops a turn from completing normally.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("Relay responded with status {0}")]
    Status(u16),

    /// The response body failed while it was being read.
    #[error("Stream read failed: {0}")]
    Stream(String),

    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),
}
