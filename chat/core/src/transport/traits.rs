//! Transport Traits
//!
//! The seam between the chat state machine and the network. The state
//! machine only needs one capability: turn a [`ChatRequest`] into a stream
//! of raw byte chunks, or fail with a [`TransportError`].

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use thiserror::Error;

use crate::messages::SessionId;

/// Response body as a stream of raw, unaligned byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// JSON body of a chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// The user's message (already trimmed)
    pub message: String,
    /// Session to resume, serialized as `null` before one is bound
    pub session_id: Option<SessionId>,
}

impl ChatRequest {
    /// Create a request
    pub fn new(message: impl Into<String>, session_id: Option<SessionId>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}

/// Errors that can occur while opening or reading the response stream
///
/// The `Display` text is user-facing: it becomes the session's last error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP 401
    #[error("Authentication expired. Please sign in again.")]
    Unauthorized,

    /// HTTP 429
    #[error("Rate limited. Please retry later.")]
    RateLimited,

    /// Any other non-success HTTP status
    #[error("Request failed with status code {code}")]
    Status {
        /// The HTTP status code
        code: u16,
    },

    /// Connect, read or timeout failure in the network stack
    #[error("Network error: {0}")]
    Network(String),

    /// The credential provider could not supply a token
    #[error("Could not obtain credentials: {0}")]
    Credentials(String),

    /// The request body could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Map an HTTP status code to an error
    ///
    /// Returns `None` for 2xx codes.
    #[must_use]
    pub fn from_status(code: u16) -> Option<Self> {
        match code {
            200..=299 => None,
            401 => Some(Self::Unauthorized),
            429 => Some(Self::RateLimited),
            code => Some(Self::Status { code }),
        }
    }

    /// The HTTP status behind this error, if any
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::RateLimited => Some(429),
            Self::Status { code } => Some(*code),
            _ => None,
        }
    }
}

/// Chat transport trait
///
/// Implement this trait to connect the chat client to a backend. The HTTP
/// implementation is [`HttpTransport`](super::HttpTransport); tests use
/// scripted in-memory transports.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Get the transport name (for logs)
    fn name(&self) -> &str;

    /// Issue a request and return the response body stream
    ///
    /// Non-success statuses must be reported as errors here, before any
    /// byte of the body is yielded. Dropping the returned stream releases
    /// the underlying connection.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool {
        true
    }
}
