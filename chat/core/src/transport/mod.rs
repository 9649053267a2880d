//! Transport Layer
//!
//! Everything between a [`ChatRequest`] and a stream of raw bytes:
//!
//! - [`ChatTransport`]: the trait the client drives
//! - [`HttpTransport`]: reqwest-backed implementation
//! - [`CredentialProvider`]: bearer token source, consulted per request

mod auth;
mod http;
mod traits;

pub use auth::{CredentialProvider, StaticCredentials};
pub use http::{HttpTransport, EVENT_STREAM};
pub use traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
