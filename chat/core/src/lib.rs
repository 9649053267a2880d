//! Chat Core - Headless Streaming Chat Client
//!
//! This crate turns a long-lived HTTP event-stream response into an ordered,
//! incrementally updated conversation transcript. It has no UI dependencies:
//! a terminal, a desktop shell or a test harness drives it the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UI Surface                             │
//! │        send_message()  ▲ snapshot()   ▲ ChatUpdate (down)     │
//! └───────────┬────────────┴──────────────┴──────────────────────┘
//!             │
//! ┌───────────▼──────────────────────────────────────────────────┐
//! │                       ChatClient                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ ChatSession  │◄──│  read loop   │◄──│  ChatTransport   │  │
//! │  │ (transcript) │   │ decode+parse │   │  (HTTP, mocks)   │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatClient`]: the session state machine (single-flight sends)
//! - [`ChatSession`]: the transcript plus status, session ID and last error
//! - [`ChatUpdate`]: notifications pushed to a subscriber
//! - [`FrameDecoder`] / [`parse_frame`]: the event-stream decoding stages
//! - [`ChatTransport`]: the network seam, implemented by [`HttpTransport`]
//!
//! # Quick Start
//!
//! ```ignore
//! use chat_core::{load_config, ChatClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let client = ChatClient::from_config(&config)?;
//!
//!     client.send_message("Hello").await?;
//!     for msg in client.snapshot().messages {
//!         println!("{:?}: {}", msg.role, msg.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`client`]: the session state machine
//! - [`config`]: TOML and environment configuration
//! - [`messages`]: identifiers, statuses and updates
//! - [`session`]: the message store
//! - [`streaming`]: frame decoding and event parsing
//! - [`transport`]: transport trait, credentials and the HTTP implementation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod messages;
pub mod session;
pub mod streaming;
pub mod transport;

// Re-exports for convenience
pub use client::{ChatClient, ChatError, ChatSnapshot, DEFAULT_UPDATE_BUFFER};
pub use messages::{ChatStatus, ChatUpdate, MessageId, MessageRole, MessageStatus, SessionId};
pub use session::{ChatMessage, ChatSession, FailureOutcome};

// Streaming exports
pub use streaming::{parse_frame, ChatEvent, EventKind, FrameDecoder, ParsedEvent};

// Transport exports
pub use transport::{
    ByteStream, ChatRequest, ChatTransport, CredentialProvider, HttpTransport, StaticCredentials,
    TransportError,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_overrides,
    ChatConfig, ChatToml, ConfigError, ConfigOverrides, ConfigSource,
};
