//! Chat Messages
//!
//! Identifiers, roles and statuses shared by the message store and the
//! session state machine, plus the [`ChatUpdate`] notifications pushed to
//! whatever surface renders the transcript.
//!
//! # Design Philosophy
//!
//! The client core owns the transcript. Surfaces (terminal, GUI, tests)
//! never parse protocol details; they either read a snapshot or follow the
//! stream of updates and render what they are told.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message identifier
///
/// Opaque and unique for the lifetime of the process. Stable for the whole
/// exchange that created the message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned session identifier
///
/// Bound by the first `metadata` event of a conversation and echoed back on
/// every later request so the backend can resume context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wrap a server-provided token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Streamed assistant reply
    Assistant,
}

/// Lifecycle of a single message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Receiving content from the server
    Streaming,
    /// Complete
    Sent,
    /// The exchange failed after some content arrived
    Error,
}

/// Overall status of a chat session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Ready for input
    #[default]
    Idle,
    /// An exchange is in flight
    Sending,
    /// The last exchange failed
    Error,
}

impl ChatStatus {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Sending => "Responding...",
            Self::Error => "Error",
        }
    }
}

/// Notifications from the client core to a rendering surface
///
/// Updates are emitted in the same order the transcript is mutated. Updates
/// belonging to a superseded exchange are never emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatUpdate {
    /// A message was appended to the transcript
    MessageAdded {
        /// The new message ID
        id: MessageId,
        /// Who sent it
        role: MessageRole,
        /// Initial content (empty for the assistant placeholder)
        content: String,
    },

    /// Streamed text was appended to a message
    Token {
        /// Message receiving the text
        message_id: MessageId,
        /// The appended text
        text: String,
    },

    /// A streamed message completed
    MessageFinalized {
        /// Message that completed
        message_id: MessageId,
    },

    /// A streamed message was kept with partial content after a failure
    MessageFailed {
        /// Message that failed
        message_id: MessageId,
    },

    /// A message was removed from the transcript
    MessageRemoved {
        /// Message that was removed
        message_id: MessageId,
    },

    /// Session status changed
    StatusChanged {
        /// The new status
        status: ChatStatus,
        /// The error text when `status` is [`ChatStatus::Error`]
        error: Option<String>,
    },

    /// The server bound (or re-bound) the conversation to a session
    SessionBound {
        /// The session ID
        session_id: SessionId,
    },

    /// The transcript and session binding were cleared
    Cleared,
}
