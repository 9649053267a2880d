//! Session Management
//!
//! The message store for one conversation: an ordered transcript plus the
//! session status, the server-assigned session ID and the last error.
//!
//! # Design Philosophy
//!
//! A [`ChatSession`] is plain data with small, intention-revealing mutators.
//! It knows nothing about HTTP, frames or cancellation. The client state
//! machine decides *when* to call each mutator; the session guarantees the
//! transcript invariants:
//!
//! - insertion order is display order, messages are never reordered
//! - at most one message has status [`MessageStatus::Streaming`]
//! - an assistant message never ends up both empty and failed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::messages::{ChatStatus, MessageId, MessageRole, MessageStatus, SessionId};

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content (append-only while streaming)
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Lifecycle status
    pub status: MessageStatus,
}

impl ChatMessage {
    /// Create a completed user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            status: MessageStatus::Sent,
        }
    }

    /// Create an empty assistant placeholder that will be streamed into
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            status: MessageStatus::Streaming,
        }
    }

    /// Whether content is still arriving
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}

/// What happened to the assistant message when an exchange failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The placeholder never received content and was removed
    Removed,
    /// The message kept its partial content and is marked failed
    Kept,
    /// The message was no longer in the transcript
    Missing,
}

/// A conversation session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session status
    pub status: ChatStatus,
    /// Conversation transcript, in display order
    pub messages: Vec<ChatMessage>,
    /// Server-assigned session (bound by the first `metadata` event)
    pub session_id: Option<SessionId>,
    /// User-facing text of the last terminal error
    pub last_error: Option<String>,
    /// Message currently receiving streamed content
    #[serde(skip)]
    current_streaming_id: Option<MessageId>,
}

impl ChatSession {
    /// Create an empty idle session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an exchange: append the user message and the assistant placeholder
    ///
    /// Any message still streaming from a superseded exchange is settled
    /// first so only the new placeholder is streaming afterwards.
    /// Returns `(user_id, assistant_id)`.
    pub fn begin_exchange(&mut self, text: impl Into<String>) -> (MessageId, MessageId) {
        self.settle_orphaned_stream();

        let user = ChatMessage::user(text);
        let user_id = user.id.clone();
        self.messages.push(user);

        let assistant = ChatMessage::assistant_placeholder();
        let assistant_id = assistant.id.clone();
        self.messages.push(assistant);
        self.current_streaming_id = Some(assistant_id.clone());

        self.status = ChatStatus::Sending;
        self.last_error = None;

        (user_id, assistant_id)
    }

    /// Append streamed text to a message, located by ID
    ///
    /// Returns `false` when the message is gone or no longer streaming.
    pub fn append(&mut self, id: &MessageId, text: &str) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(msg) if msg.is_streaming() => {
                msg.content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Record the server-assigned session ID
    ///
    /// The first ID sticks until [`reset`](Self::reset); a later, different
    /// ID is ignored. Returns `true` only when the session was newly bound.
    pub fn bind_session(&mut self, session_id: SessionId) -> bool {
        match &self.session_id {
            None => {
                self.session_id = Some(session_id);
                true
            }
            Some(bound) => {
                if bound != &session_id {
                    debug!(
                        bound = %bound,
                        ignored = %session_id,
                        "Session already bound, ignoring new session_id"
                    );
                }
                false
            }
        }
    }

    /// Complete the exchange that streamed into `id`
    pub fn finalize(&mut self, id: &MessageId) {
        if let Some(msg) = self.messages.iter_mut().find(|m| &m.id == id) {
            msg.status = MessageStatus::Sent;
        }
        self.clear_streaming(id);
        self.status = ChatStatus::Idle;
    }

    /// Fail the exchange that streamed into `id`
    ///
    /// An empty placeholder is removed; one with partial content is kept and
    /// marked [`MessageStatus::Error`].
    pub fn fail(&mut self, id: &MessageId, error: impl Into<String>) -> FailureOutcome {
        self.status = ChatStatus::Error;
        self.last_error = Some(error.into());
        self.clear_streaming(id);

        let Some(idx) = self.messages.iter().position(|m| &m.id == id) else {
            return FailureOutcome::Missing;
        };

        if self.messages[idx].content.is_empty() {
            self.messages.remove(idx);
            FailureOutcome::Removed
        } else {
            self.messages[idx].status = MessageStatus::Error;
            FailureOutcome::Kept
        }
    }

    /// Settle the streaming message of an exchange nobody is driving anymore
    ///
    /// The placeholder is removed when empty, otherwise kept and marked
    /// [`MessageStatus::Error`]. No error is recorded and the session goes
    /// back to idle. Returns `None` when nothing was streaming.
    pub fn abandon_stream(&mut self) -> Option<(MessageId, FailureOutcome)> {
        let settled = self.settle_orphaned_stream()?;
        self.status = ChatStatus::Idle;
        Some(settled)
    }

    /// Start a new logical conversation
    pub fn reset(&mut self) {
        self.messages.clear();
        self.session_id = None;
        self.last_error = None;
        self.current_streaming_id = None;
        self.status = ChatStatus::Idle;
    }

    /// Get the current streaming message ID
    #[must_use]
    pub fn streaming_message_id(&self) -> Option<&MessageId> {
        self.current_streaming_id.as_ref()
    }

    /// Check if currently streaming
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.current_streaming_id.is_some()
    }

    /// Get message by ID
    #[must_use]
    pub fn get_message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Get all messages
    #[must_use]
    pub fn all_messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Get message count
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn clear_streaming(&mut self, id: &MessageId) {
        if self.current_streaming_id.as_ref() == Some(id) {
            self.current_streaming_id = None;
        }
    }

    /// Settle a placeholder left behind by a cancelled exchange
    fn settle_orphaned_stream(&mut self) -> Option<(MessageId, FailureOutcome)> {
        let orphan = self.current_streaming_id.take()?;
        let Some(idx) = self.messages.iter().position(|m| m.id == orphan) else {
            return Some((orphan, FailureOutcome::Missing));
        };
        let outcome = if self.messages[idx].content.is_empty() {
            self.messages.remove(idx);
            FailureOutcome::Removed
        } else {
            self.messages[idx].status = MessageStatus::Error;
            FailureOutcome::Kept
        };
        Some((orphan, outcome))
    }
}
