//! Event Parser
//!
//! Classifies one complete frame and extracts its JSON payload.
//!
//! Within a frame, `event:` declares the type and `data:` carries the
//! payload. When several `data:` lines appear the last one wins. A frame
//! without a type is a `data` event. A frame without a payload, or whose
//! payload is not valid JSON, is dropped: one bad frame must not abort an
//! otherwise healthy stream.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::messages::SessionId;

/// Field prefix declaring the event type
pub const EVENT_FIELD: &str = "event:";

/// Field prefix carrying the payload
pub const DATA_FIELD: &str = "data:";

/// Fallback text for an `error` event without a usable message
pub const UNKNOWN_SERVER_ERROR: &str = "The server reported an error";

/// Declared type of an event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Session binding
    Metadata,
    /// Streamed text (the default)
    Data,
    /// Normal completion
    Done,
    /// Server-signaled failure
    Error,
    /// Any other declared type, passed through untouched
    Other(String),
}

impl EventKind {
    /// Map a declared type name to a kind
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "metadata" => Self::Metadata,
            "data" => Self::Data,
            "done" => Self::Done,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Metadata => "metadata",
            Self::Data => "data",
            Self::Done => "done",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }

    /// Whether this kind ends the streaming phase of an exchange
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// A typed event extracted from one frame
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEvent {
    /// Declared (or defaulted) type
    pub kind: EventKind,
    /// Parsed payload
    pub payload: Value,
}

/// A parsed event with its payload shaped for the state machine
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// Bind the conversation to a server session
    Metadata {
        /// Session ID, if the payload carried one
        session_id: Option<SessionId>,
    },
    /// Append text to the active assistant message
    Data {
        /// The text fragment
        text: String,
    },
    /// The server finished normally
    Done,
    /// The server failed the exchange
    Error {
        /// Server-supplied message
        error: String,
    },
    /// An event type this client does not act on
    Other {
        /// Declared type
        kind: String,
        /// Raw payload
        payload: Value,
    },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MetadataPayload {
    session_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DataPayload {
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorPayload {
    error: Option<String>,
}

impl ParsedEvent {
    /// Shape the payload according to the event kind
    ///
    /// Payload fields that are missing or mistyped fall back to neutral
    /// values rather than failing.
    #[must_use]
    pub fn into_chat_event(self) -> ChatEvent {
        match self.kind {
            EventKind::Metadata => {
                let meta: MetadataPayload = serde_json::from_value(self.payload).unwrap_or_default();
                ChatEvent::Metadata {
                    session_id: meta.session_id.map(SessionId::new),
                }
            }
            EventKind::Data => {
                let data: DataPayload = serde_json::from_value(self.payload).unwrap_or_default();
                ChatEvent::Data { text: data.text }
            }
            EventKind::Done => ChatEvent::Done,
            EventKind::Error => {
                let err: ErrorPayload = serde_json::from_value(self.payload).unwrap_or_default();
                ChatEvent::Error {
                    error: err
                        .error
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_string()),
                }
            }
            EventKind::Other(kind) => ChatEvent::Other {
                kind,
                payload: self.payload,
            },
        }
    }
}

/// Parse one frame into an event
///
/// Returns `None` when the frame carries no usable payload.
#[must_use]
pub fn parse_frame(frame: &str) -> Option<ParsedEvent> {
    let mut declared: Option<&str> = None;
    let mut data: Option<&str> = None;

    for line in frame.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(value) = line.strip_prefix(EVENT_FIELD) {
            declared = Some(value.trim());
        } else if let Some(value) = line.strip_prefix(DATA_FIELD) {
            data = Some(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    let kind = declared.map_or(EventKind::Data, EventKind::from_name);

    let Some(raw) = data else {
        debug!(kind = kind.as_str(), "Dropping frame without data line");
        return None;
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => Some(ParsedEvent { kind, payload }),
        Err(e) => {
            debug!(
                kind = kind.as_str(),
                bytes = raw.len(),
                error = %e,
                "Dropping frame with malformed payload"
            );
            None
        }
    }
}
