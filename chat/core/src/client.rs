//! Chat Client
//!
//! The session state machine. A [`ChatClient`] owns one [`ChatSession`] and
//! drives exchanges against a [`ChatTransport`]:
//!
//! ```text
//!   Idle ──send──► Sending ──stream end──► Idle
//!                     │
//!                     └──transport failure / error event──► Error
//! ```
//!
//! # Single-Flight
//!
//! Every exchange owns a [`CancellationToken`]. Starting an exchange cancels
//! the previous token and installs the new one under the same lock that
//! guards the session, and every mutation re-checks its token under that
//! lock. A superseded exchange therefore cannot touch the transcript, not
//! even with an update that was already parsed when the new send arrived.
//!
//! # Example
//!
//! ```ignore
//! let config = load_config()?;
//! let client = ChatClient::from_config(&config)?;
//! let mut updates = client.subscribe();
//!
//! client.send_message("Hello").await?;
//! let snapshot = client.snapshot();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ChatConfig;
use crate::messages::{ChatStatus, ChatUpdate, MessageId, MessageRole, SessionId};
use crate::session::{ChatMessage, ChatSession, FailureOutcome};
use crate::streaming::{parse_frame, ChatEvent, FrameDecoder};
use crate::transport::{ByteStream, ChatRequest, ChatTransport, HttpTransport, TransportError};

/// Default capacity of the update channel
pub const DEFAULT_UPDATE_BUFFER: usize = 256;

/// How an exchange ended, when it did not complete normally
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The request could not be issued or the stream failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server sent an `error` event
    #[error("{0}")]
    Server(String),

    /// A newer send (or a reset) superseded this exchange
    #[error("Exchange was superseded")]
    Cancelled,
}

impl ChatError {
    /// Text recorded as the session's last error
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether this is a cancellation rather than a failure
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Observable state of a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    /// Session status
    pub status: ChatStatus,
    /// Transcript in display order
    pub messages: Vec<ChatMessage>,
    /// Last terminal error
    pub error: Option<String>,
    /// Server-assigned session
    pub session_id: Option<SessionId>,
}

/// An exchange's claim on the session
struct ActiveExchange {
    number: u64,
    token: CancellationToken,
}

/// Everything guarded by the client lock
#[derive(Default)]
struct ClientState {
    session: ChatSession,
    active: Option<ActiveExchange>,
    updates: Option<mpsc::Sender<ChatUpdate>>,
}

impl ClientState {
    fn emit(&mut self, update: ChatUpdate) {
        let Some(tx) = &self.updates else {
            return;
        };
        match tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(update)) => {
                warn!(?update, "Update channel full, dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Update subscriber went away");
                self.updates = None;
            }
        }
    }

    fn cancel_active(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.token.cancel();
            debug!(exchange = previous.number, "Cancelled active exchange");
        }
    }
}

/// Releases the exchange's claim on every exit path
///
/// When the `send_message` future is dropped mid-stream (a timeout, an
/// aborted task, a `select!` branch that lost) nothing else settles the
/// placeholder, so the guard does it here.
struct ExchangeGuard {
    state: Arc<Mutex<ClientState>>,
    number: u64,
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if !state.active.as_ref().is_some_and(|a| a.number == self.number) {
            return;
        }
        if let Some(active) = state.active.take() {
            active.token.cancel();
        }

        let Some((message_id, outcome)) = state.session.abandon_stream() else {
            return;
        };
        debug!(exchange = self.number, message_id = %message_id, "Exchange dropped mid-stream");
        match outcome {
            FailureOutcome::Removed => state.emit(ChatUpdate::MessageRemoved { message_id }),
            FailureOutcome::Kept => state.emit(ChatUpdate::MessageFailed { message_id }),
            FailureOutcome::Missing => {}
        }
        state.emit(ChatUpdate::StatusChanged {
            status: ChatStatus::Idle,
            error: None,
        });
    }
}

/// The streaming chat client
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    state: Arc<Mutex<ClientState>>,
    exchanges: AtomicU64,
    update_buffer: usize,
}

impl ChatClient {
    /// Create a client over the given transport
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(ClientState::default())),
            exchanges: AtomicU64::new(0),
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }

    /// Create a client with an [`HttpTransport`] built from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be built.
    pub fn from_config(config: &ChatConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)).with_update_buffer(config.update_buffer))
    }

    /// Set the capacity of channels handed out by [`subscribe`](Self::subscribe)
    #[must_use]
    pub fn with_update_buffer(mut self, capacity: usize) -> Self {
        self.update_buffer = capacity.max(1);
        self
    }

    /// Subscribe to updates
    ///
    /// There is a single subscriber; subscribing again replaces it.
    pub fn subscribe(&self) -> mpsc::Receiver<ChatUpdate> {
        let (tx, rx) = mpsc::channel(self.update_buffer);
        self.state.lock().updates = Some(tx);
        rx
    }

    /// Clone the observable state
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.lock();
        ChatSnapshot {
            status: state.session.status,
            messages: state.session.messages.clone(),
            error: state.session.last_error.clone(),
            session_id: state.session.session_id.clone(),
        }
    }

    /// Current session status
    #[must_use]
    pub fn status(&self) -> ChatStatus {
        self.state.lock().session.status
    }

    /// Server-assigned session, once bound
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.lock().session.session_id.clone()
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> bool {
        self.transport.health_check().await
    }

    /// Start a new conversation
    ///
    /// Cancels the active exchange, if any, and clears the transcript, the
    /// session binding and the last error.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.cancel_active();
        state.session.reset();
        state.emit(ChatUpdate::Cleared);
        state.emit(ChatUpdate::StatusChanged {
            status: ChatStatus::Idle,
            error: None,
        });
        info!("Conversation reset");
    }

    /// Send a message and stream the reply into the transcript
    ///
    /// Resolves once the exchange settles. Blank input is a no-op. The
    /// session state is already updated when this returns.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the exchange, or
    /// [`ChatError::Cancelled`] when a newer send superseded it.
    pub async fn send_message(&self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let number = self.exchanges.fetch_add(1, Ordering::Relaxed) + 1;
        let span = info_span!("exchange", exchange = number, transport = self.transport.name());
        self.run_exchange(number, text).instrument(span).await
    }

    async fn run_exchange(&self, number: u64, text: &str) -> Result<(), ChatError> {
        let token = CancellationToken::new();
        let _guard = ExchangeGuard {
            state: Arc::clone(&self.state),
            number,
        };

        let (assistant_id, request) = self.begin(number, &token, text);
        debug!(message_id = %assistant_id, "Exchange started");

        let err = match self.stream_reply(&token, &assistant_id, &request).await {
            Ok(()) => return Ok(()),
            Err(ChatError::Cancelled) => {
                debug!("Exchange superseded");
                return Err(ChatError::Cancelled);
            }
            Err(err) => err,
        };

        let message = err.user_message();
        let failed = self.apply(&token, |state| {
            match state.session.fail(&assistant_id, message.clone()) {
                FailureOutcome::Removed => state.emit(ChatUpdate::MessageRemoved {
                    message_id: assistant_id.clone(),
                }),
                FailureOutcome::Kept => state.emit(ChatUpdate::MessageFailed {
                    message_id: assistant_id.clone(),
                }),
                FailureOutcome::Missing => {}
            }
            state.emit(ChatUpdate::StatusChanged {
                status: ChatStatus::Error,
                error: Some(message.clone()),
            });
        });

        if failed.is_none() {
            return Err(ChatError::Cancelled);
        }
        warn!(error = %message, "Exchange failed");
        Err(err)
    }

    /// Claim the session and append the message pair
    fn begin(&self, number: u64, token: &CancellationToken, text: &str) -> (MessageId, ChatRequest) {
        let mut state = self.state.lock();
        state.cancel_active();
        state.active = Some(ActiveExchange {
            number,
            token: token.clone(),
        });

        let orphan = state.session.streaming_message_id().cloned();
        let (user_id, assistant_id) = state.session.begin_exchange(text);

        if let Some(orphan) = orphan {
            let settled = if state.session.get_message(&orphan).is_some() {
                ChatUpdate::MessageFailed { message_id: orphan }
            } else {
                ChatUpdate::MessageRemoved { message_id: orphan }
            };
            state.emit(settled);
        }

        state.emit(ChatUpdate::MessageAdded {
            id: user_id,
            role: MessageRole::User,
            content: text.to_string(),
        });
        state.emit(ChatUpdate::MessageAdded {
            id: assistant_id.clone(),
            role: MessageRole::Assistant,
            content: String::new(),
        });
        state.emit(ChatUpdate::StatusChanged {
            status: ChatStatus::Sending,
            error: None,
        });

        let request = ChatRequest::new(text, state.session.session_id.clone());
        (assistant_id, request)
    }

    /// Open the stream and drive it to a normal end
    async fn stream_reply(
        &self,
        token: &CancellationToken,
        assistant_id: &MessageId,
        request: &ChatRequest,
    ) -> Result<(), ChatError> {
        let mut stream = tokio::select! {
            biased;
            () = token.cancelled() => return Err(ChatError::Cancelled),
            opened = self.transport.open(request) => opened?,
        };

        let mut decoder = FrameDecoder::new();
        let outcome = self
            .read_loop(token, assistant_id, &mut stream, &mut decoder)
            .await;

        let discarded = decoder.discard();
        if discarded > 0 {
            debug!(bytes = discarded, "Discarding incomplete trailing frame");
        }
        drop(stream);

        let saw_done = outcome?;
        if !saw_done {
            warn!(message_id = %assistant_id, "Stream ended without done event, possible truncation");
        }

        self.apply(token, |state| {
            state.session.finalize(assistant_id);
            state.emit(ChatUpdate::MessageFinalized {
                message_id: assistant_id.clone(),
            });
            state.emit(ChatUpdate::StatusChanged {
                status: ChatStatus::Idle,
                error: None,
            });
        })
        .ok_or(ChatError::Cancelled)?;

        debug!(message_id = %assistant_id, "Exchange complete");
        Ok(())
    }

    /// Read chunks until the stream ends
    ///
    /// Returns whether a `done` event was seen.
    async fn read_loop(
        &self,
        token: &CancellationToken,
        assistant_id: &MessageId,
        stream: &mut ByteStream,
        decoder: &mut FrameDecoder,
    ) -> Result<bool, ChatError> {
        let mut saw_done = false;

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Err(ChatError::Cancelled),
                next = stream.next() => next,
            };

            let Some(chunk) = next else {
                return Ok(saw_done);
            };
            let chunk = chunk?;

            for frame in decoder.feed(&chunk) {
                let Some(event) = parse_frame(&frame) else {
                    continue;
                };
                if self.apply_event(token, assistant_id, event.into_chat_event())? {
                    saw_done = true;
                }
            }
        }
    }

    /// Apply one event; returns `true` for `done`
    fn apply_event(
        &self,
        token: &CancellationToken,
        assistant_id: &MessageId,
        event: ChatEvent,
    ) -> Result<bool, ChatError> {
        match event {
            ChatEvent::Metadata {
                session_id: Some(session_id),
            } => {
                self.apply(token, |state| {
                    if state.session.bind_session(session_id.clone()) {
                        debug!(session_id = %session_id, "Session bound");
                        state.emit(ChatUpdate::SessionBound { session_id });
                    }
                })
                .ok_or(ChatError::Cancelled)?;
                Ok(false)
            }
            ChatEvent::Metadata { session_id: None } => {
                debug!("Metadata event without session_id");
                Ok(false)
            }
            ChatEvent::Data { text } => {
                if text.is_empty() {
                    return Ok(false);
                }
                self.apply(token, |state| {
                    if state.session.append(assistant_id, &text) {
                        state.emit(ChatUpdate::Token {
                            message_id: assistant_id.clone(),
                            text,
                        });
                    }
                })
                .ok_or(ChatError::Cancelled)?;
                Ok(false)
            }
            ChatEvent::Done => Ok(true),
            ChatEvent::Error { error } => Err(ChatError::Server(error)),
            ChatEvent::Other { kind, .. } => {
                debug!(kind = %kind, "Ignoring unhandled event");
                Ok(false)
            }
        }
    }

    /// Run `f` under the lock unless `token` was cancelled
    fn apply<R>(
        &self,
        token: &CancellationToken,
        f: impl FnOnce(&mut ClientState) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if token.is_cancelled() {
            return None;
        }
        Some(f(&mut state))
    }
}
