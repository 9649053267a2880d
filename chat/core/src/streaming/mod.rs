//! Event-Stream Decoding
//!
//! The two leaf stages of the read loop:
//!
//! ```text
//!  byte chunks ──► FrameDecoder ──► frame texts ──► parse_frame ──► ParsedEvent
//!                  (carries partial                 (drops frames
//!                   characters and                   without a valid
//!                   partial frames)                  JSON payload)
//! ```
//!
//! Both stages are synchronous and allocation-light; the client drives them
//! from its sequential read loop so events come out in exactly the order the
//! server wrote them.
//!
//! # Example
//!
//! ```
//! use chat_core::streaming::{parse_frame, ChatEvent, FrameDecoder};
//!
//! let mut decoder = FrameDecoder::new();
//! let mut events = Vec::new();
//! for chunk in [&b"data: {\"text\":\"He"[..], &b"llo\"}\n\n"[..]] {
//!     for frame in decoder.feed(chunk) {
//!         if let Some(event) = parse_frame(&frame) {
//!             events.push(event.into_chat_event());
//!         }
//!     }
//! }
//! assert_eq!(events, vec![ChatEvent::Data { text: "Hello".to_string() }]);
//! ```

mod decoder;
mod event;

pub use decoder::{FrameDecoder, FRAME_DELIMITER};
pub use event::{
    parse_frame, ChatEvent, EventKind, ParsedEvent, DATA_FIELD, EVENT_FIELD, UNKNOWN_SERVER_ERROR,
};
