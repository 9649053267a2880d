//! Frame Decoder
//!
//! Turns an arriving sequence of raw byte chunks into complete event-stream
//! frames: blocks of text terminated by a blank line.
//!
//! # Frame Format
//!
//! ```text
//! event: data\n
//! data: {"text":"Hi"}\n
//! \n                      <- blank line ends the frame
//! ```
//!
//! # Chunk Boundaries
//!
//! Chunks may split anywhere: inside a multi-byte UTF-8 character, inside the
//! `\n\n` delimiter, or inside a `\r\n` pair. The decoder keeps two pieces of
//! state across calls so none of that matters:
//!
//! - an undecoded byte tail (at most 3 bytes of an incomplete character)
//! - the pending text after the last delimiter
//!
//! A decoder belongs to exactly one exchange and is dropped with it; whatever
//! is still pending at that point is discarded.

/// Delimiter between frames
pub const FRAME_DELIMITER: &str = "\n\n";

/// Initial capacity for the pending text buffer
const MIN_BUFFER_CAPACITY: usize = 1024;

/// Incremental decoder from byte chunks to frame texts
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence from the previous chunk
    carry: Vec<u8>,
    /// A `\r` seen at the end of the previous chunk
    pending_cr: bool,
    /// Decoded text not yet terminated by a delimiter
    buffer: String,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            carry: Vec::with_capacity(4),
            pending_cr: false,
            buffer: String::with_capacity(MIN_BUFFER_CAPACITY),
        }
    }

    /// Feed one chunk and collect every frame it completes, in order
    ///
    /// Blank-only segments (from consecutive delimiters) are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let text = self.decode_utf8(chunk);
        self.push_normalized(&text);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find(FRAME_DELIMITER) {
            let frame = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + FRAME_DELIMITER.len());
            if frame.trim().is_empty() {
                continue;
            }
            frames.push(frame);
        }
        frames
    }

    /// Text received after the last complete frame
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Number of bytes held back (pending text plus undecoded tail)
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.carry.len() + usize::from(self.pending_cr)
    }

    /// Drop all pending state, returning how many bytes were discarded
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending_len();
        self.buffer.clear();
        self.carry.clear();
        self.pending_cr = false;
        dropped
    }

    /// Decode as much of `carry + chunk` as possible
    ///
    /// Invalid sequences become U+FFFD; an incomplete trailing sequence is
    /// kept for the next call.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.carry.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Append text to the buffer, folding `\r\n` into `\n`
    fn push_normalized(&mut self, text: &str) {
        for c in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                if c == '\n' {
                    self.buffer.push('\n');
                    continue;
                }
                self.buffer.push('\r');
            }
            if c == '\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "event: metadata\ndata: {\"session_id\":\"abc\"}\n\n\
                          data: {\"text\":\"h\u{e9}llo \u{1F600} \u{4e16}\u{754c}\"}\n\n\
                          event: done\ndata: {}\n\n";

    fn feed_all(decoder: &mut FrameDecoder, chunks: &[&[u8]]) -> Vec<String> {
        chunks.iter().flat_map(|c| decoder.feed(c)).collect()
    }

    #[test]
    fn test_single_chunk_multiple_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(SAMPLE.as_bytes());

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], "event: metadata\ndata: {\"session_id\":\"abc\"}");
        assert_eq!(frames[2], "event: done\ndata: {}");
        assert_eq!(decoder.pending(), "");
    }

    #[test]
    fn test_partial_frame_retention() {
        let mut decoder = FrameDecoder::new();
        let text = "event: data\ndata: {\"text\":\"hi\"}";

        assert!(decoder.feed(text.as_bytes()).is_empty());
        assert_eq!(decoder.pending(), text);

        let frames = decoder.feed(b"\n\n");
        assert_eq!(frames, vec![text.to_string()]);
        assert_eq!(decoder.pending(), "");
    }

    #[test]
    fn test_empty_chunk_yields_nothing() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"").is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_every_two_way_split_is_equivalent() {
        let bytes = SAMPLE.as_bytes();
        let expected = FrameDecoder::new().feed(bytes);

        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let frames = feed_all(&mut decoder, &[&bytes[..split], &bytes[split..]]);
            assert_eq!(frames, expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_byte_by_byte_is_equivalent() {
        let bytes = SAMPLE.as_bytes();
        let expected = FrameDecoder::new().feed(bytes);

        let mut decoder = FrameDecoder::new();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(feed_all(&mut decoder, &chunks), expected);
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let emoji = "\u{1F600}".as_bytes();
        let mut decoder = FrameDecoder::new();

        let mut first = b"data: ".to_vec();
        first.extend_from_slice(&emoji[..2]);
        assert!(decoder.feed(&first).is_empty());

        let mut second = emoji[2..].to_vec();
        second.extend_from_slice(b"\n\n");
        assert_eq!(decoder.feed(&second), vec!["data: \u{1F600}".to_string()]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: a\xFFb\n\n");
        assert_eq!(frames, vec!["data: a\u{FFFD}b".to_string()]);
    }

    #[test]
    fn test_consecutive_delimiters_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"\n\n\n\ndata: {}\n\n\n\n");
        assert_eq!(frames, vec!["data: {}".to_string()]);
    }

    #[test]
    fn test_crlf_matches_lf() {
        let lf = FrameDecoder::new().feed(SAMPLE.as_bytes());
        let crlf_text = SAMPLE.replace('\n', "\r\n");
        let bytes = crlf_text.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let frames = feed_all(&mut decoder, &[&bytes[..split], &bytes[split..]]);
            assert_eq!(frames, lf, "split at byte {split}");
        }
    }

    #[test]
    fn test_lone_carriage_return_is_kept() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: a\rb\n\n");
        assert_eq!(frames, vec!["data: a\rb".to_string()]);
    }

    #[test]
    fn test_discard_drops_pending_state() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"data: {\"text\":\"dangling");
        decoder.feed(&"\u{e9}".as_bytes()[..1]);

        let dropped = decoder.discard();
        assert_eq!(dropped, "data: {\"text\":\"dangling".len() + 1);
        assert_eq!(decoder.pending_len(), 0);
        assert!(decoder.feed(b"\n\n").is_empty());
    }
}
