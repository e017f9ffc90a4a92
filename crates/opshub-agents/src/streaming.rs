//! Server-Sent Events frame reading.
//!
//! Agent responses arrive as a chunked `text/event-stream` body. Chunk
//! boundaries are arbitrary: they can fall inside a line, inside a `\r\n`
//! pair, or inside a multi-byte UTF-8 sequence. [`SseDecoder`] buffers
//! across all of those and yields one payload per event, where an event is
//! one or more `data:` lines terminated by a blank line.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::AgentError;

/// Payload that marks the end of an agent stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Lazy sequence of raw JSON payloads, one per SSE event.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>;

// ─────────────────────────────────────────────────────────────────────────────
// UTF-8 Streaming
// ─────────────────────────────────────────────────────────────────────────────

/// Decode as much of `byte_buffer` as possible, leaving an incomplete trailing
/// sequence in the buffer for the next chunk.
///
/// Invalid sequences in the middle of the buffer are replaced with U+FFFD so a
/// single bad byte cannot stall the stream.
pub fn decode_utf8_streaming(byte_buffer: &mut Vec<u8>) -> Option<String> {
    let mut decoded = String::new();

    loop {
        match std::str::from_utf8(byte_buffer) {
            Ok(s) => {
                decoded.push_str(s);
                byte_buffer.clear();
                break;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                // Safe: from_utf8 just validated this prefix
                decoded.push_str(std::str::from_utf8(&byte_buffer[..valid_up_to]).unwrap_or_default());

                match e.error_len() {
                    Some(bad_len) => {
                        decoded.push(char::REPLACEMENT_CHARACTER);
                        byte_buffer.drain(..valid_up_to + bad_len);
                    }
                    None => {
                        // Incomplete sequence at the end, wait for more bytes
                        byte_buffer.drain(..valid_up_to);
                        break;
                    }
                }
            }
        }
    }

    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental SSE decoder.
///
/// Feed it chunks with [`push`](Self::push) and call [`finish`](Self::finish)
/// once the underlying stream has closed.
#[derive(Debug, Default)]
pub struct SseDecoder {
    byte_buffer: Vec<u8>,
    line_buffer: String,
    data: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every payload completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.byte_buffer.extend_from_slice(chunk);
        if let Some(text) = decode_utf8_streaming(&mut self.byte_buffer) {
            self.line_buffer.push_str(&text);
        }

        let mut payloads = Vec::new();
        while let Some(line_end) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=line_end).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(payload) = self.process_line(line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush whatever is still buffered once the byte stream has ended.
    ///
    /// A trailing line without a newline and an event without its terminating
    /// blank line are both delivered here rather than lost.
    pub fn finish(&mut self) -> Option<String> {
        if !self.byte_buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.byte_buffer).into_owned();
            self.byte_buffer.clear();
            self.line_buffer.push_str(&rest);
        }

        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            if let Some(payload) = self.process_line(line.trim_end_matches('\r')) {
                return Some(payload);
            }
        }

        self.dispatch()
    }

    /// True when part of an event has been read but not yet terminated.
    pub fn has_pending(&self) -> bool {
        self.data.is_some() || !self.line_buffer.is_empty() || !self.byte_buffer.is_empty()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.trim().is_empty() {
            return self.dispatch();
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => match &mut self.data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" | "id" | "retry" => {}
            other => debug!("Ignoring unknown SSE field '{}'", other),
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        let data = self.data.take()?;
        let trimmed = data.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame Reader
// ─────────────────────────────────────────────────────────────────────────────

struct ReaderState<S> {
    inner: S,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    closed: bool,
}

/// Turn a chunked byte stream into a stream of SSE payloads.
///
/// The sequence ends when the body ends or a [`DONE_MARKER`] payload is read.
/// A transport error is yielded once and then the sequence ends; there is no
/// retry and no timeout here.
pub fn read_frames<S, B, E>(byte_stream: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = ReaderState {
        inner: byte_stream,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        closed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.ready.pop_front() {
                if payload == DONE_MARKER {
                    debug!("Received stream completion marker");
                    return None;
                }
                return Some((Ok(payload), state));
            }

            if state.closed {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(chunk.as_ref());
                    state.ready.extend(payloads);
                }
                Some(Err(e)) => {
                    state.closed = true;
                    return Some((Err(AgentError::Stream(e.to_string())), state));
                }
                None => {
                    state.closed = true;
                    if state.decoder.has_pending() {
                        debug!("Stream closed with an unterminated event, flushing it");
                    }
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
