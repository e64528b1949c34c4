//! Server-sent event framing.
//!
//! Network chunks can split anywhere, including inside a UTF-8 sequence or a
//! `\r\n` pair, so bytes are held until a full line is available and events
//! are dispatched on the blank line that terminates them.

use memchr::memchr;
use tracing::warn;

/// Payload that ends an OpenAI-compatible stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }

    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline_pos) = memchr(b'\n', &self.pending) {
            let mut line_bytes = &self.pending[..newline_pos];
            if let Some(stripped) = line_bytes.strip_suffix(b"\r") {
                line_bytes = stripped;
            }
            let line = match std::str::from_utf8(line_bytes) {
                Ok(line) => line.to_string(),
                Err(err) => {
                    warn!(error = %err, "Invalid UTF-8 in event stream line");
                    String::from_utf8_lossy(line_bytes).into_owned()
                }
            };
            self.pending.drain(..=newline_pos);

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever the transport left behind when the body ended without a
    /// trailing blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => self.retry = value.trim().parse().ok(),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.take(),
            retry: self.retry.take(),
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_of(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|event| event.data.as_str()).collect()
    }

    #[test]
    fn handles_spacing_variants_and_done() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: Hello\n\ndata:World\n\ndata: [DONE]\n\n");
        assert_eq!(data_of(&events), vec!["Hello", "World", "[DONE]"]);
        assert!(events[2].is_done());
    }

    #[test]
    fn joins_multiline_data_and_keeps_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\nid: 42\nretry: 1500\ndata: a\ndata: b\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
        assert_eq!(events[0].event.as_deref(), Some("message"));
        assert_eq!(events[0].id.as_deref(), Some("42"));
        assert_eq!(events[0].retry, Some(1500));
    }

    #[test]
    fn survives_splits_inside_lines_and_utf8() {
        let payload = "data: héllo\r\n\r\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for byte in payload {
            events.extend(decoder.push(std::slice::from_ref(byte)));
        }
        assert_eq!(data_of(&events), vec!["héllo"]);
    }

    #[test]
    fn ignores_comments_and_empty_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\nevent: ping\n\ndata: x\n\n");
        assert_eq!(data_of(&events), vec!["x"]);
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        let event = decoder.finish().expect("trailing event");
        assert_eq!(event.data, "tail");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn error_events_are_flagged() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: error\ndata: {\"message\":\"boom\"}\n\n");
        assert!(events[0].is_error());
    }
}
