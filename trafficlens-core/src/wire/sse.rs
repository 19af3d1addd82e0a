//! Incremental decoder for `text/event-stream` bodies
//!
//! Chunks may split lines or UTF-8 sequences anywhere; the decoder buffers
//! partial lines until a terminator arrives.

use super::event::StreamEvent;
use crate::Error;

#[derive(Debug, Default)]
pub struct SseDecoder {
    line_buf: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the `data` payloads of every event it completes.
    ///
    /// Comment lines (`:` prefix) are keep-alives and are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.line_buf);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if let Some(payload) = self.process_line(&String::from_utf8_lossy(&line)) {
                    payloads.push(payload);
                }
            } else {
                self.line_buf.push(byte);
            }
        }
        payloads
    }

    /// Like [`SseDecoder::feed`], parsing each payload as a [`StreamEvent`].
    ///
    /// A malformed payload yields an `Err` for that event only.
    pub fn feed_events(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, Error>> {
        self.feed(chunk)
            .iter()
            .map(|data| StreamEvent::parse(data))
            .collect()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if !self.has_data {
                return None;
            }
            self.has_data = false;
            return Some(std::mem::take(&mut self.data));
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // event, id and retry carry nothing the consumer needs
        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_event() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn skips_keep_alive_comments() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b":\n\n: keep-alive\n\n").is_empty());
        let payloads = decoder.feed(b": ping\ndata: x\n\n");
        assert_eq!(payloads, vec!["x".to_string()]);
    }

    #[test]
    fn handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn joins_multiline_data_and_ignores_other_fields() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"event: tick\nid: 7\ndata: one\ndata: two\nretry: 10\n\n");
        assert_eq!(payloads, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: Elm \u{2192} 2nd\n\n".as_bytes();
        let (head, tail) = bytes.split_at(12);
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec!["Elm \u{2192} 2nd".to_string()]);
    }

    #[test]
    fn malformed_event_does_not_poison_stream() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed_events(
            b"data: {broken\n\ndata: {\"type\":\"error\",\"message\":\"Bridge offline\"}\n\n",
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Err(Error::MalformedEvent(_))));
        assert_eq!(
            events[1].as_ref().unwrap(),
            &StreamEvent::error("Bridge offline")
        );
    }
}
