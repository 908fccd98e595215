use tracing::debug;

use super::types::GenerateResponse;

/// Splits a byte stream of newline-delimited JSON into generate responses.
///
/// Network chunks do not respect line boundaries, so partial lines are kept
/// until their newline arrives. Lines that do not decode are skipped.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every complete line decoded so far.
    ///
    /// Only the newly appended bytes are searched for line ends.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<GenerateResponse> {
        let mut search_from = self.buffer.len();
        self.buffer.extend_from_slice(bytes);

        let mut decoded = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            if let Some(chunk) = decode_line(&self.buffer[line_start..end]) {
                decoded.push(chunk);
            }
            line_start = end + 1;
            search_from = line_start;
        }
        self.buffer.drain(..line_start);
        decoded
    }

    /// Decodes whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<GenerateResponse> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<GenerateResponse> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateResponse>(text) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!("Skipping undecodable stream line '{}': {}", text, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();

        assert!(decoder.push(br#"{"response":"Hel"#).is_empty());
        let chunks = decoder.push(b"lo\",\"done\":false}\n{\"response\":\" world\"}\n");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].response, "Hello");
        assert_eq!(chunks[1].response, " world");
    }

    #[test]
    fn test_long_line_fed_byte_by_byte() {
        let text = "x".repeat(10_000);
        let line = format!("{{\"response\":\"{}\",\"done\":true}}\n", text);
        let mut decoder = NdjsonDecoder::new();

        let mut chunks = Vec::new();
        for byte in line.as_bytes() {
            chunks.extend(decoder.push(std::slice::from_ref(byte)));
        }

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].response, text);
        assert!(chunks[0].done);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_several_lines_in_one_chunk_leave_the_tail_buffered() {
        let mut decoder = NdjsonDecoder::new();
        let chunks = decoder.push(b"{\"response\":\"a\"}\n{\"response\":\"b\"}\n{\"resp");
        assert_eq!(chunks.len(), 2);

        let rest = decoder.push(b"onse\":\"c\"}\n");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].response, "c");
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let mut decoder = NdjsonDecoder::new();
        let chunks = decoder.push(b"not json\n\n{\"response\":\"ok\"}\n");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].response, "ok");
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(br#"{"response":"","done":true,"context":[1,2]}"#).is_empty());

        let last = decoder.finish().unwrap();
        assert!(last.done);
        assert_eq!(last.context, Some(vec![1, 2]));
        assert!(decoder.finish().is_none());
    }
}
