//! Incremental parser for OpenAI-style `text/event-stream` chat completions.
use serde_json::Value;
use tracing::warn;

/// Accumulates raw body bytes and yields content deltas per complete line.
///
/// Bytes are buffered until a newline so multi-byte characters split across
/// network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDeltaParser {
    buf: Vec<u8>,
    done: bool,
}

impl SseDeltaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line), &mut out);
        }
        out
    }

    /// Flush a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            self.handle_line(&String::from_utf8_lossy(&line), &mut out);
        }
        out
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<String>) {
        if self.done {
            return;
        }
        let Some(data) = line.trim().strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(v) => {
                if let Some(delta) = v["choices"][0]["delta"]["content"].as_str() {
                    if !delta.is_empty() {
                        out.push(delta.to_string());
                    }
                }
            }
            Err(e) => {
                let preview: String = data.chars().take(200).collect();
                warn!(error = %e, data_preview = %preview, "skipping unparsable SSE chunk");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut p = SseDeltaParser::new();
        assert!(p.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel").is_empty());
        assert_eq!(p.push(b"lo\"}}]}\n\n"), vec!["Hello"]);
        let out = p.push(b": keepalive\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n");
        assert_eq!(out, vec![" world"]);
        assert!(!p.is_done());
        assert!(p.push(b"data: [DONE]\n").is_empty());
        assert!(p.is_done());
        assert!(p.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n").is_empty());
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}".as_bytes();
        let split = line.len() - 6;
        let mut p = SseDeltaParser::new();
        assert!(p.push(&line[..split]).is_empty());
        assert!(p.push(&line[split..]).is_empty());
        assert_eq!(p.finish(), vec!["café"]);
    }

    #[test]
    fn bad_json_is_skipped() {
        let mut p = SseDeltaParser::new();
        assert!(p.push(b"data: {not json\n").is_empty());
    }
}
