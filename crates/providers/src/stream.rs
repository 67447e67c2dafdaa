//! Streaming decoders.
//!
//! Turn a raw byte stream (e.g. `reqwest::Response::bytes_stream()`) into a
//! lazy stream of text fragments. Two wire formats are supported:
//!
//! - **SSE** (`text/event-stream`): only `data:` lines carry payloads,
//!   `[DONE]` ends the stream, comments and `event:`/`id:` lines are ignored.
//! - **NDJSON**: every non-blank line is a JSON record.
//!
//! Lines are reassembled at the byte level, so a record (or a multi-byte
//! character) split across network chunks decodes the same as an unsplit
//! one. A final line without a trailing newline is still delivered.
//! Callers pass an extractor that pulls the text out of each JSON record;
//! records that fail to parse, or yield nothing, are skipped.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use tracing::{trace, warn};

/// Byte-level line splitter over a chunked source.
struct LineDecoder<S> {
    source: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl<S, B, E> LineDecoder<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    fn new(source: S) -> Self {
        Self {
            source: Box::pin(source),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Next complete line without its terminator, or `None` at end of input.
    async fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                return Some(Self::finish_line(line));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut self.buffer);
                return Some(Self::finish_line(line));
            }

            match self.source.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    warn!(error = %e, "Stream transport error, ending stream");
                    self.buffer.clear();
                    self.finished = true;
                }
                None => self.finished = true,
            }
        }
    }

    fn finish_line(mut line: Vec<u8>) -> String {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

/// Payload of an SSE `data:` line.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

fn extract_from<F>(payload: &str, extract: &mut F) -> Option<String>
where
    F: FnMut(&Value) -> Option<String>,
{
    match serde_json::from_str::<Value>(payload) {
        Ok(json) => extract(&json).filter(|text| !text.is_empty()),
        Err(e) => {
            trace!(error = %e, "Skipping unparseable stream record");
            None
        }
    }
}

/// Decode an SSE byte stream into text fragments.
pub fn sse_stream<S, B, E, F>(source: S, extract: F) -> impl Stream<Item = String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&Value) -> Option<String>,
{
    futures::stream::unfold(
        (LineDecoder::new(source), extract),
        |(mut lines, mut extract)| async move {
            while let Some(line) = lines.next_line().await {
                let Some(data) = sse_data(&line) else {
                    continue;
                };
                if data == "[DONE]" {
                    return None;
                }
                if let Some(text) = extract_from(data, &mut extract) {
                    return Some((text, (lines, extract)));
                }
            }
            None
        },
    )
}

/// Decode a newline-delimited JSON byte stream into text fragments.
pub fn ndjson_stream<S, B, E, F>(source: S, extract: F) -> impl Stream<Item = String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&Value) -> Option<String>,
{
    futures::stream::unfold(
        (LineDecoder::new(source), extract),
        |(mut lines, mut extract)| async move {
            while let Some(line) = lines.next_line().await {
                let record = line.trim();
                if record.is_empty() {
                    continue;
                }
                if let Some(text) = extract_from(record, &mut extract) {
                    return Some((text, (lines, extract)));
                }
            }
            None
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    type Chunk = Result<Vec<u8>, std::io::Error>;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Chunk> {
        let owned: Vec<Chunk> = parts.iter().map(|p| Ok(p.to_vec())).collect();
        futures::stream::iter(owned)
    }

    fn openai_delta(v: &Value) -> Option<String> {
        v["choices"][0]["delta"]["content"].as_str().map(String::from)
    }

    fn ollama_content(v: &Value) -> Option<String> {
        v["message"]["content"].as_str().map(String::from)
    }

    const SSE_PAYLOAD: &str = concat!(
        ": keep-alive\r\n",
        "event: message\r\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\r\n",
        "\r\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Héllo\"}}]}\r\n",
        "\r\n",
        "data: {not json}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" wörld\"}}]}\n",
        "\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"after done\"}}]}\n",
    );

    async fn collect_sse(parts: &[&[u8]]) -> Vec<String> {
        sse_stream(chunks(parts), openai_delta).collect().await
    }

    #[tokio::test]
    async fn sse_whole_payload() {
        let out = collect_sse(&[SSE_PAYLOAD.as_bytes()]).await;
        assert_eq!(out, vec!["Héllo", " wörld"]);
    }

    #[tokio::test]
    async fn sse_any_two_way_split_is_equivalent() {
        let bytes = SSE_PAYLOAD.as_bytes();
        let expected = collect_sse(&[bytes]).await;
        for cut in 0..=bytes.len() {
            let (a, b) = bytes.split_at(cut);
            assert_eq!(collect_sse(&[a, b]).await, expected, "split at byte {cut}");
        }
    }

    #[tokio::test]
    async fn sse_byte_at_a_time() {
        let bytes = SSE_PAYLOAD.as_bytes();
        let parts: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(collect_sse(&parts).await, vec!["Héllo", " wörld"]);
    }

    #[tokio::test]
    async fn sse_flushes_unterminated_final_line() {
        let out = collect_sse(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]).await;
        assert_eq!(out, vec!["tail"]);
    }

    #[tokio::test]
    async fn sse_data_without_space() {
        let out = collect_sse(&[b"data:{\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n"]).await;
        assert_eq!(out, vec!["x"]);
    }

    #[tokio::test]
    async fn sse_transport_error_ends_stream() {
        let source = futures::stream::iter(vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
            Err(std::io::Error::other("reset")),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n".to_vec()),
        ]);
        let out: Vec<String> = sse_stream(source, openai_delta).collect().await;
        assert_eq!(out, vec!["a"]);
    }

    #[tokio::test]
    async fn ndjson_split_records() {
        let payload = concat!(
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
            "\n",
            "garbage\n",
            "{\"message\":{\"content\":\"lo\"},\"done\":false}\r\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}",
        );
        let bytes = payload.as_bytes();
        for cut in [1, 17, 40, bytes.len() - 3] {
            let (a, b) = bytes.split_at(cut);
            let out: Vec<String> = ndjson_stream(chunks(&[a, b]), ollama_content).collect().await;
            assert_eq!(out, vec!["Hel", "lo"], "split at byte {cut}");
        }
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let out: Vec<String> = ndjson_stream(chunks(&[]), ollama_content).collect().await;
        assert!(out.is_empty());
    }
}
