// SPDX-License-Identifier: MIT

//! NDJSON streaming decoder for `/api/chat` with `stream=true`
//!
//! [`NdjsonDecoder`] is a plain incremental parser: feed it chunks with
//! [`NdjsonDecoder::push`], then call [`NdjsonDecoder::finish`] at end of
//! input. [`decode_stream`] drives it from any byte stream and maps the
//! surfaced records to generic responses.

use super::response::to_generate_response;
use super::types::ChatResponse;
use crate::adk::error::{AdapterError, Result};
use crate::adk::model::ResponseStream;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

/// Incremental line decoder.
///
/// Bytes are buffered until a newline arrives; only complete lines are
/// decoded, so a UTF-8 sequence split across chunks is never cut.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    terminal_seen: bool,
    received_bytes: bool,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `done=true` record has been surfaced
    pub fn is_terminated(&self) -> bool {
        self.terminal_seen
    }

    /// Feed one chunk and return the records it completed, in arrival order.
    ///
    /// Records with `done=false` and no text or tool calls are dropped;
    /// unparsable lines are logged and skipped. After the terminal record
    /// everything else is ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ChatResponse> {
        let mut surfaced = Vec::new();
        if self.terminal_seen {
            return surfaced;
        }
        if !chunk.is_empty() {
            self.received_bytes = true;
        }
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return surfaced;
        };
        let incomplete = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, incomplete);

        for line in complete.split(|b| *b == b'\n') {
            if let Some(record) = self.decode_line(line) {
                surfaced.push(record);
            }
            if self.terminal_seen {
                self.buffer.clear();
                break;
            }
        }
        surfaced
    }

    /// Flush at end of input.
    ///
    /// A trailing line without a newline is decoded. If no terminal record
    /// was ever seen, the last item is [`AdapterError::StreamTruncated`], or
    /// [`AdapterError::MissingBody`] when not a single byte arrived.
    pub fn finish(&mut self) -> Vec<Result<ChatResponse>> {
        if self.terminal_seen {
            return Vec::new();
        }

        let rest = std::mem::take(&mut self.buffer);
        let mut items: Vec<Result<ChatResponse>> =
            self.decode_line(&rest).into_iter().map(Ok).collect();

        if !self.terminal_seen {
            if self.received_bytes {
                log::warn!("Ollama stream ended without a terminal record");
                items.push(Err(AdapterError::StreamTruncated));
            } else {
                items.push(Err(AdapterError::MissingBody));
            }
        }
        items
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<ChatResponse> {
        let text = String::from_utf8_lossy(line);
        let line = text.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<ChatResponse>(line) {
            Ok(record) if record.done => {
                self.terminal_seen = true;
                Some(record)
            }
            Ok(record) if record.has_content() => Some(record),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Skipping malformed stream line {:?}: {}", line, e);
                None
            }
        }
    }
}

struct DecodeState<B, E> {
    body: Option<BoxStream<'static, std::result::Result<B, E>>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<Result<ChatResponse>>,
}

/// Decode an NDJSON byte stream into chat records.
///
/// The body is dropped as soon as the terminal record, a transport error
/// or end of input is reached; dropping the returned stream drops it too.
pub fn decode_records<S, B, E>(body: S) -> BoxStream<'static, Result<ChatResponse>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AdapterError> + Send + 'static,
{
    let state = DecodeState {
        body: Some(body.boxed()),
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            let next = state.body.as_mut()?.next().await;

            match next {
                Some(Ok(chunk)) => {
                    let records = state.decoder.push(chunk.as_ref());
                    state.pending.extend(records.into_iter().map(Ok));
                    if state.decoder.is_terminated() {
                        state.body = None;
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e.into()));
                    state.body = None;
                }
                None => {
                    state.pending.extend(state.decoder.finish());
                    state.body = None;
                }
            }
        }
    })
    .boxed()
}

/// Decode an NDJSON byte stream into generic responses
pub fn decode_stream<S, B, E>(body: S) -> ResponseStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AdapterError> + Send + 'static,
{
    decode_records(body)
        .map(|item| {
            item.map(|record| {
                log::debug!("Ollama stream record: {:?}", record);
                to_generate_response(&record)
            })
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::FinishReason;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    type Chunk = std::result::Result<Vec<u8>, AdapterError>;

    fn chunks(parts: &[&str]) -> Vec<Chunk> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    /// Sets its flag when dropped
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// A body that yields `items` and then never ends, plus a flag that
    /// flips once the body has been released
    fn held_body(items: Vec<Chunk>) -> (BoxStream<'static, Chunk>, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(released.clone());
        let body = stream::iter(items)
            .chain(stream::pending())
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed();
        (body, released)
    }

    #[test]
    fn test_record_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();
        let first = decoder.push(br#"{"message":{"content":"a"},"done":false}
{"mess"#);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].message.content, "a");

        let second = decoder.push(
            br#"age":{"content":"b"},"done":true}
"#,
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message.content, "b");
        assert!(second[0].done);
        assert!(decoder.is_terminated());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(b"not-json\n{\"message\":{\"content\":\"x\"},\"done\":true}\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message.content, "x");
    }

    #[test]
    fn test_empty_intermediate_records_are_dropped() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(
            b"{\"message\":{\"content\":\"\"},\"done\":false}\n\n   \n{\"message\":{\"role\":\"assistant\"},\"done\":false}\n",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_tool_call_record_is_surfaced() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(
            br#"{"message":{"content":"","tool_calls":[{"function":{"name":"f","arguments":"{}"}}]},"done":false}
"#,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tool_calls()[0].function.name, "f");
    }

    #[test]
    fn test_terminal_record_with_empty_content_is_surfaced() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(b"{\"message\":{\"content\":\"\"},\"done\":true,\"eval_count\":3}\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].eval_count, Some(3));
    }

    #[test]
    fn test_lines_after_terminal_are_ignored() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(
            b"{\"message\":{\"content\":\"end\"},\"done\":true}\n{\"message\":{\"content\":\"late\"},\"done\":false}\n",
        );
        assert_eq!(records.len(), 1);
        assert!(decoder
            .push(b"{\"message\":{\"content\":\"later\"},\"done\":false}\n")
            .is_empty());
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "{\"message\":{\"content\":\"h\u{e9}llo\"},\"done\":true}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        let records = decoder.push(&line[split..]);
        assert_eq!(records[0].message.content, "h\u{e9}llo");
    }

    #[test]
    fn test_unterminated_trailing_line_is_decoded_at_finish() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder
            .push(b"{\"message\":{\"content\":\"tail\"},\"done\":true}")
            .is_empty());
        let items = decoder.finish();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().message.content, "tail");
    }

    #[test]
    fn test_finish_without_terminal_reports_truncation() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push(b"{\"message\":{\"content\":\"partial\"},\"done\":false}\n");
        let items = decoder.finish();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AdapterError::StreamTruncated)));
    }

    #[test]
    fn test_finish_without_any_bytes_reports_missing_body() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.finish();
        assert!(matches!(items[..], [Err(AdapterError::MissingBody)]));
    }

    #[tokio::test]
    async fn test_decode_stream_yields_two_responses() {
        let body = stream::iter(chunks(&[
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n{\"mess",
            "age\":{\"content\":\"b\"},\"done\":true}\n",
        ]));
        let responses: Vec<_> = decode_stream(body).collect().await;
        assert_eq!(responses.len(), 2);

        let first = responses[0].as_ref().unwrap();
        assert_eq!(first.text(), "a");
        assert_eq!(first.finish_reason(), Some(FinishReason::Length));

        let last = responses[1].as_ref().unwrap();
        assert_eq!(last.text(), "b");
        assert_eq!(last.finish_reason(), Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_decode_stream_stops_reading_after_terminal() {
        let body = stream::iter(chunks(&[
            "{\"message\":{\"content\":\"x\"},\"done\":true}\n",
            "{\"message\":{\"content\":\"never\"},\"done\":false}\n",
        ]));
        let responses: Vec<_> = decode_stream(body).collect().await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0].is_ok());
    }

    #[tokio::test]
    async fn test_decode_stream_truncated() {
        let body = stream::iter(chunks(&["{\"message\":{\"content\":\"a\"},\"done\":false}\n"]));
        let responses: Vec<_> = decode_stream(body).collect().await;
        assert_eq!(responses.len(), 2);
        assert!(responses[0].is_ok());
        assert!(matches!(responses[1], Err(AdapterError::StreamTruncated)));
    }

    #[tokio::test]
    async fn test_decode_stream_transport_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(b"{\"message\":{\"content\":\"a\"},\"done\":false}\n".to_vec()),
            Err(AdapterError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
            Ok(b"{\"message\":{\"content\":\"b\"},\"done\":true}\n".to_vec()),
        ]);
        let responses: Vec<_> = decode_stream(body).collect().await;
        assert_eq!(responses.len(), 2);
        assert!(matches!(responses[1], Err(AdapterError::Io(_))));
    }

    #[tokio::test]
    async fn test_body_released_after_terminal_record() {
        let (body, released) =
            held_body(chunks(&["{\"message\":{\"content\":\"x\"},\"done\":true}\n"]));
        let mut records = decode_records(body);

        let first = records.next().await.unwrap().unwrap();
        assert!(first.done);
        assert!(released.load(Ordering::SeqCst));

        let end = tokio::time::timeout(Duration::from_secs(1), records.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_body_released_when_consumer_drops_stream() {
        let (body, released) =
            held_body(chunks(&["{\"message\":{\"content\":\"a\"},\"done\":false}\n"]));
        let mut records = decode_records(body);

        let first = records.next().await.unwrap().unwrap();
        assert_eq!(first.message.content, "a");
        assert!(!released.load(Ordering::SeqCst));

        drop(records);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_body_released_after_transport_error() {
        let (body, released) = held_body(vec![Err(AdapterError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )))]);
        let mut records = decode_records(body);

        assert!(matches!(records.next().await, Some(Err(AdapterError::Io(_)))));
        assert!(released.load(Ordering::SeqCst));

        let end = tokio::time::timeout(Duration::from_secs(1), records.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}
