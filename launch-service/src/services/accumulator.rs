//! Turns an upstream server-sent-event byte stream into session text.

use crate::services::providers::{ChunkEvent, ProviderAdapter};
use crate::services::session_store::SessionStore;
use futures::{Stream, StreamExt};
use metrics::counter;
use std::fmt::Display;
use std::sync::Arc;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Result of feeding one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    /// Sentinel or provider stop event seen; session marked complete.
    Finished,
    /// Provider reported an error in-band; failure recorded on the session.
    Failed,
    /// The session was evicted underneath us.
    SessionGone,
}

/// How a whole stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Finished,
    /// Upstream closed without a sentinel; session marked complete anyway.
    Closed,
    /// Transport or in-band provider error; failure recorded on the session.
    Failed,
    SessionGone,
}

/// Writes one upstream stream into one session.
pub struct StreamAccumulator {
    store: SessionStore,
    session_id: String,
    adapter: Arc<dyn ProviderAdapter>,
    pending: Vec<u8>,
}

impl StreamAccumulator {
    pub fn new(store: SessionStore, session_id: String, adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            store,
            session_id,
            adapter,
            pending: Vec::new(),
        }
    }

    /// Consume the stream to its end, sentinel, or first transport error.
    pub async fn run<S, B, E>(mut self, stream: S) -> StreamOutcome
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        futures::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => match self.feed_bytes(chunk.as_ref()) {
                    LineOutcome::Continue => {}
                    LineOutcome::Finished => return StreamOutcome::Finished,
                    LineOutcome::Failed => return StreamOutcome::Failed,
                    LineOutcome::SessionGone => return self.session_gone(),
                },
                Err(e) => {
                    tracing::error!(
                        session_id = %self.session_id,
                        provider = %self.adapter.id(),
                        error = %e,
                        "Upstream stream failed"
                    );
                    counter!("upstream_errors_total", "provider" => self.adapter.id().as_str())
                        .increment(1);
                    if !self.store.fail(&self.session_id, e.to_string()) {
                        return self.session_gone();
                    }
                    return StreamOutcome::Failed;
                }
            }
        }

        // A last line without a trailing newline.
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            match self.feed_line(&String::from_utf8_lossy(&rest)) {
                LineOutcome::Continue => {}
                LineOutcome::Finished => return StreamOutcome::Finished,
                LineOutcome::Failed => return StreamOutcome::Failed,
                LineOutcome::SessionGone => return self.session_gone(),
            }
        }

        if !self.store.complete(&self.session_id) {
            return self.session_gone();
        }
        tracing::info!(
            session_id = %self.session_id,
            provider = %self.adapter.id(),
            "Upstream stream closed; session complete"
        );
        StreamOutcome::Closed
    }

    /// Buffer raw bytes and feed every complete line. Lines may straddle
    /// chunk boundaries, including inside a multi-byte character.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> LineOutcome {
        self.pending.extend_from_slice(bytes);

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let outcome = self.feed_line(&line);
            if outcome != LineOutcome::Continue {
                self.pending.clear();
                return outcome;
            }
        }

        LineOutcome::Continue
    }

    /// Handle one SSE line. Anything other than a `data:` line is ignored.
    pub fn feed_line(&mut self, line: &str) -> LineOutcome {
        let line = line.trim_end_matches('\r');
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            return LineOutcome::Continue;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == DONE_SENTINEL {
            return self.finish();
        }

        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    provider = %self.adapter.id(),
                    error = %e,
                    "Skipping unparseable stream chunk"
                );
                self.count_skip();
                return LineOutcome::Continue;
            }
        };

        match self.adapter.extract(&value) {
            ChunkEvent::Fragment(text) if text.is_empty() => LineOutcome::Continue,
            ChunkEvent::Fragment(text) => {
                if self.store.append(&self.session_id, &text) {
                    LineOutcome::Continue
                } else {
                    LineOutcome::SessionGone
                }
            }
            ChunkEvent::Done => self.finish(),
            ChunkEvent::Failed(reason) => {
                tracing::error!(
                    session_id = %self.session_id,
                    provider = %self.adapter.id(),
                    error = %reason,
                    "Provider reported a stream error"
                );
                counter!("upstream_errors_total", "provider" => self.adapter.id().as_str())
                    .increment(1);
                if self.store.fail(&self.session_id, reason) {
                    LineOutcome::Failed
                } else {
                    LineOutcome::SessionGone
                }
            }
            ChunkEvent::Skip(reason) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    provider = %self.adapter.id(),
                    reason,
                    "Stream chunk carried no text"
                );
                self.count_skip();
                LineOutcome::Continue
            }
        }
    }

    fn finish(&self) -> LineOutcome {
        if !self.store.complete(&self.session_id) {
            return LineOutcome::SessionGone;
        }
        tracing::info!(
            session_id = %self.session_id,
            provider = %self.adapter.id(),
            "Generation complete"
        );
        LineOutcome::Finished
    }

    fn session_gone(&self) -> StreamOutcome {
        tracing::warn!(
            session_id = %self.session_id,
            "Session evicted while streaming; dropping remaining output"
        );
        StreamOutcome::SessionGone
    }

    fn count_skip(&self) {
        counter!("stream_chunks_skipped_total", "provider" => self.adapter.id().as_str())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{AnthropicAdapter, ChatCompletionsAdapter, GeminiAdapter};
    use crate::services::session_store::SystemClock;
    use std::convert::Infallible;
    use std::time::Duration;

    fn setup(adapter: Arc<dyn ProviderAdapter>) -> (SessionStore, String, StreamAccumulator) {
        let store = SessionStore::new(Arc::new(SystemClock), Duration::from_secs(3600));
        let id = store.create(adapter.id(), "model");
        let acc = StreamAccumulator::new(store.clone(), id.clone(), adapter);
        (store, id, acc)
    }

    fn openai() -> Arc<dyn ProviderAdapter> {
        Arc::new(ChatCompletionsAdapter::openai(None))
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[test]
    fn concatenates_fragments_until_sentinel() {
        let (store, id, mut acc) = setup(openai());
        assert_eq!(acc.feed_line(&delta("<div>")), LineOutcome::Continue);
        assert_eq!(acc.feed_line(&delta("X")), LineOutcome::Continue);
        assert_eq!(acc.feed_line(&delta("</div>")), LineOutcome::Continue);
        assert_eq!(acc.feed_line("data: [DONE]"), LineOutcome::Finished);

        let snapshot = store.snapshot(&id).unwrap();
        assert!(snapshot.is_complete);
        assert_eq!(snapshot.content, "<div>X</div>");
    }

    #[test]
    fn malformed_chunk_does_not_interrupt() {
        let (store, id, mut acc) = setup(openai());
        acc.feed_line(&delta("a"));
        assert_eq!(acc.feed_line("data: {not json"), LineOutcome::Continue);
        acc.feed_line(&delta("b"));

        let snapshot = store.snapshot(&id).unwrap();
        assert_eq!(snapshot.content, "ab");
        assert!(!snapshot.is_complete);
    }

    #[test]
    fn missing_field_is_skipped_for_every_provider() {
        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            openai(),
            Arc::new(AnthropicAdapter::new(None)),
            Arc::new(GeminiAdapter::new(None)),
        ];
        for adapter in adapters {
            let (store, id, mut acc) = setup(adapter);
            assert_eq!(
                acc.feed_line(r#"data: {"unexpected": true}"#),
                LineOutcome::Continue
            );
            assert_eq!(store.snapshot(&id).unwrap().content, "");
        }
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let (store, id, mut acc) = setup(openai());
        assert_eq!(acc.feed_line(""), LineOutcome::Continue);
        assert_eq!(acc.feed_line(": keep-alive"), LineOutcome::Continue);
        assert_eq!(acc.feed_line("event: message"), LineOutcome::Continue);
        assert_eq!(store.snapshot(&id).unwrap().content, "");
    }

    #[test]
    fn data_prefix_without_space_and_crlf_are_accepted() {
        let (store, id, mut acc) = setup(openai());
        let line = format!("{}\r", delta("hi").replacen("data: ", "data:", 1));
        acc.feed_line(&line);
        assert_eq!(acc.feed_line("data:[DONE]\r"), LineOutcome::Finished);
        assert_eq!(store.snapshot(&id).unwrap().content, "hi");
    }

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let (store, id, mut acc) = setup(openai());
        let payload = format!("{}\n\n{}\n\n", delta("héllo"), delta(" wörld"));
        let bytes = payload.as_bytes();
        // Split inside the multi-byte 'é'.
        let cut = payload.find('é').unwrap() + 1;
        acc.feed_bytes(&bytes[..cut]);
        assert_eq!(store.snapshot(&id).unwrap().content, "");
        acc.feed_bytes(&bytes[cut..]);
        assert_eq!(store.snapshot(&id).unwrap().content, "héllo wörld");
    }

    #[test]
    fn data_after_sentinel_is_ignored() {
        let (store, id, mut acc) = setup(openai());
        let payload = format!("{}\ndata: [DONE]\n{}\n", delta("kept"), delta("dropped"));
        assert_eq!(acc.feed_bytes(payload.as_bytes()), LineOutcome::Finished);
        assert_eq!(store.snapshot(&id).unwrap().content, "kept");
    }

    #[test]
    fn evicted_session_stops_accumulation() {
        let (store, id, mut acc) = setup(openai());
        store.remove(&id);
        assert_eq!(acc.feed_line(&delta("late")), LineOutcome::SessionGone);
    }

    #[test]
    fn anthropic_message_stop_finishes() {
        let (store, id, mut acc) = setup(Arc::new(AnthropicAdapter::new(None)));
        acc.feed_line("event: content_block_delta");
        acc.feed_line(
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"<div>A</div>"}}"#,
        );
        assert_eq!(
            acc.feed_line(r#"data: {"type":"message_stop"}"#),
            LineOutcome::Finished
        );
        let snapshot = store.snapshot(&id).unwrap();
        assert!(snapshot.is_complete);
        assert_eq!(snapshot.content, "<div>A</div>");
    }

    #[tokio::test]
    async fn in_band_error_event_records_failure() {
        let (store, id, acc) = setup(Arc::new(AnthropicAdapter::new(None)));
        let body = concat!(
            "event: content_block_delta\n",
            r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"<div>half"}}"#,
            "\n\nevent: error\n",
            r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            "\n\n",
        );
        let chunks: Vec<Result<Vec<u8>, Infallible>> = vec![Ok(body.as_bytes().to_vec())];

        let outcome = acc.run(futures::stream::iter(chunks)).await;

        assert_eq!(outcome, StreamOutcome::Failed);
        let snapshot = store.snapshot(&id).unwrap();
        assert!(snapshot.is_complete);
        assert_eq!(snapshot.content, "<div>half");
        assert_eq!(
            snapshot.failure.as_deref(),
            Some("overloaded_error: Overloaded")
        );
    }

    #[tokio::test]
    async fn stream_closing_without_sentinel_completes_session() {
        let (store, id, acc) = setup(Arc::new(GeminiAdapter::new(None)));
        let chunks: Vec<Result<Vec<u8>, Infallible>> = vec![
            Ok(br#"data: {"candidates":[{"content":{"parts":[{"text":"<div>"}]}}]}"#.to_vec()),
            Ok(b"\n\n".to_vec()),
            Ok(br#"data: {"candidates":[{"content":{"parts":[{"text":"G</div>"}]}}]}"#.to_vec()),
        ];

        let outcome = acc.run(futures::stream::iter(chunks)).await;

        assert_eq!(outcome, StreamOutcome::Closed);
        let snapshot = store.snapshot(&id).unwrap();
        assert!(snapshot.is_complete);
        assert_eq!(snapshot.content, "<div>G</div>");
    }

    #[tokio::test]
    async fn transport_error_records_failure() {
        let (store, id, acc) = setup(openai());
        let first = format!("{}\n", delta("partial"));
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(first.into_bytes()),
            Err("connection reset by peer".to_string()),
            Ok(b"never read\n".to_vec()),
        ];

        let outcome = acc.run(futures::stream::iter(chunks)).await;

        assert_eq!(outcome, StreamOutcome::Failed);
        let snapshot = store.snapshot(&id).unwrap();
        assert_eq!(snapshot.content, "partial");
        assert!(snapshot.is_complete);
        assert_eq!(snapshot.failure.as_deref(), Some("connection reset by peer"));
    }
}
