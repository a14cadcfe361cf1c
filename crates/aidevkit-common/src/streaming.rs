use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::sse::{SseField, SseParser};

/// A provider-specific streaming delta object.
///
/// Implementations are the deserialized form of one SSE Data value; the only
/// thing the stream handler needs from them is the text delta they carry, if
/// any.
pub trait StreamChunk: DeserializeOwned {
    fn to_text_delta(&self) -> Option<String>;
}

type DeltaCallback = Box<dyn FnMut(&str) + Send>;
type CompleteCallback = Box<dyn FnMut(&str) + Send>;

/// Consumes raw SSE text fragments and accumulates streamed text.
///
/// For each fragment: parse into field/value pairs, ignore everything that is
/// not a Data field, and for each Data value check the done predicate first.
/// A done value fires the completion callback once with the accumulated text
/// and clears the accumulator. Any other value is deserialized into `C`; a
/// malformed chunk is logged and skipped without aborting the stream, a good
/// one has its text delta passed to the delta callback and appended to the
/// accumulator.
///
/// Processing is strictly sequential: each fragment is fully dispatched
/// before the next one is fed.
pub struct StreamHandler<C: StreamChunk> {
    parser: SseParser,
    text: String,
    on_delta: Option<DeltaCallback>,
    on_complete: Option<CompleteCallback>,
    _chunk: PhantomData<C>,
}

impl<C: StreamChunk> Default for StreamHandler<C> {
    fn default() -> Self {
        Self::new(SseParser::new())
    }
}

impl<C: StreamChunk> StreamHandler<C> {
    pub fn new(parser: SseParser) -> Self {
        Self {
            parser,
            text: String::new(),
            on_delta: None,
            on_complete: None,
            _chunk: PhantomData,
        }
    }

    /// Callback invoked with every text delta as it arrives.
    #[must_use]
    pub fn on_delta(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_delta = Some(Box::new(callback));
        self
    }

    /// Callback invoked once with the full accumulated text when the done
    /// sentinel arrives.
    #[must_use]
    pub fn on_complete(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Text accumulated from all deltas since the last completion.
    #[must_use]
    pub fn streaming_text(&self) -> &str {
        &self.text
    }

    /// Feed one raw fragment as delivered by the transport.
    pub fn feed(&mut self, fragment: &str) {
        for line in self.parser.parse(fragment) {
            if line.field != SseField::Data {
                continue;
            }

            if self.parser.is_done(&line.value) {
                let text = std::mem::take(&mut self.text);
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(&text);
                }
                continue;
            }

            match serde_json::from_str::<C>(&line.value) {
                Ok(chunk) => {
                    if let Some(delta) = chunk.to_text_delta() {
                        if let Some(callback) = self.on_delta.as_mut() {
                            callback(&delta);
                        }
                        self.text.push_str(&delta);
                    }
                }
                Err(err) => {
                    warn!(
                        line = err.line(),
                        column = err.column(),
                        "skipping malformed stream chunk: {err}"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Deserialize)]
    struct TextChunk {
        text: String,
    }

    impl StreamChunk for TextChunk {
        fn to_text_delta(&self) -> Option<String> {
            Some(self.text.clone())
        }
    }

    #[test]
    fn delta_then_done_fires_each_callback_once() {
        let deltas = Arc::new(Mutex::new(Vec::<String>::new()));
        let completions = Arc::new(Mutex::new(Vec::<String>::new()));

        let deltas_sink = Arc::clone(&deltas);
        let completions_sink = Arc::clone(&completions);
        let mut handler = StreamHandler::<TextChunk>::default()
            .on_delta(move |delta| deltas_sink.lock().unwrap().push(delta.to_string()))
            .on_complete(move |text| completions_sink.lock().unwrap().push(text.to_string()));

        handler.feed("data: {\"text\":\"Hi\"}\n\n");
        handler.feed("data: [DONE]\n\n");

        assert_eq!(*deltas.lock().unwrap(), vec!["Hi".to_string()]);
        assert_eq!(*completions.lock().unwrap(), vec!["Hi".to_string()]);
        assert_eq!(handler.streaming_text(), "");
    }

    #[test]
    fn accumulates_multiple_deltas() {
        let mut handler = StreamHandler::<TextChunk>::default();
        handler.feed("data: {\"text\":\"Hello\"}\n\ndata: {\"text\":\", \"}\n\n");
        handler.feed("data: {\"text\":\"world\"}\n\n");
        assert_eq!(handler.streaming_text(), "Hello, world");
    }

    #[test]
    fn malformed_chunk_does_not_stop_the_stream() {
        let deltas = Arc::new(Mutex::new(Vec::<String>::new()));
        let deltas_sink = Arc::clone(&deltas);
        let mut handler = StreamHandler::<TextChunk>::default()
            .on_delta(move |delta| deltas_sink.lock().unwrap().push(delta.to_string()));

        handler.feed("data: {\"text\":\"a\"}\ndata: {not json}\ndata: {\"text\":\"b\"}\n");

        assert_eq!(
            *deltas.lock().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(handler.streaming_text(), "ab");
    }

    #[test]
    fn non_data_fields_are_ignored() {
        let mut handler = StreamHandler::<TextChunk>::default();
        handler.feed("event: message\nid: 3\ndata: {\"text\":\"x\"}\nretry: 100\n");
        assert_eq!(handler.streaming_text(), "x");
    }

    #[test]
    fn completion_resets_for_the_next_stream() {
        let completions = Arc::new(Mutex::new(0usize));
        let completions_sink = Arc::clone(&completions);
        let mut handler = StreamHandler::<TextChunk>::default()
            .on_complete(move |_| *completions_sink.lock().unwrap() += 1);

        handler.feed("data: {\"text\":\"one\"}\ndata: [DONE]\n");
        handler.feed("data: {\"text\":\"two\"}\n");
        assert_eq!(handler.streaming_text(), "two");
        handler.feed("data: [DONE]\n");

        assert_eq!(*completions.lock().unwrap(), 2);
        assert_eq!(handler.streaming_text(), "");
    }
}
