//! Server-Sent Events (SSE) decoding.
//!
//! Turns a byte stream into a stream of [`SseEvent`]s, so providers can
//! consume events lazily and stop reading the moment they are dropped.

use futures_util::{stream, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

use crate::error::ProviderError;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if any.
    pub event: Option<String>,
    /// The `data:` payload; multi-line data is joined with `\n`.
    pub data: String,
}

struct Decoder<R> {
    lines: Lines<R>,
    event: Option<String>,
    data: String,
    finished: bool,
}

impl<R> Decoder<R> {
    fn take_event(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
        })
    }
}

/// Decode SSE events from any buffered reader.
pub fn sse_events<R>(reader: R) -> impl Stream<Item = Result<SseEvent, ProviderError>> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let decoder = Decoder {
        lines: reader.lines(),
        event: None,
        data: String::new(),
        finished: false,
    };
    stream::unfold(decoder, |mut decoder| async move {
        if decoder.finished {
            return None;
        }
        loop {
            match decoder.lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        // Blank line terminates an event.
                        if let Some(event) = decoder.take_event() {
                            return Some((Ok(event), decoder));
                        }
                        continue;
                    }
                    if let Some(name) = line.strip_prefix("event:") {
                        decoder.event = Some(name.trim_start().to_string());
                    } else if let Some(data) = line.strip_prefix("data:") {
                        if !decoder.data.is_empty() {
                            decoder.data.push('\n');
                        }
                        decoder.data.push_str(data.strip_prefix(' ').unwrap_or(data));
                    }
                    // id:, retry: and comments are ignored.
                }
                Ok(None) => {
                    decoder.finished = true;
                    return decoder.take_event().map(|event| (Ok(event), decoder));
                }
                Err(e) => {
                    decoder.finished = true;
                    let err = if e.kind() == std::io::ErrorKind::TimedOut {
                        ProviderError::Timeout
                    } else {
                        ProviderError::Network(e.to_string())
                    };
                    return Some((Err(err), decoder));
                }
            }
        }
    })
}

/// Decode SSE events from a streaming HTTP response body.
pub fn response_events(
    response: reqwest::Response,
) -> impl Stream<Item = Result<SseEvent, ProviderError>> + Send {
    let byte_stream = response
        .bytes_stream()
        .map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    std::io::Error::new(std::io::ErrorKind::TimedOut, e)
                } else {
                    std::io::Error::other(e)
                }
            })
        });
    sse_events(tokio::io::BufReader::new(StreamReader::new(byte_stream)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(input: &'static str) -> Vec<SseEvent> {
        sse_events(input.as_bytes())
            .map(|event| event.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn splits_events_on_blank_lines() {
        let events = decode("data: {\"a\":1}\n\ndata: {\"a\":2}\n\ndata: [DONE]\n\n").await;
        let data: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["{\"a\":1}", "{\"a\":2}", "[DONE]"]);
    }

    #[tokio::test]
    async fn keeps_event_names_and_joins_multiline_data() {
        let events = decode("event: message\ndata: one\ndata: two\nid: 7\n\n").await;
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("message".into()),
                data: "one\ntwo".into(),
            }]
        );
    }

    #[tokio::test]
    async fn flushes_trailing_event_without_blank_line() {
        let events = decode(": keep-alive\n\ndata:tail").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "tail");
        assert_eq!(events[0].event, None);
    }

    #[tokio::test]
    async fn stalled_body_is_a_timeout() {
        let chunks: Vec<Result<&'static [u8], std::io::Error>> = vec![
            Ok(&b"data: first\n\n"[..]),
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out")),
        ];
        let events: Vec<_> = sse_events(StreamReader::new(stream::iter(chunks)))
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().map(|e| e.data.as_str()), Ok("first"));
        assert_eq!(events[1], Err(ProviderError::Timeout));

        let chunks: Vec<Result<&'static [u8], std::io::Error>> =
            vec![Err(std::io::Error::other("connection reset"))];
        let events: Vec<_> = sse_events(StreamReader::new(stream::iter(chunks)))
            .collect()
            .await;
        assert!(matches!(events[..], [Err(ProviderError::Network(_))]));
    }

    #[tokio::test]
    async fn event_without_data_is_skipped() {
        let events = decode("event: ping\n\ndata: x\n\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, None);
    }
}
