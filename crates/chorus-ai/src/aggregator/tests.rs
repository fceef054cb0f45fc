use std::collections::HashMap;
use std::time::Duration;

use futures_util::StreamExt;

use super::*;
use crate::error::{ErrorKind, ProviderError};

/// Emits `count` content events, optionally pausing between them.
struct Scripted {
    index: usize,
    id: String,
    count: usize,
    delay: Duration,
    fail_after: Option<usize>,
    panic: bool,
}

impl Scripted {
    fn new(index: usize, count: usize) -> Self {
        Self {
            index,
            id: format!("@test/model-{index}"),
            count,
            delay: Duration::ZERO,
            fail_after: None,
            panic: false,
        }
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }
}

#[async_trait]
impl Producer for Scripted {
    fn model_index(&self) -> usize {
        self.index
    }

    fn model_id(&self) -> &str {
        &self.id
    }

    async fn produce(&self, sink: EventSink) -> Result<(), AiError> {
        for i in 0..self.count {
            if self.fail_after == Some(i) {
                return Err(ProviderError::Api("scripted failure".into()).into());
            }
            if self.panic {
                panic!("scripted panic");
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if !sink.emit(StreamEventKind::content(format!("{}:{i}", self.index))) {
                return Ok(());
            }
        }
        if self.fail_after == Some(self.count) {
            return Err(ProviderError::Api("scripted failure".into()).into());
        }
        Ok(())
    }
}

fn producers(items: Vec<Scripted>) -> Vec<Arc<dyn Producer>> {
    items
        .into_iter()
        .map(|p| Arc::new(p) as Arc<dyn Producer>)
        .collect()
}

fn by_model(events: &[StreamEvent]) -> HashMap<usize, Vec<String>> {
    let mut map: HashMap<usize, Vec<String>> = HashMap::new();
    for event in events {
        if let Some(text) = event.content() {
            map.entry(event.model_index).or_default().push(text.to_string());
        }
    }
    map
}

#[tokio::test]
async fn merges_all_events_then_terminates() {
    let aggregator = StreamAggregator::new();
    let stream = aggregator.run(producers(vec![
        Scripted::new(0, 5).delay(Duration::from_millis(1)),
        Scripted::new(1, 5),
        Scripted::new(2, 5).delay(Duration::from_millis(2)),
    ]));
    let events: Vec<StreamEvent> = stream.collect().await;
    assert_eq!(events.len(), 15);

    // Per-model order is preserved regardless of interleaving.
    let grouped = by_model(&events);
    for index in 0..3 {
        let expected: Vec<String> = (0..5).map(|i| format!("{index}:{i}")).collect();
        assert_eq!(grouped[&index], expected);
    }
}

#[tokio::test]
async fn empty_batch_terminates_immediately() {
    let aggregator = StreamAggregator::new();
    let mut stream = aggregator.run(Vec::new());
    assert!(stream.next().await.is_none());
    assert!(stream.is_done());
}

#[tokio::test]
async fn failing_producer_is_isolated() {
    let aggregator = StreamAggregator::new();
    let stream = aggregator.run(producers(vec![
        Scripted::new(1, 4),
        Scripted::new(2, 4).fail_after(0),
        Scripted::new(3, 4).delay(Duration::from_millis(1)),
    ]));
    let events: Vec<StreamEvent> = stream.collect().await;

    let errors: Vec<&StreamEvent> = events.iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].model_index, 2);
    assert_eq!(errors[0].model_id, "@test/model-2");
    assert!(matches!(
        errors[0].kind,
        StreamEventKind::Error { error_kind: ErrorKind::Provider, .. }
    ));

    let grouped = by_model(&events);
    assert_eq!(grouped[&1].len(), 4);
    assert_eq!(grouped[&3].len(), 4);
    assert!(!grouped.contains_key(&2));
}

#[tokio::test]
async fn error_after_partial_output_is_terminal() {
    let aggregator = StreamAggregator::new();
    let events: Vec<StreamEvent> = aggregator
        .run(producers(vec![Scripted::new(0, 3).fail_after(2)]))
        .collect()
        .await;
    assert_eq!(events.len(), 3);
    assert!(events[2].is_error());
}

#[tokio::test]
async fn panicking_producer_reports_internal_error() {
    let aggregator = StreamAggregator::new();
    let events: Vec<StreamEvent> = aggregator
        .run(producers(vec![Scripted::new(0, 2), Scripted::new(1, 2).panicking()]))
        .collect()
        .await;
    let errors: Vec<&StreamEvent> = events.iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].model_index, 1);
    assert!(matches!(
        errors[0].kind,
        StreamEventKind::Error { error_kind: ErrorKind::Internal, .. }
    ));
    assert_eq!(by_model(&events)[&0].len(), 2);
}

#[tokio::test]
async fn abort_stops_producers_and_terminates() {
    let aggregator = StreamAggregator::new();
    let mut stream = aggregator.run(producers(vec![
        Scripted::new(0, 1000).delay(Duration::from_millis(5)),
        Scripted::new(1, 1000).delay(Duration::from_millis(5)),
    ]));

    let first = stream.next().await;
    assert!(first.is_some());
    assert!(!aggregator.abort("user cancelled"));

    let rest: Vec<StreamEvent> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("stream terminates after abort");
    assert!(rest.len() < 50);
    assert!(rest.iter().all(|e| !e.is_error()));
}

#[tokio::test]
async fn queued_events_survive_abort() {
    struct Burst;

    #[async_trait]
    impl Producer for Burst {
        fn model_index(&self) -> usize {
            0
        }

        fn model_id(&self) -> &str {
            "@test/burst"
        }

        async fn produce(&self, sink: EventSink) -> Result<(), AiError> {
            for i in 0..3 {
                sink.emit(StreamEventKind::content(i.to_string()));
            }
            // Park until cancelled, then fail; the failure must be swallowed.
            while !sink.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Err(ProviderError::Network("connection reset".into()).into())
        }
    }

    let aggregator = StreamAggregator::new();
    let stream = aggregator.run(vec![Arc::new(Burst) as Arc<dyn Producer>]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!aggregator.abort("stop"));

    let events: Vec<StreamEvent> = stream.collect().await;
    let texts: Vec<&str> = events.iter().filter_map(StreamEvent::content).collect();
    assert_eq!(texts, vec!["0", "1", "2"]);
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn abort_is_idempotent() {
    let aggregator = StreamAggregator::new();
    // Nothing started yet.
    assert!(aggregator.abort("early"));
    assert!(!aggregator.is_cancelled());

    let stream = aggregator.run(producers(vec![
        Scripted::new(0, 100).delay(Duration::from_millis(5))
    ]));
    assert!(!aggregator.abort("first"));
    assert!(aggregator.abort("second"));
    drop(stream);
}

#[tokio::test]
async fn abort_after_completion_is_a_no_op() {
    let aggregator = StreamAggregator::new();
    let events: Vec<StreamEvent> = aggregator
        .run(producers(vec![Scripted::new(0, 2)]))
        .collect()
        .await;
    assert_eq!(events.len(), 2);
    assert!(aggregator.abort("late"));
    assert!(!aggregator.is_cancelled());
}

#[tokio::test]
async fn dropping_the_stream_cancels_producers() {
    let aggregator = StreamAggregator::new();
    let stream = aggregator.run(producers(vec![
        Scripted::new(0, 100).delay(Duration::from_millis(5))
    ]));
    drop(stream);
    assert!(aggregator.is_cancelled());
}
