//! Fan-in of several concurrent event producers into one stream.
//!
//! Each producer runs on its own tokio task and pushes events into a shared
//! unbounded channel. A supervisor task awaits every producer and then
//! pushes a single `Done` marker, so the consumer sees end-of-stream only
//! after all producers have settled. Per-producer ordering is preserved;
//! interleaving across producers is arrival order.
//!
//! Cancellation is cooperative: [`StreamAggregator::abort`] fires a shared
//! [`CancellationToken`]. Producers stop emitting, while events already in
//! the channel are still delivered before the stream ends.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AiError;
use crate::events::{StreamEvent, StreamEventKind};

/// A unit of work that emits events for one model.
#[async_trait]
pub trait Producer: Send + Sync {
    fn model_index(&self) -> usize;

    fn model_id(&self) -> &str;

    /// Run to completion, emitting through `sink`. An `Err` is reported as
    /// this producer's single terminal error event.
    async fn produce(&self, sink: EventSink) -> Result<(), AiError>;
}

enum Message {
    Event(StreamEvent),
    Done,
}

/// Per-producer handle for pushing events into the merged stream.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Message>,
    model_index: usize,
    model_id: Arc<str>,
    cancel: CancellationToken,
}

impl EventSink {
    /// Tag and enqueue an event. Returns `false` once the stream has been
    /// cancelled or its consumer is gone.
    pub fn emit(&self, kind: StreamEventKind) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let event = StreamEvent {
            model_index: self.model_index,
            model_id: self.model_id.to_string(),
            kind,
        };
        self.tx.send(Message::Event(event)).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Owns the cancellation token shared by one batch of producers.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    cancel: CancellationToken,
    started: AtomicBool,
    finished: Arc<AtomicBool>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by every producer started from this aggregator.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn every producer and return the merged stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(&self, producers: Vec<Arc<dyn Producer>>) -> AggregatedStream {
        self.started.store(true, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(producers.len());
        for producer in producers {
            let sink = EventSink {
                tx: tx.clone(),
                model_index: producer.model_index(),
                model_id: Arc::from(producer.model_id()),
                cancel: self.cancel.clone(),
            };
            let cancel = self.cancel.clone();
            let panic_sink = sink.clone();
            let handle = tokio::spawn(async move {
                let model_index = producer.model_index();
                debug!(model_index, model_id = producer.model_id(), "producer started");
                match producer.produce(sink.clone()).await {
                    Ok(()) => debug!(model_index, "producer finished"),
                    Err(err) if cancel.is_cancelled() => {
                        debug!(model_index, error = %err, "producer error after cancellation")
                    }
                    Err(err) => {
                        warn!(model_index, model_id = producer.model_id(), error = %err, "producer failed");
                        sink.emit(StreamEventKind::error(&err));
                    }
                }
            });
            handles.push((handle, panic_sink));
        }

        let finished = Arc::clone(&self.finished);
        tokio::spawn(async move {
            for (handle, sink) in handles {
                if let Err(join_err) = handle.await {
                    if join_err.is_panic() {
                        warn!(model_index = sink.model_index, "producer panicked");
                        sink.emit(StreamEventKind::error(&AiError::Internal(
                            "model task panicked".into(),
                        )));
                    }
                }
            }
            finished.store(true, Ordering::SeqCst);
            let _ = tx.send(Message::Done);
            debug!("all producers settled");
        });

        AggregatedStream {
            rx,
            cancel: self.cancel.clone(),
            done: false,
        }
    }

    /// Cancel all producers. Returns `true` when there was no live stream to
    /// cancel: never started, already finished, or already aborted.
    pub fn abort(&self, reason: &str) -> bool {
        let live = self.started.load(Ordering::SeqCst)
            && !self.finished.load(Ordering::SeqCst)
            && !self.cancel.is_cancelled();
        if live {
            info!(reason, "aborting stream");
            self.cancel.cancel();
        }
        !live
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Consumer side of the merged stream. Dropping it early cancels producers.
pub struct AggregatedStream {
    rx: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    done: bool,
}

impl AggregatedStream {
    /// An already-terminated stream.
    pub fn empty() -> Self {
        let (_, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            cancel: CancellationToken::new(),
            done: true,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Stream for AggregatedStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Message::Event(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(Message::Done)) | Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AggregatedStream {
    fn drop(&mut self) {
        if !self.done {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests;
