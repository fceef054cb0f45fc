//! Conversation sessions.
//!
//! A session is one fan-out of a prompt to every selected model. It owns
//! the runners and the aggregator; [`ConversationSession::stream`] starts
//! every runner and hands back the merged event stream, and
//! [`ConversationSession::abort`] cancels it from any task.

mod request;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregator::{AggregatedStream, Producer, StreamAggregator};
use crate::error::AiError;
use crate::runner::ModelRunner;
use crate::ChatMessage;

pub use request::{CapabilitySelection, ChatRequest, ModelSelection};

pub struct ConversationSession {
    id: String,
    runners: Vec<Arc<ModelRunner>>,
    messages: Arc<Vec<ChatMessage>>,
    aggregator: StreamAggregator,
    streamed: AtomicBool,
}

impl ConversationSession {
    pub fn new(runners: Vec<ModelRunner>, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: chorus_common::new_correlation_id(),
            runners: runners.into_iter().map(Arc::new).collect(),
            messages: Arc::new(messages),
            aggregator: StreamAggregator::new(),
            streamed: AtomicBool::new(false),
        }
    }

    /// Short id used to correlate this session's log lines.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn runners(&self) -> &[Arc<ModelRunner>] {
        &self.runners
    }

    pub fn model_ids(&self) -> Vec<&str> {
        self.runners.iter().map(|r| r.model_id()).collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Start every runner and return the merged stream.
    ///
    /// A session streams once; later calls fail with
    /// [`AiError::AlreadyStreamed`].
    pub fn stream(&self) -> Result<AggregatedStream, AiError> {
        if self.streamed.swap(true, Ordering::SeqCst) {
            return Err(AiError::AlreadyStreamed);
        }
        info!(
            session = %self.id,
            models = ?self.model_ids(),
            "starting session stream"
        );
        let cancel = self.aggregator.cancellation();
        let producers: Vec<Arc<dyn Producer>> = self
            .runners
            .iter()
            .map(|runner| {
                Arc::new(runner.start_task(Arc::clone(&self.messages), cancel.clone()))
                    as Arc<dyn Producer>
            })
            .collect();
        Ok(self.aggregator.run(producers))
    }

    /// Cancel the live stream. Returns `true` if there was nothing to cancel.
    pub fn abort(&self, reason: &str) -> bool {
        let idle = self.aggregator.abort(reason);
        if idle {
            debug!(session = %self.id, reason, "abort ignored, no live stream");
        }
        idle
    }
}
