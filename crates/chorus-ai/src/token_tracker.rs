//! Token usage tracking across sessions and models.

use std::collections::BTreeMap;

use crate::events::{StreamEvent, StreamEventKind};
use crate::TokenUsage;

/// Tracks cumulative token usage per model id.
#[derive(Debug, Clone, Default)]
pub struct TokenTracker {
    /// Total usage across all models.
    total: TokenUsage,
    /// Usage broken down by model id.
    by_model: BTreeMap<String, TokenUsage>,
    /// Number of usage reports recorded.
    report_count: u64,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one usage report for `model_id`.
    pub fn record(&mut self, model_id: &str, usage: &TokenUsage) {
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        self.report_count += 1;

        let entry = self.by_model.entry(model_id.to_string()).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
    }

    /// Record a `usage_metadata` event; other events are ignored.
    pub fn observe(&mut self, event: &StreamEvent) {
        if let StreamEventKind::UsageMetadata {
            input_tokens,
            output_tokens,
        } = event.kind
        {
            self.record(
                &event.model_id,
                &TokenUsage {
                    input_tokens,
                    output_tokens,
                },
            );
        }
    }

    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    pub fn for_model(&self, model_id: &str) -> Option<&TokenUsage> {
        self.by_model.get(model_id)
    }

    /// Per-model usage, ordered by model id.
    pub fn models(&self) -> impl Iterator<Item = (&str, &TokenUsage)> {
        self.by_model.iter().map(|(id, usage)| (id.as_str(), usage))
    }

    pub fn total_tokens(&self) -> u64 {
        self.total.total_tokens()
    }

    pub fn report_count(&self) -> u64 {
        self.report_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_event(model_id: &str, input_tokens: u64, output_tokens: u64) -> StreamEvent {
        StreamEvent {
            model_index: 0,
            model_id: model_id.into(),
            kind: StreamEventKind::UsageMetadata {
                input_tokens,
                output_tokens,
            },
        }
    }

    #[test]
    fn accumulates_per_model_and_total() {
        let mut tracker = TokenTracker::new();
        tracker.observe(&usage_event("@openai/gpt4", 10, 5));
        tracker.observe(&usage_event("@local/echo", 2, 2));
        tracker.observe(&usage_event("@openai/gpt4", 1, 1));
        tracker.observe(&StreamEvent {
            model_index: 0,
            model_id: "@local/echo".into(),
            kind: StreamEventKind::content("ignored"),
        });

        assert_eq!(tracker.total_tokens(), 21);
        assert_eq!(tracker.report_count(), 3);
        assert_eq!(
            tracker.for_model("@openai/gpt4"),
            Some(&TokenUsage {
                input_tokens: 11,
                output_tokens: 6
            })
        );
        let ids: Vec<&str> = tracker.models().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["@local/echo", "@openai/gpt4"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = TokenTracker::new();
        tracker.observe(&usage_event("m", 1, 1));
        tracker.reset();
        assert_eq!(tracker.total_tokens(), 0);
        assert!(tracker.for_model("m").is_none());
        assert_eq!(tracker.report_count(), 0);
    }
}
