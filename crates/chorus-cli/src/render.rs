//! Live multi-model transcript.

use std::collections::BTreeMap;

use chorus_ai::{StreamEvent, StreamEventKind, TokenUsage};
use colored::*;

pub const TITLE: &str = "[CHORUS STREAMING MULTI MODELS]";

#[derive(Debug, Default)]
struct ToolState {
    name: String,
    done: bool,
}

#[derive(Debug, Default)]
struct Entry {
    model_id: String,
    content: String,
    tools: Vec<ToolState>,
    usage: Option<TokenUsage>,
    error: Option<String>,
}

/// Per-model view of a session's events, redrawn on every event.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: BTreeMap<usize, Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &StreamEvent) {
        let entry = self.entries.entry(event.model_index).or_insert_with(|| Entry {
            model_id: event.model_id.clone(),
            ..Entry::default()
        });
        match &event.kind {
            StreamEventKind::Content { content } => entry.content.push_str(content),
            StreamEventKind::UsageMetadata {
                input_tokens,
                output_tokens,
            } => {
                let usage = entry.usage.get_or_insert_with(TokenUsage::default);
                usage.input_tokens += input_tokens;
                usage.output_tokens += output_tokens;
            }
            StreamEventKind::ToolStart { name, .. } => entry.tools.push(ToolState {
                name: name.clone(),
                done: false,
            }),
            StreamEventKind::ToolEnd { name, .. } => {
                if let Some(tool) = entry.tools.iter_mut().find(|t| &t.name == name && !t.done) {
                    tool.done = true;
                }
            }
            StreamEventKind::Error { message, .. } => entry.error = Some(message.clone()),
        }
    }

    pub fn render(&self) -> String {
        const PALETTE: [&str; 5] = ["green", "yellow", "magenta", "cyan", "red"];

        let mut out = String::new();
        for (position, (index, entry)) in self.entries.iter().enumerate() {
            let color = PALETTE[position % PALETTE.len()];
            let mut header = format!("[{index}.{}]", entry.model_id).color(color).to_string();
            if !entry.tools.is_empty() {
                let tools: Vec<String> = entry
                    .tools
                    .iter()
                    .map(|t| format!("[{}] {}", if t.done { "v" } else { "*" }, t.name))
                    .collect();
                header.push(' ');
                header.push_str(&format!("[tools: {}]", tools.join(" ")).blue().to_string());
            }
            out.push_str(&header);
            out.push('\n');
            if !entry.content.is_empty() {
                out.push_str(&entry.content.color(color).to_string());
                out.push('\n');
            }
            if let Some(error) = &entry.error {
                out.push_str(&format!("error: {error}").red().to_string());
                out.push('\n');
            }
            if let Some(usage) = &entry.usage {
                let line = format!(
                    "tokens: {} in / {} out",
                    usage.input_tokens, usage.output_tokens
                );
                out.push_str(&line.dimmed().to_string());
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}
