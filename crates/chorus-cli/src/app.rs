//! Interactive session loop.
//!
//! Each prompt becomes a user node on the active branch. Every selected
//! model answers it concurrently, each reply lands as a sibling child of
//! that user node, and the first reply's branch stays active.

use std::future::Future;
use std::io::{IsTerminal, Write};

use chorus_ai::{
    builtin_models, chat_history, ChatMessage, ChatRequest, ChorusCore, ModelReply, ModelSelection,
    ReplyCollector, TokenTracker,
};
use chorus_common::ChorusError;
use chorus_config::ChorusConfig;
use chorus_conversation::{
    ConversationStore, ConversationTree, Direction, MemoryStore, NewMessage, Role,
};
use colored::*;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::Args;
use crate::commands::{self, Command, HELP};
use crate::extensions;
use crate::render::{Transcript, TITLE};

const OFFLINE_MODEL: &str = "@local/echo";
const ONLINE_MODEL: &str = "@openai/gpt4o";

/// Register built-in models and shipped extensions, narrowed by config.
pub fn build_core(config: &ChorusConfig) -> ChorusCore {
    let enabled = &config.models.enabled;
    let models = builtin_models()
        .into_iter()
        .filter(|m| enabled.is_empty() || enabled.contains(&m.metadata().id));

    let mut builder = ChorusCore::builder()
        .models(models)
        .env(config.resolved_env())
        .max_iterations(config.agent.max_iterations)
        .system_prompt(config.agent.system_prompt.clone());

    let enabled = &config.extensions.enabled;
    for extension in extensions::shipped() {
        if enabled.is_empty() || enabled.contains(&extension.id) {
            builder = builder.extension(extension);
        }
    }
    builder.build()
}

/// Model selections for every turn: `--model` flags, else the configured
/// defaults, else a single model chosen by whether an API key is present.
pub fn build_selections(config: &ChorusConfig, args: &Args, core: &ChorusCore) -> Vec<ModelSelection> {
    let ids: Vec<String> = if !args.models.is_empty() {
        args.models.clone()
    } else if !config.models.default.is_empty() {
        config.models.default.clone()
    } else if core.env("MODEL_OPENAI_API_KEY").is_some_and(|k| !k.is_empty())
        && core.model(ONLINE_MODEL).is_some()
    {
        vec![ONLINE_MODEL.to_string()]
    } else {
        vec![OFFLINE_MODEL.to_string()]
    };

    ids.into_iter()
        .map(|id| {
            let params = config.models.params.get(&id).cloned().unwrap_or(Value::Null);
            let mut selection = ModelSelection::new(id).with_params(params);
            if !args.no_tools {
                for extension in core.extensions().extensions() {
                    let params = config
                        .extensions
                        .params
                        .get(&extension.id)
                        .cloned()
                        .unwrap_or(Value::Null);
                    selection = selection.with_extension(extension.id.clone(), params);
                }
            }
            selection
        })
        .collect()
}

pub struct App {
    core: ChorusCore,
    selections: Vec<ModelSelection>,
    tree: ConversationTree,
    store: MemoryStore,
    tracker: TokenTracker,
    live: bool,
}

impl App {
    pub fn new(config: &ChorusConfig, args: &Args) -> Self {
        let core = build_core(config);
        let selections = build_selections(config, args, &core);
        Self {
            core,
            selections,
            tree: ConversationTree::new(),
            store: MemoryStore::new(),
            tracker: TokenTracker::new(),
            live: std::io::stdout().is_terminal(),
        }
    }

    pub fn tree(&self) -> &ConversationTree {
        &self.tree
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Read prompts from stdin until `/quit`, EOF or Ctrl-C.
    pub async fn run(&mut self) -> Result<(), ChorusError> {
        let ids: Vec<&str> = self.selections.iter().map(|s| s.model_id.as_str()).collect();
        println!("chorus: querying {}. Type /help for commands.", ids.join(", "));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("prompt > ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else { break };
            let Some(command) = commands::parse(&line) else { continue };
            if !self.handle(command).await? {
                break;
            }
        }
        info!(total_tokens = self.tracker.total_tokens(), "session closed");
        Ok(())
    }

    /// Execute one command. Returns `false` when the loop should stop.
    pub async fn handle(&mut self, command: Command) -> Result<bool, ChorusError> {
        match command {
            Command::Quit => return Ok(false),
            Command::Help => println!("{HELP}"),
            Command::Models => self.print_models(),
            Command::History => self.print_history(),
            Command::Branch(direction) => {
                self.switch_reply(direction);
            }
            Command::Unknown(input) => println!("unknown command: {input}\n{HELP}"),
            Command::Prompt(prompt) => {
                self.ask(&prompt).await?;
            }
        }
        Ok(true)
    }

    /// Run one turn, aborting on Ctrl-C.
    pub async fn ask(&mut self, prompt: &str) -> Result<Vec<ModelReply>, ChorusError> {
        self.ask_with(prompt, tokio::signal::ctrl_c).await
    }

    /// Run one turn and record it in the tree.
    ///
    /// The first `interrupt` aborts the session and keeps draining what is
    /// already queued; a second one stops waiting. The prompt is only added
    /// to the tree when at least one model replied.
    async fn ask_with<F, Fut>(
        &mut self,
        prompt: &str,
        mut interrupt: F,
    ) -> Result<Vec<ModelReply>, ChorusError>
    where
        F: FnMut() -> Fut,
        Fut: Future,
    {
        let parent = self.tree.active_tail();
        let mut history =
            chat_history(self.tree.nodes().iter().filter_map(|n| n.message.as_ref()));
        history.push(ChatMessage::user(prompt));

        let session = self.core.chat(ChatRequest {
            models: self.selections.clone(),
            messages: history,
        });
        if session.runners().is_empty() {
            warn!("no selected model can run");
            println!(
                "{}",
                "no selected model can run, check /models and model params".red()
            );
            return Ok(Vec::new());
        }

        let mut stream = session.stream().map_err(|e| ChorusError::Ai(e.to_string()))?;
        let mut transcript = Transcript::new();
        let mut collector = ReplyCollector::new();
        let mut aborted = false;
        loop {
            let event = tokio::select! {
                event = stream.next() => event,
                _ = interrupt() => {
                    if aborted {
                        warn!("stopped waiting for cancelled models");
                        break;
                    }
                    aborted = true;
                    session.abort("cancelled by user");
                    continue;
                }
            };
            let Some(event) = event else { break };
            transcript.observe(&event);
            collector.observe(&event);
            self.tracker.observe(&event);
            if self.live {
                print!("\x1b[2J\x1b[H{TITLE}\n\n{}", transcript.render());
                std::io::stdout().flush()?;
            }
        }
        drop(stream);

        if !self.live {
            print!("{TITLE}\n\n{}", transcript.render());
        }
        if aborted {
            println!("{}", "(cancelled)".dimmed());
        }
        println!(
            "{}",
            format!("session tokens: {}", self.tracker.total_tokens()).dimmed()
        );

        let replies = collector.into_replies();
        if replies.is_empty() {
            debug!("no model replied, prompt not recorded");
            return Ok(replies);
        }
        let user = self.tree.add_message(NewMessage::user(prompt), parent.as_deref());
        self.record_replies(&user.id, &replies);
        self.store
            .save(self.tree.data())
            .await
            .map_err(|e| ChorusError::Conversation(e.to_string()))?;
        Ok(replies)
    }

    fn record_replies(&mut self, user_id: &str, replies: &[ModelReply]) {
        let mut last = None;
        for reply in replies {
            let node = self.tree.add_message(reply.to_message(), Some(user_id));
            last = Some(node.id);
        }
        // The newest reply's branch is active after appending; walk back
        // to the first.
        let Some(mut current) = last else { return };
        while let Some(previous) = self.tree.change_branch(Direction::Previous, &current) {
            current = previous;
        }
        debug!(replies = replies.len(), active = %current, "turn recorded");
    }

    fn print_models(&self) {
        for model in self.core.registered_models() {
            let selected = self.selections.iter().any(|s| s.model_id == model.id);
            let marker = if selected { "*" } else { " " };
            println!("{marker} {:<24} {}", model.id, model.description);
        }
    }

    fn print_history(&self) {
        for node in self.tree.nodes() {
            let Some(message) = &node.message else { continue };
            let siblings = self.tree.get_siblings(&node.id);
            let position = if siblings.len() > 1 {
                format!(" ({}/{})", self.tree.sibling_index(&node.id) + 1, siblings.len())
            } else {
                String::new()
            };
            let who = match message.role {
                Role::User => "user".to_string(),
                Role::System => "system".to_string(),
                Role::Assistant => message.model.clone(),
            };
            println!("{}{position}\n{}\n", format!("[{who}]").bold(), message.content);
        }
    }

    /// Move between sibling replies of the latest prompt.
    pub fn switch_reply(&mut self, direction: Direction) -> Option<String> {
        let tail = self.tree.active_tail()?;
        let Some(selected) = self.tree.change_branch(direction, &tail) else {
            println!("{}", "no other reply in that direction".dimmed());
            return None;
        };
        if let Some(message) = self.tree.node(&selected).and_then(|n| n.message.as_ref()) {
            let index = self.tree.sibling_index(&selected) + 1;
            let total = self.tree.get_siblings(&selected).len();
            println!("[{}] ({index}/{total})\n{}", message.model, message.content);
        }
        Some(selected)
    }
}
