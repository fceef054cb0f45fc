//! Per-producer agent loop settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Provider rounds per model when tools keep being requested
    /// (valid range: 1-10).
    pub max_iterations: u32,
    /// Prepended to every request when set.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            system_prompt: None,
        }
    }
}
