//! Model and extension selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which models are registered and which ones a prompt fans out to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelsConfig {
    /// Registered model ids. Empty registers every built-in model.
    pub enabled: Vec<String>,
    /// Models selected for each prompt. Empty selects every enabled model.
    pub default: Vec<String>,
    /// Invocation parameters per model id.
    pub params: BTreeMap<String, serde_json::Value>,
}

/// Tool extensions attached to every model selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub enabled: Vec<String>,
    /// Parameters per extension id.
    pub params: BTreeMap<String, serde_json::Value>,
}
