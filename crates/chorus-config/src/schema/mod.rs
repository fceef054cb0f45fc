//! Configuration schema types for Chorus.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod agent;
mod models;
mod system;

pub use agent::*;
pub use models::*;
pub use system::*;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Prefix of process environment variables forwarded to model providers.
pub const PROVIDER_ENV_PREFIX: &str = "MODEL_";

/// Root configuration for Chorus.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChorusConfig {
    pub models: ModelsConfig,
    pub extensions: ExtensionsConfig,
    pub agent: AgentConfig,
    /// Provider environment, e.g. `MODEL_OPENAI_API_KEY`.
    pub env: BTreeMap<String, String>,
    pub logging: LoggingConfig,
}

impl ChorusConfig {
    /// The `[env]` table overlaid with `MODEL_*` variables from the process
    /// environment. Process values win.
    pub fn resolved_env(&self) -> HashMap<String, String> {
        self.resolved_env_from(std::env::vars())
    }

    pub fn resolved_env_from(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in vars {
            if key.starts_with(PROVIDER_ENV_PREFIX) && !value.is_empty() {
                env.insert(key, value);
            }
        }
        env
    }
}
