//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Chorus Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[models]
# Registered models; empty registers every built-in model.
# enabled = ["@openai/gpt4o", "@openai/gpt3.5-turbo", "@local/echo"]
# Models each prompt fans out to; empty selects every enabled model.
# default = ["@openai/gpt4o", "@local/echo"]

[models.params]
# "@openai/gpt4o" = { temperature = 0.7, maxTokens = 512 }
# "@local/echo" = { delayMs = 30 }

[extensions]
# enabled = ["@official/uuid-generator", "@official/weather"]

[extensions.params]
# "@official/uuid-generator" = { version = "v7" }

[agent]
# max_iterations = 3     # 1-10 tool-call rounds per model
# system_prompt = "You are a helpful assistant."

[env]
# MODEL_OPENAI_API_KEY = "sk-..."
# MODEL_OPENAI_BASE_URL = "https://api.openai.com/v1"

[logging]
# level = "info"         # trace, debug, info, warn, error
"##
    .to_string()
}
