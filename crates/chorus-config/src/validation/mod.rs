//! Full configuration validation.
//!
//! Each check pushes a message into a shared list; the orchestrator joins
//! them into a single `ConfigError`.

mod helpers;


use crate::schema::ChorusConfig;
use chorus_common::ConfigError;

use helpers::{validate_ids, validate_object_params, validate_range};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ChorusConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_range(
        &mut errors,
        "agent.max_iterations",
        config.agent.max_iterations,
        1,
        10,
    );

    validate_ids(&mut errors, "models.enabled", &config.models.enabled);
    validate_ids(&mut errors, "models.default", &config.models.default);
    validate_ids(&mut errors, "extensions.enabled", &config.extensions.enabled);

    if !config.models.enabled.is_empty() {
        for id in &config.models.default {
            if !config.models.enabled.contains(id) {
                errors.push(format!(
                    "models.default contains '{id}' which is not in models.enabled"
                ));
            }
        }
    }

    validate_object_params(&mut errors, "models.params", &config.models.params);
    validate_object_params(&mut errors, "extensions.params", &config.extensions.params);

    for key in config.env.keys() {
        if key.trim().is_empty() || key.contains('=') {
            errors.push(format!("env key '{key}' is not a valid variable name"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
