//! Reading `config.toml` into a [`ChorusConfig`].

use std::path::Path;

use chorus_common::ConfigError;
use tracing::{info, warn};

use super::paths::{default_config_path, write_default_config};
use crate::schema::ChorusConfig;
use crate::validation;

/// Parse the config at `path`. Absent keys take their serde defaults.
///
/// Validation problems are logged, not returned; callers that need a
/// valid config run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<ChorusConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!("{}: {e}", path.display())));
        }
    };

    let config: ChorusConfig = toml::from_str(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "{e}");
    }
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load `<platform config dir>/chorus/config.toml`, seeding it with the
/// commented template on first run.
pub fn load_default() -> Result<ChorusConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            write_default_config(&path)?;
            Ok(ChorusConfig::default())
        }
        other => other,
    }
}
