//! Where the config file lives, and seeding it with the template.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chorus_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "chorus";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/chorus/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented template to `path` unless a file is already there.
///
/// Returns `false` when an existing file was left untouched.
pub fn write_default_config(path: &Path) -> Result<bool, ConfigError> {
    let write_err = |e: std::io::Error| ConfigError::WriteError(format!("{}: {e}", path.display()));

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(write_err(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_err)?;

    info!(path = %path.display(), "wrote default config");
    Ok(true)
}
