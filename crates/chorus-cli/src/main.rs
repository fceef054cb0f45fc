//! chorus: terminal client for concurrent multi-model chat.
//!
//! Loads the TOML config, registers the built-in models and shipped
//! extensions, then streams every prompt to all selected models at once.

mod app;
mod cli;
mod commands;
mod extensions;
mod render;

use chorus_common::ChorusError;
use chorus_config::ChorusConfig;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::Args;

fn load_config(args: &Args) -> Result<ChorusConfig, ChorusError> {
    let config = match &args.config {
        Some(path) => {
            let config = chorus_config::load_from_path(path)?;
            chorus_config::validation::validate(&config)?;
            config
        }
        None => chorus_config::load_config()?,
    };
    Ok(config)
}

fn init_logging(args: &Args, config: &ChorusConfig) {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.as_str().to_string());
    let directive = format!("chorus_cli={level},chorus_ai={level},chorus_conversation={level}");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .init();
}

async fn run() -> Result<(), ChorusError> {
    let args = cli::parse();
    let config = load_config(&args)?;
    init_logging(&args, &config);

    tracing::info!(
        models = config.models.enabled.len(),
        extensions = config.extensions.enabled.len(),
        "chorus starting"
    );

    let mut app = App::new(&config, &args);
    app.run().await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "chorus exited with an error");
        eprintln!("chorus: {e}");
        std::process::exit(1);
    }
}
