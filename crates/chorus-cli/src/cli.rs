use std::path::PathBuf;

use clap::Parser;

/// Chorus: stream one prompt to several chat models at once.
#[derive(Parser, Debug)]
#[command(name = "chorus", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Model id to query; repeat for several models.
    #[arg(short, long = "model", value_name = "ID")]
    pub models: Vec<String>,

    /// Do not attach any extensions.
    #[arg(long)]
    pub no_tools: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_models_are_collected() {
        let args = Args::try_parse_from([
            "chorus",
            "--model",
            "@local/echo",
            "-m",
            "@openai/gpt4o",
            "--no-tools",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.models, vec!["@local/echo", "@openai/gpt4o"]);
        assert!(args.no_tools);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }
}
