//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for kestrel
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(author, version, about = "Agent runtime with tools, delegation and context compaction")]
#[command(long_about = r#"
kestrel runs an agent loop: the model answers or requests tools, tools run
behind permission rules and hooks, and self-contained work can be delegated
to nested agents, inline or in the background.

Configuration files are loaded from (in priority order):
1. KESTREL_* environment variables (e.g. KESTREL_AGENT__MODEL)
2. --config <path>     Explicit config file
3. ./kestrel.toml or ./.kestrel.toml   Project-level config
4. ~/.config/kestrel/config.toml       Global config

Example:
  kestrel run --replay session.json "Summarize the open issues"
  kestrel tools --plugin-dir ./tools
  kestrel config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent on one input and stream its events
    Run {
        /// The request for the agent
        input: String,

        /// Serve model turns from a JSON replay script
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,

        /// Record every run event as JSON lines
        #[arg(long, value_name = "FILE")]
        log_events: Option<PathBuf>,

        /// Extra plugin directory (can be specified multiple times)
        #[arg(long, value_name = "DIR")]
        plugin_dir: Vec<PathBuf>,

        /// Override the configured model
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Print the run result as JSON instead of streaming text
        #[arg(long)]
        json: bool,
    },

    /// Discover, validate and list the available tools
    Tools {
        /// Extra plugin directory (can be specified multiple times)
        #[arg(long, value_name = "DIR")]
        plugin_dir: Vec<PathBuf>,
    },

    /// Show configuration sources and validation issues
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "kestrel",
            "-vv",
            "run",
            "hello",
            "--replay",
            "turns.json",
            "--plugin-dir",
            "a",
            "--plugin-dir",
            "b",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                input,
                replay,
                plugin_dir,
                log_events,
                ..
            } => {
                assert_eq!(input, "hello");
                assert_eq!(replay, PathBuf::from("turns.json"));
                assert_eq!(plugin_dir.len(), 2);
                assert!(log_events.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kestrel", "config", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_run_requires_replay() {
        assert!(Cli::try_parse_from(["kestrel", "run", "hi"]).is_err());
    }
}
