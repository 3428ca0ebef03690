//! CLI argument parsing and command routing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// chat-stream: stream chat completions from LLM providers
#[derive(Debug, Parser)]
#[command(name = "chat-stream")]
#[command(about = "Stream chat completions from LLM providers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model to use (model name or profile name)
    #[arg(short, long, global = true, env = "CHAT_STREAM_MODEL")]
    pub model: Option<String>,

    /// Read the global config from this file
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Send a single prompt and stream the answer
    Query {
        /// The prompt to send
        query: String,
    },

    /// Inspect configuration
    Config {
        /// List all config values
        #[arg(long)]
        list: bool,
    },

    /// Inspect model profiles
    Models {
        /// List all models
        #[arg(long)]
        list: bool,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// Parse CLI arguments from environment
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_with_global_flags() {
        let cli = Cli::try_parse_from(["chat-stream", "query", "hello", "-v", "--model", "gpt-4o"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert!(matches!(cli.command, Some(Commands::Query { ref query }) if query == "hello"));
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["chat-stream"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_list() {
        let cli = Cli::try_parse_from(["chat-stream", "config", "--list"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { list: true })));
    }
}
