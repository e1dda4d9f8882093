//! CLI module for Agora
//!
//! Command-line parsing for the agora-server binary, using clap for argument
//! parsing and owo-colors for terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agora - real-time multi-agent collaboration server
///
/// Hosts turn-taking meetings between expert AI roles, broadcasts them live
/// over WebSocket and tracks how far the participants agree.
#[derive(Parser, Debug)]
#[command(
    name = "agora-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Agora - real-time multi-agent collaboration server",
    long_about = "Hosts turn-taking meetings between expert AI roles, with live WebSocket\n\
                  broadcast, a REST face and running consensus tracking.\n\n\
                  Run without arguments to start the server, or use 'init' to write a starter config.",
    after_help = "EXAMPLES:\n    \
                  agora-server init              # Write a starter agora.toml\n    \
                  agora-server                   # Start the server (reads agora.toml if present)\n    \
                  agora-server --watch           # Start and hot-reload agora.toml\n    \
                  agora-server agents            # List the participant catalog\n    \
                  agora-server --config my.toml  # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "agora.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Reload the configuration file when it changes
    #[arg(long, global = true)]
    pub watch: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,

    /// Write a starter agora.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (none, ollama or openai)
        #[arg(long, default_value = "none")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3001")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List the participant catalog
    Agents,

    /// List the preset meeting scenarios
    Scenarios,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
