//! Command-line arguments

use clap::{Parser, Subcommand};

use super::DEFAULT_CONFIG_PATH;

#[derive(Debug, Parser)]
#[command(name = "trelay", version, about = "Link lifecycle and redirection engine")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print a sample configuration with every default filled in
    Generate,
}
