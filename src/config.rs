//! Configuration management for the editor host simulator.
//!
//! Handles:
//! - Command-line argument parsing
//! - Session script location

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

/// File name of the session script looked up in the user config directory
pub const DEFAULT_SCRIPT_NAME: &str = "session.toml";

/// Command-line arguments for the editor host simulator
#[derive(Debug, Parser)]
#[command(name = "editor-host-sim")]
#[command(about = "Drive a simulated custom editor host from a session script")]
#[command(version)]
pub struct Args {
    /// Session script to run
    #[arg(long, help = "TOML session script (defaults to the user config directory)")]
    pub script: Option<PathBuf>,

    /// View type used by open steps that do not name one
    #[arg(long, help = "Default view type for open steps (e.g., 'demo.hex')")]
    pub view_type: Option<String>,

    /// Log level for the simulator
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    /// Print the session report on a single line
    #[arg(long)]
    pub compact: bool,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Session script to run
    pub script: PathBuf,
    /// View type for open steps without one
    pub default_view_type: Option<String>,
    /// Log level
    pub log_level: String,
    /// Pretty-print the report
    pub pretty: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let script = match args.script {
            Some(script) => script,
            None => default_script_path().ok_or_else(|| {
                anyhow!("could not determine the user config directory, pass --script")
            })?,
        };

        Ok(Config {
            script,
            default_view_type: args.view_type,
            log_level: args.log_level,
            pretty: !args.compact,
        })
    }
}

/// `<config dir>/custom-editor-host/session.toml`
pub fn default_script_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("custom-editor-host").join(DEFAULT_SCRIPT_NAME))
}
