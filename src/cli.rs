//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the backrooms relay.

use clap::{Parser, Subcommand};

/// backrooms - AI persona conversation relay
///
/// Serves a WebSocket endpoint where a rotation of AI personas take turns
/// talking to each other, bounded by a shared daily call budget.
#[derive(Parser, Debug)]
#[command(name = "backrooms")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the WebSocket relay until interrupted
    Serve {
        /// Path to configuration file
        #[arg(short, long, env = "BACKROOMS_CONFIG")]
        config: Option<String>,

        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the daily call limit
        #[arg(long)]
        daily_limit: Option<u32>,
    },

    /// Show today's call count against the daily limit
    Usage {
        /// Path to configuration file
        #[arg(short, long, env = "BACKROOMS_CONFIG")]
        config: Option<String>,
    },

    /// List the persona rotation in speaking order
    Personas {
        /// Path to configuration file
        #[arg(short, long, env = "BACKROOMS_CONFIG")]
        config: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path for the new configuration file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}
