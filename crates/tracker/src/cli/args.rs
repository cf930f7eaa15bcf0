//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(version)]
#[command(about = "Read and write your Tracker dashboard data", long_about = None)]
pub struct Cli {
    /// Override the server URL from the config file
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the value stored under a key
    Get {
        /// Key to read (e.g. "daily_routine")
        key: String,
    },

    /// Replace the value stored under a key
    Set {
        /// Key to write
        key: String,

        /// New value as JSON. Text that is not valid JSON is stored as a string
        value: String,
    },

    /// List every stored key
    #[command(alias = "ls")]
    List,

    /// Print a key's value every time it changes
    Watch {
        /// Key to watch
        key: String,
    },

    /// AI assistant tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },

    /// Show or modify configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ToolsCommands {
    /// List the available tools
    List,

    /// Run a tool
    Call {
        /// Tool name (e.g. "getUserData")
        name: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Set the server URL
    SetServer {
        /// Server URL (e.g. "http://localhost:3030")
        url: String,
    },

    /// Set the local cache directory
    SetCacheDir {
        /// Directory for cached values
        path: PathBuf,
    },
}
