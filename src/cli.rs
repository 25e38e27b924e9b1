//! CLI definitions for ScriptFlow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ScriptFlow CLI.
#[derive(Parser)]
#[command(name = "scriptflow")]
#[command(about = "Browser automation scripting engine")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SCRIPTFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Play a script back and print its outputs
    Run {
        /// Script spec (JSON)
        script: PathBuf,

        /// JSON object of input values
        #[arg(long)]
        inputs: Option<PathBuf>,

        /// Context to start in instead of the default one
        #[arg(long)]
        context: Option<String>,

        /// Execute a single action, then pause
        #[arg(long)]
        step: bool,
    },

    /// Load a script and report unresolved types
    Validate {
        /// Script spec (JSON)
        script: PathBuf,
    },

    /// List the registered action and pipe types
    Types,
}
