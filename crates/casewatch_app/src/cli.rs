use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILENAME;

/// Watch fraud-analysis jobs converge on their cases.
#[derive(Parser, Debug)]
#[command(name = "casewatch")]
#[command(version)]
pub struct Cli {
    /// Path to the RON config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Backend base url, overrides the config file
    #[arg(long)]
    pub base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "CASEWATCH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll one case until it settles
    Watch { case_id: String },
    /// List cases and poll every non-terminal one
    Dashboard,
    /// Trigger a new analysis job for a case
    Analyze {
        case_id: String,
        /// Keep polling the case after triggering
        #[arg(long)]
        watch: bool,
    },
}
