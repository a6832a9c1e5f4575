//! CLI argument parsing for promptstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ps")]
#[command(author, version, about = "Manage markdown prompt templates", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Prompts directory (overrides config)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all prompts
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a prompt
    Show {
        /// Prompt ID
        #[arg(required = true)]
        id: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create a new prompt
    Create {
        /// Prompt ID (lowercase slug)
        #[arg(required = true)]
        id: String,

        /// Prompt title
        #[arg(short, long)]
        title: String,

        /// Short description
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Prompt body; read from --file or stdin when omitted
        #[arg(short = 'b', long)]
        content: Option<String>,

        /// Read the prompt body from a file
        #[arg(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Replace an existing prompt
    Update {
        /// Prompt ID
        #[arg(required = true)]
        id: String,

        /// New title (keeps the current one when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// New description (keeps the current one when omitted)
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// New body (keeps the current one when omitted)
        #[arg(short = 'b', long)]
        content: Option<String>,

        /// Read the new body from a file
        #[arg(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Delete a prompt
    Delete {
        /// Prompt ID
        #[arg(required = true)]
        id: String,
    },
}
