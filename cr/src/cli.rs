//! CLI argument parsing for chatrag

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatrag")]
#[command(author, version, about = "Chat proxy with prompt templates and vector database settings", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level for chatrag itself (overrides config and LOG_LEVEL_APP)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Prompts directory (overrides config)
        #[arg(long)]
        prompts_dir: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config,
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve {
            host: None,
            port: None,
            prompts_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["chatrag"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Command::default());
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["chatrag", "serve", "--host", "0.0.0.0", "-p", "8080", "-l", "trace"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("trace"));
        assert_eq!(
            cli.command,
            Some(Command::Serve {
                host: Some("0.0.0.0".to_string()),
                port: Some(8080),
                prompts_dir: None,
            })
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["chatrag", "serve", "--port", "99999"]).is_err());
    }
}
