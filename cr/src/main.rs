use clap::Parser;
use eyre::{Context, Result};
use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use chatrag::cli::{Cli, Command};
use chatrag::config::{Config, LogConfig};
use chatrag::{AppState, create_client};

/// Install the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise the app and dependency levels from
/// the config apply. Output goes to stdout and/or an append-mode log file.
fn setup_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.directives()));

    let stdout_layer = log.stdout.then(|| fmt::layer().compact());

    let file_layer = if log.to_file {
        if let Some(parent) = log.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.file_path)
            .context(format!("Failed to open log file {}", log.file_path.display()))?;
        Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(
        level = %log.level,
        deps_level = %log.deps_level,
        "Logging initialized"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up OPENROUTER_API_KEY, CHROMADB_API_KEY and LOG_* from .env
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env();
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    match cli.command.unwrap_or_default() {
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
            let key_state = if config.llm.get_api_key().is_ok() { "set" } else { "missing" };
            println!("# {}: {}", config.llm.api_key_env, key_state);
            Ok(())
        }
        Command::Serve {
            host,
            port,
            prompts_dir,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = prompts_dir {
                config.prompts.dir = dir;
            }

            setup_logging(&config.log).context("Failed to setup logging")?;
            config.validate()?;

            info!(
                model = %config.llm.model,
                prompts = %config.prompts.dir.display(),
                rag_config = %config.rag.config_path.display(),
                "ChatRag starting"
            );

            let llm = create_client(&config.llm).context("Failed to create LLM client")?;
            let state = AppState::from_config(&config, llm).context("Failed to initialize application state")?;

            chatrag::serve(&config.server.address(), Arc::new(state)).await
        }
    }
}
