use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use promptstore::cli::{Cli, Command};
use promptstore::config::Config;
use promptstore::{PromptCatalog, PromptInput, PromptStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

/// Resolve the body from --content, --file or stdin
fn read_body(content: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path).context(format!("Failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read prompt body from stdin")?;
    Ok(buf)
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let prompts_dir = cli.dir.unwrap_or(config.prompts_dir);

    info!("promptstore using {}", prompts_dir.display());
    let catalog = PromptCatalog::new(Arc::new(PromptStore::new(&prompts_dir)));

    match cli.command {
        Command::List { json } => {
            let prompts = catalog.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&prompts)?);
            } else if prompts.is_empty() {
                println!("No prompts found in {}", prompts_dir.display());
            } else {
                for prompt in prompts {
                    let marker = if promptstore::is_protected(&prompt.id) { "*" } else { " " };
                    println!(
                        "{}{:<24} {} {}",
                        marker.yellow(),
                        prompt.id.cyan(),
                        prompt.title,
                        prompt.description.dimmed()
                    );
                }
            }
        }
        Command::Show { id, json } => {
            let prompt = catalog.get(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prompt)?);
            } else {
                println!("{}", prompt.title.bold());
                if !prompt.description.is_empty() {
                    println!("{}", prompt.description.dimmed());
                }
                println!();
                println!("{}", prompt.content);
            }
        }
        Command::Create {
            id,
            title,
            description,
            content,
            file,
        } => {
            let body = read_body(content, file)?;
            let prompt = catalog.create(&id, &PromptInput::new(title, description, body))?;
            println!("{} Created prompt: {}", "✓".green(), prompt.id.cyan());
        }
        Command::Update {
            id,
            title,
            description,
            content,
            file,
        } => {
            let current = catalog.get(&id)?;
            let body = match (content, file) {
                (None, None) => current.content,
                (content, file) => read_body(content, file)?,
            };
            let input = PromptInput::new(
                title.unwrap_or(current.title),
                description.unwrap_or(current.description),
                body,
            );
            let prompt = catalog.update(&id, &input)?;
            println!("{} Updated prompt: {}", "✓".green(), prompt.id.cyan());
        }
        Command::Delete { id } => {
            catalog.delete(&id)?;
            println!("{} Deleted prompt: {}", "✓".green(), id);
        }
    }

    Ok(())
}
