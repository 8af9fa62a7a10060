//! Simone - project-aware prompt resolver
//!
//! CLI entry point for rendering and inspecting prompts.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use serde_json::json;
use tracing::{debug, info};

use simone::cli::{Cli, Command, OutputFormat, arguments_context, get_log_path};
use simone::config::Config;
use simone::resolver::PromptResolver;
use simone::templates::TemplateContext;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging is not initialised yet, so nothing here can trace
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let project = project_path(cli.project)?;
    info!(?project, metadata_dir = %config.metadata_dir, "Simone loaded config");

    let resolver = PromptResolver::from_config(&config, &project);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Render { name, args, format } => {
            debug!(%name, ?format, "main: matched Render command");
            cmd_render(&resolver, &name, arguments_context(args), format).await
        }
        Command::List { format } => {
            debug!(?format, "main: matched List command");
            cmd_list(&resolver, format).await
        }
        Command::Contexts => {
            debug!("main: matched Contexts command");
            cmd_contexts(&resolver)
        }
        Command::Feature { path } => {
            debug!(%path, "main: matched Feature command");
            cmd_feature(&resolver, &path)
        }
    }
}

/// The project root is mandatory; relative paths are made absolute
fn project_path(project: Option<PathBuf>) -> Result<PathBuf> {
    let project = project.ok_or_else(|| eyre!("PROJECT_PATH is required (set the env var or pass --project)"))?;
    if project.is_absolute() {
        return Ok(project);
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(project))
}

async fn cmd_render(resolver: &PromptResolver, name: &str, args: TemplateContext, format: OutputFormat) -> Result<()> {
    debug!(%name, arg_count = args.len(), ?format, "cmd_render: called");
    let messages = resolver
        .resolve(name, Some(&args))
        .await
        .context(format!("Failed to resolve prompt '{}'", name))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&messages)?),
        OutputFormat::Text => {
            for message in &messages {
                println!("{}", message.text());
            }
        }
    }
    Ok(())
}

async fn cmd_list(resolver: &PromptResolver, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_list: called");
    let prompts = resolver.list_available_prompts().await;

    match format {
        OutputFormat::Json => {
            let listing: Vec<_> = prompts
                .iter()
                .map(|prompt| {
                    json!({
                        "name": prompt.name,
                        "description": prompt.description,
                        "arguments": prompt.arguments,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            if prompts.is_empty() {
                println!("No prompts found");
                return Ok(());
            }
            for prompt in &prompts {
                println!("{:<24} {}", prompt.name.bold(), prompt.description);
                for argument in &prompt.arguments {
                    let marker = if argument.required { "*" } else { " " };
                    println!("    {}{:<20} {}", marker, argument.name, argument.description.dimmed());
                }
            }
        }
    }
    Ok(())
}

fn cmd_contexts(resolver: &PromptResolver) -> Result<()> {
    debug!("cmd_contexts: called");
    let contexts = resolver.config().get_resolved_contexts();
    print!("{}", serde_yaml::to_string(&contexts).context("Failed to serialize contexts")?);
    Ok(())
}

fn cmd_feature(resolver: &PromptResolver, path: &str) -> Result<()> {
    debug!(%path, "cmd_feature: called");
    println!("{}", resolver.config().is_feature_enabled(path));
    Ok(())
}
