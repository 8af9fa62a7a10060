//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use crate::templates::TemplateContext;

/// Simone - project-aware prompt resolver
#[derive(Parser)]
#[command(
    name = "sp",
    about = "Resolve project-aware prompts from layered configuration and templates",
    version
)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long, global = true, env = "PROJECT_PATH", help = "Project root directory")]
    pub project: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a prompt and print the result
    Render {
        /// Prompt name
        name: String,

        /// Prompt argument as key=value (value parsed as JSON when possible)
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE", value_parser = parse_argument)]
        args: Vec<(String, Value)>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List available prompts
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show resolved project contexts
    Contexts,

    /// Check whether a feature is enabled in any context
    Feature {
        /// Dotted path, e.g. tooling.testing
        path: String,
    },
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse a `key=value` argument
///
/// The value is taken as JSON when it parses (`n=10`, `flag=true`,
/// `tags=["a","b"]`), otherwise as a plain string.
pub fn parse_argument(s: &str) -> Result<(String, Value), String> {
    debug!(%s, "parse_argument: called");
    let Some((key, raw)) = s.split_once('=') else {
        return Err(format!("Invalid argument '{}': expected KEY=VALUE", s));
    };
    if key.is_empty() {
        return Err(format!("Invalid argument '{}': empty key", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Collect parsed arguments into a template context; later keys win
pub fn arguments_context(args: Vec<(String, Value)>) -> TemplateContext {
    args.into_iter().collect()
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simone")
        .join("logs")
        .join("simone.log")
}
