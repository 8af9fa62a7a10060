//! Simone tool configuration and on-disk layout

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::templates::EMBEDDED_ROOT;

/// Default name of the per-project metadata directory
pub const DEFAULT_METADATA_DIR: &str = ".simone";

/// Main tool configuration
///
/// This is the configuration of the `sp` tool itself. The per-project
/// configuration file lives under the metadata directory and is handled by
/// [`crate::project::ConfigResolver`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the metadata directory inside a project
    #[serde(rename = "metadata-dir")]
    pub metadata_dir: String,

    /// On-disk built-in prompt directory; the embedded prompts are used when unset
    #[serde(rename = "builtin-dir", skip_serializing_if = "Option::is_none")]
    pub builtin_dir: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            builtin_dir: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try user config: ~/.config/simone/simone.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed here; the full [`Config::load`] reports them once
    /// logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::user_config_path()?,
        };
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<Self>(&content).ok()?.log_level
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("simone").join("simone.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve every path the pipeline touches for the given project
    pub fn layout(&self, project_path: impl AsRef<Path>) -> Layout {
        Layout::new(project_path, &self.metadata_dir, self.builtin_dir.as_deref())
    }
}

/// Filesystem locations used by the resolution pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Project root as supplied by the caller
    pub project_path: PathBuf,
    /// `<project>/<metadata-dir>`
    pub metadata_dir: PathBuf,
    /// Project-tier prompts
    pub project_prompts: PathBuf,
    /// Project-tier partials
    pub project_partials: PathBuf,
    /// Built-in prompts (under the embedded root unless overridden)
    pub builtin_prompts: PathBuf,
    /// Built-in partials
    pub builtin_partials: PathBuf,
}

impl Layout {
    pub fn new(project_path: impl AsRef<Path>, metadata_dir: &str, builtin_dir: Option<&Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        debug!(?project_path, %metadata_dir, "Layout::new: called");
        let metadata_dir = project_path.join(metadata_dir);
        let project_prompts = metadata_dir.join("prompts");
        let builtin_prompts = builtin_dir.unwrap_or(Path::new(EMBEDDED_ROOT)).join("prompts");

        Self {
            project_partials: project_prompts.join("partials"),
            builtin_partials: builtin_prompts.join("partials"),
            project_path,
            metadata_dir,
            project_prompts,
            builtin_prompts,
        }
    }

    /// Layout with the default metadata directory and an on-disk built-in directory
    pub fn for_project(project_path: impl AsRef<Path>, builtin_dir: impl AsRef<Path>) -> Self {
        Self::new(project_path, DEFAULT_METADATA_DIR, Some(builtin_dir.as_ref()))
    }

    /// The structured project configuration file
    pub fn config_file(&self) -> PathBuf {
        self.metadata_dir.join("project.yaml")
    }

    /// The optional constitution document
    pub fn constitution_file(&self) -> PathBuf {
        self.metadata_dir.join("constitution.md")
    }
}
