//! Project configuration loading and per-context resolution

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use eyre::{Context, Result, eyre};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{ProjectConfig, ResolvedContext, merge_settings};
use crate::templates::project_name;

/// Name used when the project path yields no usable name
const UNNAMED_PROJECT: &str = "unnamed-project";

/// Loads `project.yaml` once and answers questions about it
///
/// Loading never fails: a missing, unreadable or invalid file is logged and
/// replaced by [`ProjectConfig::fallback`]. The result is memoized for the
/// lifetime of the resolver; build a new resolver to reload.
#[derive(Debug)]
pub struct ConfigResolver {
    project_path: PathBuf,
    config_file: PathBuf,
    config: OnceLock<ProjectConfig>,
}

impl ConfigResolver {
    /// Create a resolver for `config_file`, deriving fallback names from `project_path`
    pub fn new(project_path: impl AsRef<Path>, config_file: impl AsRef<Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        let config_file = config_file.as_ref().to_path_buf();
        debug!(?project_path, ?config_file, "ConfigResolver::new: called");
        Self {
            project_path,
            config_file,
            config: OnceLock::new(),
        }
    }

    /// Load the configuration (memoized)
    pub fn load(&self) -> &ProjectConfig {
        self.config.get_or_init(|| self.read_or_fallback())
    }

    /// Alias for [`ConfigResolver::load`]
    pub fn get_config(&self) -> &ProjectConfig {
        self.load()
    }

    fn read_or_fallback(&self) -> ProjectConfig {
        debug!(config_file = ?self.config_file, "ConfigResolver::read_or_fallback: called");
        if !self.config_file.exists() {
            debug!("ConfigResolver::read_or_fallback: no config file, using fallback");
            return self.fallback();
        }

        match self.read_config() {
            Ok(config) => {
                info!("Loaded project config from: {}", self.config_file.display());
                config
            }
            Err(e) => {
                warn!(
                    "Invalid project config {}, using defaults: {:#}",
                    self.config_file.display(),
                    e
                );
                self.fallback()
            }
        }
    }

    fn read_config(&self) -> Result<ProjectConfig> {
        let content = fs::read_to_string(&self.config_file).context("Failed to read project config")?;
        let config: ProjectConfig = serde_yaml::from_str(&content).context("Failed to parse project config")?;

        if config.project.name.trim().is_empty() {
            return Err(eyre!("project.name must not be empty"));
        }
        if let Some(index) = config.contexts.iter().position(|context| context.name.trim().is_empty()) {
            return Err(eyre!("contexts[{}] has an empty name", index));
        }

        let mut seen = Vec::with_capacity(config.contexts.len());
        for context in &config.contexts {
            if seen.contains(&context.name.as_str()) {
                warn!(name = %context.name, "Duplicate context name in project config");
            }
            seen.push(context.name.as_str());
        }

        Ok(config)
    }

    fn fallback(&self) -> ProjectConfig {
        let name = project_name(&self.project_path);
        if name.is_empty() {
            ProjectConfig::fallback(UNNAMED_PROJECT)
        } else {
            ProjectConfig::fallback(name)
        }
    }

    /// Every declared context with shared tooling and methodology folded in
    pub fn get_resolved_contexts(&self) -> Vec<ResolvedContext> {
        let config = self.load();
        debug!(count = config.contexts.len(), "ConfigResolver::get_resolved_contexts: called");
        let shared = config.shared.as_ref();

        config
            .contexts
            .iter()
            .map(|context| ResolvedContext {
                resolved_tooling: merge_settings(
                    shared.and_then(|s| s.tooling.as_ref()),
                    context.tooling.as_ref(),
                ),
                resolved_methodology: merge_settings(
                    shared.and_then(|s| s.methodology.as_ref()),
                    context.methodology.as_ref(),
                ),
                context: context.clone(),
            })
            .collect()
    }

    /// True if `<path>.enabled` is `true` in at least one resolved context
    pub fn is_feature_enabled(&self, path: &str) -> bool {
        debug!(%path, "ConfigResolver::is_feature_enabled: called");
        self.get_resolved_contexts().iter().any(|resolved| {
            let Ok(mut view) = serde_json::to_value(&resolved.context) else {
                return false;
            };
            if let Some(map) = view.as_object_mut() {
                map.insert("tooling".to_string(), Value::Object(resolved.resolved_tooling.clone()));
                map.insert(
                    "methodology".to_string(),
                    Value::Object(resolved.resolved_methodology.clone()),
                );
            }

            let enabled = path
                .split('.')
                .try_fold(&view, |node, segment| node.get(segment))
                .and_then(|node| node.get("enabled"));
            matches!(enabled, Some(Value::Bool(true)))
        })
    }
}
