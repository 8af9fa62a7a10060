//! Template cache
//!
//! Loads prompt definitions and partials from the tiered sources and keeps
//! them keyed by the source file's modification time. Every lookup re-stats
//! the file; an entry is served only while the recorded time still matches.
//! Compiled templates live in a separate cache keyed by template content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::definition::PromptDefinition;
use super::embedded::EmbeddedFs;
use super::engine::{CompiledTemplate, RenderEngine};
use super::error::PromptError;
use super::fs::SourceFs;
use super::source::{Located, PARTIAL_EXTENSION, PROMPT_EXTENSIONS, TierSet, stems_in};

/// A loaded artifact and the modification time of the file it came from
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub source_path: PathBuf,
    pub source_timestamp: SystemTime,
}

impl<T> CacheEntry<T> {
    /// Still valid for this file at this modification time
    pub fn is_fresh(&self, path: &Path, modified: SystemTime) -> bool {
        self.source_path == path && self.source_timestamp == modified
    }
}

/// Tiered prompt and partial cache with a content-keyed compiler
pub struct TemplateCache {
    fs: Arc<dyn SourceFs>,
    tiers: TierSet,
    engine: Arc<RenderEngine>,
    prompts: Mutex<HashMap<String, CacheEntry<PromptDefinition>>>,
    partials: Mutex<HashMap<String, CacheEntry<String>>>,
    compiled: Mutex<HashMap<String, Arc<CompiledTemplate>>>,
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("tiers", &self.tiers)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl TemplateCache {
    /// Cache over `fs`, with the embedded prompts layered in
    pub fn new(fs: Arc<dyn SourceFs>, tiers: TierSet) -> Self {
        debug!(?tiers, "TemplateCache::new: called");
        Self {
            fs: Arc::new(EmbeddedFs::new(fs)),
            tiers,
            engine: Arc::new(RenderEngine::new()),
            prompts: Mutex::new(HashMap::new()),
            partials: Mutex::new(HashMap::new()),
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// The tiers this cache reads from
    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    /// Names of the prompt files across all tiers, each listed once
    ///
    /// Tiers are visited in precedence order and each directory is sorted.
    pub async fn prompt_names(&self) -> Vec<String> {
        debug!("TemplateCache::prompt_names: called");
        let mut names: Vec<String> = Vec::new();
        for tier in self.tiers.tiers() {
            for name in stems_in(self.fs.as_ref(), &tier.prompts_dir, &PROMPT_EXTENSIONS).await {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Load a prompt definition by name
    ///
    /// Returns `None` only when no tier has the file. A file that exists but
    /// cannot be read or parsed yields the sentinel error definition.
    pub async fn load_prompt(&self, name: &str) -> Option<Arc<PromptDefinition>> {
        debug!(%name, "TemplateCache::load_prompt: called");
        let Some(located) = self.tiers.locate_prompt(self.fs.as_ref(), name).await else {
            debug!(%name, "TemplateCache::load_prompt: not found in any tier");
            return None;
        };

        let modified = match self.fs.modified(&located.path).await {
            Ok(modified) => Some(modified),
            Err(e) => {
                debug!(path = ?located.path, error = %e, "TemplateCache::load_prompt: stat failed");
                None
            }
        };

        if let Some(modified) = modified
            && let Some(hit) = cached(&self.prompts, name, &located.path, modified)
        {
            debug!(%name, "TemplateCache::load_prompt: cache hit");
            return Some(hit);
        }

        let content = match self.fs.read_to_string(&located.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = ?located.path, error = %e, "Failed to read prompt file");
                return Some(Arc::new(PromptDefinition::error(
                    name,
                    format!("failed to read {}: {}", located.path.display(), e),
                )));
            }
        };

        let prompt = match PromptDefinition::parse(&content, name) {
            Ok(prompt) => {
                info!(%name, kind = %located.kind, "Loaded prompt");
                prompt
            }
            Err(e) => {
                warn!(%name, path = ?located.path, error = %e, "Failed to parse prompt file");
                PromptDefinition::error(name, e)
            }
        };

        let prompt = Arc::new(prompt);
        if let Some(modified) = modified {
            store(&self.prompts, name, &located, modified, Arc::clone(&prompt));
        }
        Some(prompt)
    }

    /// Load a partial's text by name, project tier first
    pub async fn load_partial(&self, name: &str) -> Option<String> {
        debug!(%name, "TemplateCache::load_partial: called");
        let located = self.tiers.locate_partial(self.fs.as_ref(), name).await?;
        self.read_partial(name, &located).await.map(|content| content.as_ref().clone())
    }

    /// Read a located partial through the partial cache
    ///
    /// Partials are keyed by path since both tiers may hold the same name.
    async fn read_partial(&self, name: &str, located: &Located) -> Option<Arc<String>> {
        let key = located.path.to_string_lossy().into_owned();
        let modified = self.fs.modified(&located.path).await.ok();
        if let Some(modified) = modified
            && let Some(hit) = cached(&self.partials, &key, &located.path, modified)
        {
            debug!(%name, "TemplateCache::read_partial: cache hit");
            return Some(hit);
        }

        match self.fs.read_to_string(&located.path).await {
            Ok(content) => {
                let content = Arc::new(content);
                if let Some(modified) = modified {
                    store(&self.partials, &key, located, modified, Arc::clone(&content));
                }
                Some(content)
            }
            Err(e) => {
                warn!(%name, path = ?located.path, error = %e, "Failed to read partial");
                None
            }
        }
    }

    /// Discover every partial in both tiers and register it with the engine
    ///
    /// Built-in partials are registered first so project partials with the
    /// same name replace them.
    pub async fn register_partials(&self) -> usize {
        debug!("TemplateCache::register_partials: called");
        let mut discovered: Vec<(String, Arc<String>)> = Vec::new();

        for tier in self.tiers.tiers().iter().rev() {
            for name in stems_in(self.fs.as_ref(), &tier.partials_dir, &[PARTIAL_EXTENSION]).await {
                let located = Located {
                    kind: tier.kind,
                    path: tier.partials_dir.join(format!("{}.{}", name, PARTIAL_EXTENSION)),
                };
                if let Some(content) = self.read_partial(&name, &located).await {
                    discovered.retain(|(existing, _)| existing != &name);
                    discovered.push((name, content));
                }
            }
        }

        let mut registered = 0;
        for (name, content) in &discovered {
            if self.engine.register_partial(name, content) {
                registered += 1;
            }
        }
        debug!(%registered, "TemplateCache::register_partials: complete");
        registered
    }

    /// Compile a template body, reusing the artifact for identical text
    ///
    /// Partials are refreshed on every call. Syntax errors are returned here;
    /// evaluation errors come from [`CompiledTemplate::render`].
    pub async fn compile_template(&self, body: &str) -> Result<Arc<CompiledTemplate>, PromptError> {
        debug!(body_len = body.len(), "TemplateCache::compile_template: called");
        self.register_partials().await;

        if let Some(hit) = self.compiled.lock().unwrap_or_else(PoisonError::into_inner).get(body) {
            debug!("TemplateCache::compile_template: cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(self.engine.compile(body)?);
        let mut cache = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(body.to_string()).or_insert(compiled)))
    }

    /// Drop all prompt and partial entries; compiled templates are kept
    pub fn clear_cache(&self) {
        debug!("TemplateCache::clear_cache: called");
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.partials.lock().unwrap_or_else(PoisonError::into_inner).clear();
        info!("Cleared prompt and partial caches");
    }

    /// Number of compiled templates held
    pub fn compiled_count(&self) -> usize {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn cached<T>(
    cache: &Mutex<HashMap<String, CacheEntry<T>>>,
    name: &str,
    path: &Path,
    modified: SystemTime,
) -> Option<Arc<T>> {
    let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    cache
        .get(name)
        .filter(|entry| entry.is_fresh(path, modified))
        .map(|entry| Arc::clone(&entry.value))
}

fn store<T>(
    cache: &Mutex<HashMap<String, CacheEntry<T>>>,
    name: &str,
    located: &Located,
    modified: SystemTime,
    value: Arc<T>,
) {
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    cache.insert(
        name.to_string(),
        CacheEntry {
            value,
            source_path: located.path.clone(),
            source_timestamp: modified,
        },
    );
}
