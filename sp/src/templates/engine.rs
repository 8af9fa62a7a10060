//! Shared Handlebars engine and compiled template handles

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use handlebars::{Handlebars, Template};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::PromptError;
use super::helpers::HelperRegistry;

/// Handlebars registry shared by every compiled template of one cache
///
/// Partials and compiled templates are registered by name; helpers are
/// installed once at construction.
pub struct RenderEngine {
    hbs: RwLock<Handlebars<'static>>,
    helpers: RwLock<HelperRegistry>,
    next_id: AtomicU64,
}

impl fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEngine")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine {
    pub fn new() -> Self {
        debug!("RenderEngine::new: called");
        let mut hbs = Handlebars::new();
        // Prompts are plain text for a model, not HTML
        hbs.register_escape_fn(handlebars::no_escape);

        let engine = Self {
            hbs: RwLock::new(hbs),
            helpers: RwLock::new(HelperRegistry::new()),
            next_id: AtomicU64::new(0),
        };
        engine.register_helpers();
        engine
    }

    /// Install the comparison helpers; safe to call repeatedly
    pub fn register_helpers(&self) -> bool {
        let mut helpers = self.helpers.write().unwrap_or_else(PoisonError::into_inner);
        let mut hbs = self.hbs.write().unwrap_or_else(PoisonError::into_inner);
        helpers.register(&mut hbs)
    }

    /// Register (or replace) a partial; a partial that does not compile is skipped
    pub fn register_partial(&self, name: &str, content: &str) -> bool {
        debug!(%name, content_len = content.len(), "RenderEngine::register_partial: called");
        let mut hbs = self.hbs.write().unwrap_or_else(PoisonError::into_inner);
        match hbs.register_partial(name, content) {
            Ok(()) => true,
            Err(e) => {
                warn!(%name, error = %e, "Skipping partial that failed to compile");
                false
            }
        }
    }

    /// Compile a template body into a renderable handle
    pub fn compile(self: &Arc<Self>, body: &str) -> Result<CompiledTemplate, PromptError> {
        debug!(body_len = body.len(), "RenderEngine::compile: called");
        let template = Template::compile(body)?;
        let id = format!("compiled-{}", self.next_id.fetch_add(1, Ordering::Relaxed));

        self.hbs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_template(&id, template);

        debug!(%id, "RenderEngine::compile: registered");
        Ok(CompiledTemplate {
            id,
            engine: Arc::clone(self),
        })
    }

    fn render<T: Serialize>(&self, id: &str, data: &T) -> Result<String, PromptError> {
        let hbs = self.hbs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(hbs.render(id, data)?)
    }
}

/// A compiled template bound to its engine
///
/// Compilation errors surface from [`RenderEngine::compile`]; evaluation
/// errors surface from [`CompiledTemplate::render`].
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    id: String,
    engine: Arc<RenderEngine>,
}

impl CompiledTemplate {
    /// Render against a context
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, PromptError> {
        debug!(id = %self.id, "CompiledTemplate::render: called");
        self.engine.render(&self.id, data)
    }

    /// Registry name of this template
    pub fn id(&self) -> &str {
        &self.id
    }
}
