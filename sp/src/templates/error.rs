//! Template pipeline error types

use thiserror::Error;

/// Errors that escape the prompt pipeline
///
/// Configuration and loading problems are absorbed upstream; what remains
/// are defects in prompt authoring, reported where they happen.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template compile error: {0}")]
    Compile(#[from] handlebars::TemplateError),

    #[error("Template render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl PromptError {
    /// True for syntax errors found while compiling
    pub fn is_compile(&self) -> bool {
        matches!(self, PromptError::Compile(_))
    }

    /// True for errors raised while evaluating a compiled template
    pub fn is_render(&self) -> bool {
        matches!(self, PromptError::Render(_))
    }
}
