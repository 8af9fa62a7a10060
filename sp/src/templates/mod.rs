//! Template system
//!
//! Prompt definitions (`.yaml`) and partials (`.hbs`) are loaded from
//! tiers, first match wins:
//! 1. `<project>/.simone/prompts/` (project override)
//! 2. `<builtin-dir>/prompts/` (only when `builtin-dir` is configured)
//! 3. the prompts embedded in the binary
//!
//! Templates use Handlebars syntax, extended with the comparison helpers in
//! [`helpers`].

mod cache;
mod context;
mod definition;
mod embedded;
mod engine;
mod error;
pub mod fs;
pub mod helpers;
mod source;

pub use cache::{CacheEntry, TemplateCache};
pub use context::{
    CURRENT_DATE, CURRENT_TIME, ContextBuilder, PROJECT_NAME, PROJECT_PATH, TIMESTAMP, TemplateContext, merge_into,
    project_name,
};
pub use definition::{ERROR_PROMPT_NAME, PromptArgument, PromptDefinition};
pub use embedded::{EMBEDDED_FILES, EMBEDDED_ROOT, EmbeddedFs, embedded_prompts_dir};
pub use engine::{CompiledTemplate, RenderEngine};
pub use error::PromptError;
pub use fs::{LocalFs, SourceFs};
pub use helpers::{Comparator, HelperRegistry, Operand};
pub use source::{Located, PARTIAL_EXTENSION, PROMPT_EXTENSIONS, Tier, TierKind, TierSet, stems_in};
