//! Simone - prompt resolution for project-aware assistants
//!
//! Given a prompt name and caller arguments, Simone finds the prompt file
//! (project override first, built-in second), merges a layered context out
//! of project facts, the structured project configuration, argument
//! defaults and caller arguments, and renders the Handlebars body into a
//! single user message.
//!
//! # Modules
//!
//! - [`project`] - project configuration loading and per-context resolution
//! - [`templates`] - two-tier template sources, caching, helpers and rendering
//! - [`resolver`] - the end-to-end prompt resolution pipeline
//! - [`config`] - tool configuration and on-disk layout
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod project;
pub mod resolver;
pub mod templates;

pub use config::{Config, Layout};
pub use project::{ConfigResolver, ProjectConfig, ResolvedContext};
pub use resolver::{MessageContent, PromptMessage, PromptResolver, Role};
pub use templates::{PromptDefinition, PromptError, TemplateCache, TemplateContext};
