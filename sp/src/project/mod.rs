//! Project configuration
//!
//! Loads `<project>/.simone/project.yaml` and produces per-context views in
//! which shared settings are overridden by context-specific ones.

mod resolver;
mod types;

pub use resolver::ConfigResolver;
pub use types::{ContextConfig, ProjectConfig, ProjectInfo, ResolvedContext, Settings, SharedConfig, merge_settings};
