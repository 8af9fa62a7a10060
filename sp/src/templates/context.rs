//! Base rendering context

use std::path::{Path, is_separator};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Variables available to templates, by name
pub type TemplateContext = Map<String, Value>;

/// Reserved base context keys
pub const PROJECT_PATH: &str = "PROJECT_PATH";
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const TIMESTAMP: &str = "TIMESTAMP";
pub const CURRENT_DATE: &str = "CURRENT_DATE";
pub const CURRENT_TIME: &str = "CURRENT_TIME";

/// Final path segment of `project_path`, using the host's separator rules
///
/// Trailing separators are ignored; a root or empty path yields "". The
/// segment is taken literally, so `/a/b/..` names `..`.
pub fn project_name(project_path: impl AsRef<Path>) -> String {
    let path = project_path.as_ref().to_string_lossy();
    path.trim_end_matches(is_separator)
        .rsplit(is_separator)
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Builds the base context from the project path
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// Base context at the current time, with `additional` merged over it
    pub fn build(project_path: &str, additional: Option<&TemplateContext>) -> TemplateContext {
        Self::build_at(project_path, additional, Utc::now())
    }

    /// Base context at a fixed instant
    ///
    /// Every key of `additional` overrides the base, reserved keys included.
    pub fn build_at(project_path: &str, additional: Option<&TemplateContext>, now: DateTime<Utc>) -> TemplateContext {
        debug!(%project_path, has_additional = additional.is_some(), "ContextBuilder::build_at: called");
        let local = now.with_timezone(&Local);

        let mut context = TemplateContext::new();
        context.insert(PROJECT_PATH.to_string(), Value::String(project_path.to_string()));
        context.insert(PROJECT_NAME.to_string(), Value::String(project_name(project_path)));
        context.insert(
            TIMESTAMP.to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        context.insert(
            CURRENT_DATE.to_string(),
            Value::String(local.format("%-m/%-d/%Y").to_string()),
        );
        context.insert(
            CURRENT_TIME.to_string(),
            Value::String(local.format("%-I:%M:%S %p").to_string()),
        );

        if let Some(additional) = additional {
            merge_into(&mut context, additional);
        }
        context
    }
}

/// Copy every entry of `layer` into `context`, replacing existing keys
pub fn merge_into(context: &mut TemplateContext, layer: &TemplateContext) {
    for (key, value) in layer {
        context.insert(key.clone(), value.clone());
    }
}
