//! Project configuration types
//!
//! Mirrors the shape of `.simone/project.yaml`. Unknown keys at every level
//! are kept in `extra` maps so custom fields survive a load untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form settings map (tooling, methodology)
pub type Settings = Map<String, Value>;

/// Root of the structured project configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata; `project.name` is mandatory
    pub project: ProjectInfo,

    /// Settings applied to every context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<SharedConfig>,

    /// Sub-project units; must be present, may be empty
    pub contexts: Vec<ContextConfig>,

    /// Custom top-level fields (e.g. `github`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Project metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Project type (`single`, `monorepo`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings shared by all contexts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooling: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<Settings>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One named context inside the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooling: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<Settings>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A context with shared settings folded in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedContext {
    #[serde(flatten)]
    pub context: ContextConfig,

    /// `shared.tooling` overridden by the context's `tooling`
    #[serde(rename = "resolvedTooling")]
    pub resolved_tooling: Settings,

    /// `shared.methodology` overridden by the context's `methodology`
    #[serde(rename = "resolvedMethodology")]
    pub resolved_methodology: Settings,
}

impl ProjectConfig {
    /// The configuration used when no valid file is available
    pub fn fallback(project_name: impl Into<String>) -> Self {
        let mut stack = Map::new();
        stack.insert("language".to_string(), Value::String("unknown".to_string()));

        Self {
            project: ProjectInfo {
                name: project_name.into(),
                description: None,
                kind: Some("single".to_string()),
                version: None,
                extra: Map::new(),
            },
            shared: None,
            contexts: vec![ContextConfig {
                name: "main".to_string(),
                path: Some("./".to_string()),
                stack: Some(Value::Object(stack)),
                tooling: Some(Settings::new()),
                methodology: None,
                extra: Map::new(),
            }],
            extra: Map::new(),
        }
    }
}

/// Merge `overlay` over `base` key by key
///
/// When both sides hold an object under the same key the two objects are
/// merged one level deep; anything nested further is replaced wholesale.
pub fn merge_settings(base: Option<&Settings>, overlay: Option<&Settings>) -> Settings {
    let mut merged = base.cloned().unwrap_or_default();
    let Some(overlay) = overlay else {
        return merged;
    };

    for (key, value) in overlay {
        match (merged.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}
