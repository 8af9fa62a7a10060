//! Prompt definition files
//!
//! A prompt file is YAML. It is either a single document carrying the
//! template under `template`, or a `---` delimited front-matter block
//! followed by the raw template body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Name carried by the sentinel definition produced for broken prompt files
pub const ERROR_PROMPT_NAME: &str = "error";

/// One declared prompt argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    /// Default value; string defaults may themselves be templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A loaded prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub arguments: Vec<PromptArgument>,

    /// Partials to preload
    #[serde(default)]
    pub partials: Vec<String>,

    /// Template body
    pub template: String,

    /// Any other metadata (`version`, `authors`, `tags`, ...)
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Keys of a prompt file before defaults are applied
#[derive(Debug, Deserialize)]
struct RawPrompt {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    arguments: Vec<PromptArgument>,
    #[serde(default)]
    partials: Vec<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl PromptDefinition {
    /// Parse a prompt file; `stem` names the prompt when the file does not
    pub fn parse(content: &str, stem: &str) -> Result<Self, String> {
        debug!(%stem, content_len = content.len(), "PromptDefinition::parse: called");
        let (front, body) = match split_front_matter(content) {
            Some((front, body)) => {
                debug!("PromptDefinition::parse: front matter with body");
                (front, Some(body))
            }
            None => (content, None),
        };

        // An empty document deserializes as unit, not a map
        if front.trim().is_empty() || front.trim() == "---" {
            return Err("prompt file is empty".to_string());
        }
        let raw: RawPrompt = serde_yaml::from_str(front).map_err(|e| e.to_string())?;

        let template = raw
            .template
            .or_else(|| body.filter(|b| !b.trim().is_empty()).map(str::to_string))
            .ok_or_else(|| "missing template body".to_string())?;

        Ok(Self {
            name: raw.name.unwrap_or_else(|| stem.to_string()),
            description: raw.description,
            arguments: raw.arguments,
            partials: raw.partials,
            template,
            metadata: raw.metadata,
        })
    }

    /// Sentinel definition describing why `name` could not be loaded
    ///
    /// The message is escaped so the sentinel itself always compiles.
    pub fn error(name: &str, message: impl AsRef<str>) -> Self {
        debug!(%name, "PromptDefinition::error: called");
        let template = format!("Failed to parse prompt '{}': {}", name, message.as_ref()).replace("{{", "\\{{");
        Self {
            name: ERROR_PROMPT_NAME.to_string(),
            description: "Failed to load prompt".to_string(),
            arguments: Vec::new(),
            partials: Vec::new(),
            template,
            metadata: Map::new(),
        }
    }

    /// True for the sentinel produced by [`PromptDefinition::error`]
    pub fn is_error(&self) -> bool {
        self.name == ERROR_PROMPT_NAME
    }
}

/// Split `---\n<front>\n---\n<body>`; `None` if there is no closing fence
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }
    None
}
