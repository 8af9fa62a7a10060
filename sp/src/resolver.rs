//! Prompt resolution
//!
//! Turns a prompt name plus caller arguments into the final message list.
//! The rendering context is layered, later layers winning key by key:
//!
//! ```text
//! base (PROJECT_PATH, PROJECT_NAME, TIMESTAMP, ...)
//!   < project config (project, contexts, custom top-level fields)
//!   < argument defaults
//!   < caller arguments
//! ```
//!
//! A `constitution` key is added last when `.simone/constitution.md` exists.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, Layout};
use crate::project::ConfigResolver;
use crate::templates::{
    ContextBuilder, LocalFs, PromptDefinition, PromptError, SourceFs, TemplateCache, TemplateContext, TierSet,
    merge_into,
};

/// Rendered when no tier has the requested prompt
pub const NOT_FOUND_TEMPLATE: &str =
    "An error happened while resolving the prompt.\n\nPrompt '{{prompt_name}}' not found.";

/// Context key holding the constitution text
pub const CONSTITUTION_KEY: &str = "constitution";

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

/// One message of a resolved prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl PromptMessage {
    /// A user message carrying `text`
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text { text: text.into() },
        }
    }

    /// The message text
    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } => text,
        }
    }
}

/// Resolves prompts for one project
///
/// Configuration, template and compiled-template caches are shared by every
/// call on the same resolver.
pub struct PromptResolver {
    layout: Layout,
    project_path: String,
    fs: Arc<dyn SourceFs>,
    config: ConfigResolver,
    templates: TemplateCache,
}

impl std::fmt::Debug for PromptResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptResolver")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl PromptResolver {
    /// Resolver over the local filesystem
    pub fn new(layout: Layout) -> Self {
        Self::with_fs(layout, Arc::new(LocalFs))
    }

    /// Resolver for `project_path` using the tool configuration's layout
    pub fn from_config(config: &Config, project_path: impl AsRef<Path>) -> Self {
        Self::new(config.layout(project_path))
    }

    /// Resolver with a custom filesystem for the template layer
    pub fn with_fs(layout: Layout, fs: Arc<dyn SourceFs>) -> Self {
        debug!(?layout, "PromptResolver::with_fs: called");
        let project_path = layout.project_path.to_string_lossy().into_owned();
        let config = ConfigResolver::new(&layout.project_path, layout.config_file());
        let templates = TemplateCache::new(Arc::clone(&fs), TierSet::from_layout(&layout));
        Self {
            layout,
            project_path,
            fs,
            config,
            templates,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &ConfigResolver {
        &self.config
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    /// Resolve `name` with `arguments` into a single user message
    ///
    /// Missing prompts, broken prompt files and unreadable constitutions are
    /// reported inside the rendered text. Only template syntax and
    /// evaluation errors are returned as `Err`.
    pub async fn resolve(
        &self,
        name: &str,
        arguments: Option<&TemplateContext>,
    ) -> Result<Vec<PromptMessage>, PromptError> {
        debug!(%name, has_arguments = arguments.is_some(), "PromptResolver::resolve: called");
        let mut context = ContextBuilder::build(&self.project_path, None);

        let Some(prompt) = self.templates.load_prompt(name).await else {
            warn!(%name, "Prompt not found");
            context.insert("prompt_name".to_string(), Value::String(name.to_string()));
            let text = self.render(NOT_FOUND_TEMPLATE, &context).await?;
            return Ok(vec![PromptMessage::user(text)]);
        };

        merge_into(&mut context, &self.config_snapshot());

        let defaults = self.resolve_defaults(&prompt, arguments, &context).await?;
        merge_into(&mut context, &defaults);

        if let Some(arguments) = arguments {
            merge_into(&mut context, arguments);
        }

        if let Some(constitution) = self.load_constitution().await {
            context.insert(CONSTITUTION_KEY.to_string(), Value::String(constitution));
        }

        let text = self.render(&prompt.template, &context).await?;
        info!(%name, text_len = text.len(), "Resolved prompt");
        Ok(vec![PromptMessage::user(text)])
    }

    /// Every prompt in any tier that loads into a usable definition
    ///
    /// Names present in several tiers are listed once, from the first tier.
    pub async fn list_available_prompts(&self) -> Vec<Arc<PromptDefinition>> {
        debug!("PromptResolver::list_available_prompts: called");
        let names = self.templates.prompt_names().await;

        let mut prompts = Vec::with_capacity(names.len());
        for name in names {
            match self.templates.load_prompt(&name).await {
                Some(prompt) if !prompt.is_error() => prompts.push(prompt),
                Some(_) => debug!(%name, "list_available_prompts: skipping broken prompt"),
                None => debug!(%name, "list_available_prompts: prompt vanished"),
            }
        }
        debug!(count = prompts.len(), "list_available_prompts: complete");
        prompts
    }

    /// Drop cached prompts and partials (e.g. after a file watcher fires)
    pub fn clear_cache(&self) {
        debug!("PromptResolver::clear_cache: called");
        self.templates.clear_cache();
    }

    /// Compile (cached) and render a template body
    async fn render(&self, body: &str, context: &TemplateContext) -> Result<String, PromptError> {
        self.templates.compile_template(body).await?.render(context)
    }

    /// Top-level fields of the project configuration as context entries
    fn config_snapshot(&self) -> TemplateContext {
        match serde_json::to_value(self.config.get_config()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => TemplateContext::new(),
            Err(e) => {
                warn!(error = %e, "Failed to expose project config to templates");
                TemplateContext::new()
            }
        }
    }

    /// Defaults for declared arguments the caller did not supply
    ///
    /// String defaults containing `{{` are rendered against `context`;
    /// anything else is used as is.
    async fn resolve_defaults(
        &self,
        prompt: &PromptDefinition,
        arguments: Option<&TemplateContext>,
        context: &TemplateContext,
    ) -> Result<TemplateContext, PromptError> {
        let mut defaults = TemplateContext::new();
        for argument in &prompt.arguments {
            if arguments.is_some_and(|args| args.contains_key(&argument.name)) {
                continue;
            }

            let Some(default) = &argument.default else {
                if argument.required {
                    debug!(name = %argument.name, prompt = %prompt.name, "Required argument not supplied");
                }
                continue;
            };

            let value = match default {
                Value::String(template) if template.contains("{{") => {
                    debug!(name = %argument.name, "resolve_defaults: rendering templated default");
                    Value::String(self.render(template, context).await?)
                }
                other => other.clone(),
            };
            defaults.insert(argument.name.clone(), value);
        }
        Ok(defaults)
    }

    /// Text of the constitution document, or a diagnostic if it cannot be read
    async fn load_constitution(&self) -> Option<String> {
        let path = self.layout.constitution_file();
        if !self.fs.exists(&path).await {
            debug!(?path, "load_constitution: no constitution");
            return None;
        }

        match self.fs.read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(?path, error = %e, "Failed to read constitution");
                Some(format!("[Failed to read constitution.md: {}]", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PromptResolver) {
        let dir = TempDir::new().unwrap();
        let layout = Layout::for_project(dir.path().join("demo"), dir.path().join("builtin"));
        fs::create_dir_all(&layout.project_partials).unwrap();
        fs::create_dir_all(&layout.builtin_partials).unwrap();
        (dir, PromptResolver::new(layout))
    }

    fn write_prompt(resolver: &PromptResolver, name: &str, content: &str) {
        fs::write(resolver.layout().project_prompts.join(format!("{}.yaml", name)), content).unwrap();
    }

    fn args(value: Value) -> TemplateContext {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_message_shape() {
        let message = PromptMessage::user("hi");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "user", "content": {"type": "text", "text": "hi"}})
        );
        assert_eq!(message.text(), "hi");
    }

    #[tokio::test]
    async fn test_simple_prompt() {
        let (_dir, resolver) = setup();
        write_prompt(&resolver, "simple", "name: simple\ntemplate: Hello from {{PROJECT_NAME}}!\n");

        let messages = resolver.resolve("simple", None).await.unwrap();
        assert_eq!(messages, vec![PromptMessage::user("Hello from demo!")]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (_dir, resolver) = setup();
        let messages = resolver.resolve("non-existent", Some(&TemplateContext::new())).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].text().contains("error happened"));
        assert!(messages[0].text().contains("Prompt 'non-existent' not found"));
    }

    #[tokio::test]
    async fn test_defaults_and_precedence() {
        let (_dir, resolver) = setup();
        let prompt = r#"
name: with_args
arguments:
  - name: required_arg
    required: true
  - name: optional_arg
    default: default_value
  - name: dynamic_default
    default: "{{PROJECT_NAME}}-suffix"
template: "Required: {{required_arg}}, Optional: {{optional_arg}}, Dynamic: {{dynamic_default}}"
"#;
        write_prompt(&resolver, "with_args", prompt);

        let messages = resolver
            .resolve("with_args", Some(&args(json!({"required_arg": "provided"}))))
            .await
            .unwrap();
        assert_eq!(
            messages[0].text(),
            "Required: provided, Optional: default_value, Dynamic: demo-suffix"
        );

        let messages = resolver
            .resolve("with_args", Some(&args(json!({"optional_arg": "given", "dynamic_default": "x"}))))
            .await
            .unwrap();
        assert_eq!(messages[0].text(), "Required: , Optional: given, Dynamic: x");
    }

    #[tokio::test]
    async fn test_caller_overrides_reserved_fields() {
        let (_dir, resolver) = setup();
        write_prompt(&resolver, "p", "name: p\ntemplate: \"{{PROJECT_NAME}}|{{custom_arg}}\"\n");

        let messages = resolver
            .resolve("p", Some(&args(json!({"PROJECT_NAME": "X", "custom_arg": "custom_value"}))))
            .await
            .unwrap();
        assert_eq!(messages[0].text(), "X|custom_value");
    }

    #[tokio::test]
    async fn test_numeric_default_keeps_type() {
        let (_dir, resolver) = setup();
        let prompt = r#"
name: helpers
arguments:
  - name: value
    required: true
  - name: threshold
    default: 10
template: "{{#if (gt value threshold)}}above{{else}}below{{/if}}"
"#;
        write_prompt(&resolver, "helpers", prompt);
        let above = resolver.resolve("helpers", Some(&args(json!({"value": 12})))).await.unwrap();
        let below = resolver.resolve("helpers", Some(&args(json!({"value": 3})))).await.unwrap();
        assert_eq!(above[0].text(), "above");
        assert_eq!(below[0].text(), "below");
    }

    #[tokio::test]
    async fn test_config_in_context() {
        let (_dir, resolver) = setup();
        fs::write(
            resolver.layout().config_file(),
            "project:\n  name: configured-project\ncontexts:\n  - name: backend\n    path: ./backend\ngithub:\n  repository: owner/repo\n",
        )
        .unwrap();
        write_prompt(
            &resolver,
            "config_test",
            "name: config_test\ntemplate: \"Project: {{project.name}}, GitHub: {{github.repository}}, First: {{#each contexts}}{{name}}{{/each}}\"\n",
        );

        let messages = resolver.resolve("config_test", None).await.unwrap();
        assert_eq!(
            messages[0].text(),
            "Project: configured-project, GitHub: owner/repo, First: backend"
        );
    }

    #[tokio::test]
    async fn test_constitution_injected() {
        let (_dir, resolver) = setup();
        fs::write(
            resolver.layout().constitution_file(),
            "# Project Constitution\nProject rules...",
        )
        .unwrap();
        write_prompt(&resolver, "c", "name: c\ntemplate: \"Constitution: {{constitution}}\"\n");

        let messages = resolver.resolve("c", None).await.unwrap();
        assert_eq!(messages[0].text(), "Constitution: # Project Constitution\nProject rules...");
    }

    #[tokio::test]
    async fn test_constitution_read_failure_is_reported() {
        let (_dir, resolver) = setup();
        fs::create_dir_all(resolver.layout().constitution_file()).unwrap();
        write_prompt(&resolver, "c", "name: c\ntemplate: \"{{constitution}}\"\n");

        let messages = resolver.resolve("c", None).await.unwrap();
        assert!(messages[0].text().contains("Failed to read constitution.md"));
    }

    #[tokio::test]
    async fn test_broken_prompt_renders_diagnostic() {
        let (_dir, resolver) = setup();
        write_prompt(&resolver, "invalid", "name: invalid\ndescription: [unclosed array\ntemplate: test\n");

        let messages = resolver.resolve("invalid", None).await.unwrap();
        assert!(messages[0].text().contains("Failed to parse prompt 'invalid'"));
    }

    #[tokio::test]
    async fn test_template_errors_propagate() {
        let (_dir, resolver) = setup();
        write_prompt(&resolver, "syntax", "name: syntax\ntemplate: \"{{#if x}}never closed\"\n");
        write_prompt(&resolver, "runtime", "name: runtime\ntemplate: \"{{#if}}missing{{/if}}\"\n");

        assert!(resolver.resolve("syntax", None).await.unwrap_err().is_compile());
        assert!(resolver.resolve("runtime", None).await.unwrap_err().is_render());
    }

    #[tokio::test]
    async fn test_list_skips_broken_and_dedupes() {
        let (_dir, resolver) = setup();
        write_prompt(&resolver, "prompt1", "name: prompt1\ntemplate: Test 1\n");
        fs::write(
            resolver.layout().project_prompts.join("prompt2.yml"),
            "name: prompt2\ntemplate: Test 2\n",
        )
        .unwrap();
        write_prompt(&resolver, "broken", "name: broken\ndescription: [oops\n");
        fs::write(
            resolver.layout().builtin_prompts.join("prompt1.yaml"),
            "name: prompt1\ndescription: builtin copy\ntemplate: B\n",
        )
        .unwrap();
        fs::write(
            resolver.layout().builtin_prompts.join("builtin1.yaml"),
            "name: builtin1\ntemplate: Built-in 1\n",
        )
        .unwrap();

        let prompts = resolver.list_available_prompts().await;
        let names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["prompt1", "prompt2", "builtin1", "onboard", "plan", "review"]);
        assert_eq!(prompts[0].description, "");
    }
}
