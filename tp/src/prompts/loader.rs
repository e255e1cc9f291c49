//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::PlannerSnapshot;

/// Context for rendering the draft prompt
#[derive(Debug, Clone, Serialize)]
pub struct DraftPromptContext {
    pub request: String,
    /// "key: value" lines describing the traveler
    pub context_lines: Vec<String>,
    /// Directives from a previous failed attempt
    pub constraints: Vec<String>,
    pub has_constraints: bool,
}

impl DraftPromptContext {
    pub fn new(snapshot: &PlannerSnapshot, constraints: &[String]) -> Self {
        debug!(constraints = constraints.len(), "DraftPromptContext::new: called");
        Self {
            request: snapshot.request.clone(),
            context_lines: snapshot.context_lines(),
            constraints: constraints.to_vec(),
            has_constraints: !constraints.is_empty(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// Override directory; `{name}.pmt` here wins over the embedded copy
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    pub fn new(override_dir: Option<impl AsRef<Path>>) -> Self {
        let override_dir = override_dir.map(|d| d.as_ref().to_path_buf()).filter(|d| d.exists());
        debug!(?override_dir, "PromptLoader::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, override_dir }
    }

    /// Loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self::new(None::<PathBuf>)
    }

    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with any serializable context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    pub fn draft_prompt(&self, context: &DraftPromptContext) -> Result<String> {
        self.render("draft", context)
    }
}
