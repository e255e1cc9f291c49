//! Prompt templates
//!
//! Loading chain: `{prompts-dir}/{name}.pmt` override, then the copy
//! embedded at build time. Templates use Handlebars syntax.

pub mod embedded;
mod loader;

pub use loader::{DraftPromptContext, PromptLoader};
