//! Embedded prompts
//!
//! Compiled into the binary from the .pmt files under `prompts/`.

/// System prompt for the draft stage
pub const DRAFT: &str = include_str!("../../prompts/draft.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "draft" => Some(DRAFT),
        _ => None,
    }
}
