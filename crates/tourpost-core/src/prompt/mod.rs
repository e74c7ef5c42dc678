//! Prompt construction for the hosted language model.
//!
//! Every prompt asks for labelled fields (`Rationale:`, `Post:`, ...) that
//! [`crate::output`] reads back.

mod image;
mod links;
mod post;

pub use image::{image_prompt_messages, DEFAULT_NEGATIVE_PROMPT, EXTRACTED_TOPICS_FIELD, IMAGE_PROMPT_FIELD};
pub use links::{link_extraction_messages, link_search_query};
pub use post::{post_messages, PostPromptInput, POST_FIELD, RATIONALE_FIELD};

/// One labelled line per field, in order.
pub(crate) fn render_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
