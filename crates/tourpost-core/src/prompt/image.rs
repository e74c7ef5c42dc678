use super::render_fields;
use crate::agenda::EventInfo;
use crate::collaborators::ChatMessage;

pub const EXTRACTED_TOPICS_FIELD: &str = "Extracted Topics";
pub const IMAGE_PROMPT_FIELD: &str = "Image Prompt";

/// Used when the caller supplies no negative prompt of their own.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "Do not include any text in the image or specific \
     references to events. Do not include any words or any reference to the event name.";

/// Chat messages asking for the topics of a post plus a prompt for the
/// image model. `negative_prompt` falls back to [`DEFAULT_NEGATIVE_PROMPT`]
/// when blank.
pub fn image_prompt_messages(
    event: &EventInfo,
    user_post: &str,
    negative_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let negative = negative_prompt
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_NEGATIVE_PROMPT);

    let system = format!(
        "Given a social media post written at {event}, list the Data and AI topics it \
         covers, named the way {organizer} names them (include Mosaic AI when the user is \
         interested in AI). Then write a prompt for a text-to-image model that produces an \
         image worth sharing on social media. Focus on the ambience and respect the \
         negative prompt.\n\
         Reply with exactly these fields and nothing else:\n\
         {topics}: <comma-separated {organizer} topics>\n\
         {prompt}: <the image prompt, on a single line>",
        organizer = event.organizer,
        event = event.name,
        topics = EXTRACTED_TOPICS_FIELD,
        prompt = IMAGE_PROMPT_FIELD,
    );

    vec![
        ChatMessage::system(system),
        ChatMessage::user(render_fields(&[
            ("User Post", user_post),
            ("Negative Prompt", negative),
        ])),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_negative_prompt_uses_default() {
        let event = EventInfo::default();
        for negative in [None, Some("   ")] {
            let messages = image_prompt_messages(&event, "Loving the Unity Catalog demo", negative);
            assert_eq!(messages.len(), 2);
            assert!(messages[1]
                .content
                .ends_with(&format!("Negative Prompt: {}", DEFAULT_NEGATIVE_PROMPT)));
        }
    }

    #[test]
    fn custom_negative_prompt_is_kept() {
        let messages =
            image_prompt_messages(&EventInfo::default(), "post", Some("no people"));
        assert!(messages[1].content.contains("Negative Prompt: no people"));
        assert!(messages[0].content.contains("named the way Databricks names them"));
    }
}
