use crate::agenda::EventInfo;
use crate::collaborators::ChatMessage;

/// Web search query for reading material on `topics`.
pub fn link_search_query(event: &EventInfo, topics: &str) -> String {
    let org = event.organizer.to_lowercase();
    format!(
        "{org} blogs and videos related to the following {org} topics {}.",
        topics.trim()
    )
}

/// Chat messages asking the model to pull every link out of rendered
/// search results as a bare JSON array.
pub fn link_extraction_messages(search_results: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("Hello!"),
        ChatMessage::assistant("Hello! How can I assist you today?"),
        ChatMessage::user(format!(
            "Extract all the links from the following search results and return them \
             as a JSON array of strings. Return the JSON array and nothing else.\n\n{}",
            search_results
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ChatRole;

    #[test]
    fn query_is_scoped_to_organizer() {
        let q = link_search_query(&EventInfo::default(), " Unity Catalog, Mosaic AI ");
        assert_eq!(
            q,
            "databricks blogs and videos related to the following databricks topics Unity Catalog, Mosaic AI."
        );
    }

    #[test]
    fn extraction_prompt_ends_with_results() {
        let messages = link_extraction_messages("[snippet: s, title: t, link: https://x.test]");
        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert!(messages[3].content.ends_with("link: https://x.test]"));
    }
}
