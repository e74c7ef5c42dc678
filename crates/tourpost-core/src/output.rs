//! Reading structured fields back out of free-text model output.

use crate::error::{Result, TourpostError};
use crate::prompt::{EXTRACTED_TOPICS_FIELD, IMAGE_PROMPT_FIELD, POST_FIELD, RATIONALE_FIELD};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Split `text` into the labelled fields named in `names`.
///
/// A field starts at a line beginning with `Name:` (any case, optionally
/// wrapped in markdown bold or preceded by heading/quote markers) and runs to
/// the next known label. Keys in the result are the names as given. When a
/// label repeats, the first occurrence wins.
pub fn parse_fields(text: &str, names: &[&str]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if names.is_empty() {
        return out;
    }

    let alternatives = names
        .iter()
        .map(|n| regex::escape(n.trim()).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"^[ \t>#*_]*({})[ \t*_]*:[ \t*_]*", alternatives);
    let re = match RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            log::warn!("Unusable field labels {:?}: {}", names, e);
            return out;
        }
    };

    let labels: Vec<(usize, usize, &str)> = re
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?.as_str();
            Some((whole.start(), whole.end(), label))
        })
        .collect();

    for (i, (_, value_start, label)) in labels.iter().enumerate() {
        let value_end = labels.get(i + 1).map_or(text.len(), |next| next.0);
        let Some(name) = names.iter().find(|n| same_label(n, label)) else {
            continue;
        };
        out.entry(name.to_string())
            .or_insert_with(|| text[*value_start..value_end].trim().to_string());
    }
    out
}

fn same_label(a: &str, b: &str) -> bool {
    let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    squash(a) == squash(b)
}

/// First non-empty line, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutput {
    pub rationale: String,
    /// Single line; anything the model wrote after the first line is dropped.
    pub post: String,
}

/// Parse a post completion. If the model ignored the labels entirely, the
/// first line of the reply is taken as the post.
pub fn parse_post_output(text: &str) -> Result<PostOutput> {
    let mut fields = parse_fields(text, &[RATIONALE_FIELD, POST_FIELD]);
    let rationale = fields.remove(RATIONALE_FIELD).unwrap_or_default();
    let post = match fields.remove(POST_FIELD) {
        Some(post) => first_line(&post).to_string(),
        None if rationale.is_empty() => first_line(text).to_string(),
        None => String::new(),
    };

    if post.is_empty() {
        return Err(TourpostError::ResponseParse(format!(
            "no '{}' field in model output",
            POST_FIELD
        )));
    }
    Ok(PostOutput { rationale, post })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePromptOutput {
    pub extracted_topics: String,
    pub image_prompt: String,
}

pub fn parse_image_prompt_output(text: &str) -> Result<ImagePromptOutput> {
    let mut fields = parse_fields(text, &[EXTRACTED_TOPICS_FIELD, IMAGE_PROMPT_FIELD]);
    let image_prompt = fields
        .remove(IMAGE_PROMPT_FIELD)
        .map(|p| first_line(&p).to_string())
        .unwrap_or_default();
    if image_prompt.is_empty() {
        return Err(TourpostError::ResponseParse(format!(
            "no '{}' field in model output",
            IMAGE_PROMPT_FIELD
        )));
    }
    let extracted_topics = fields
        .remove(EXTRACTED_TOPICS_FIELD)
        .map(|t| first_line(&t).to_string())
        .unwrap_or_default();
    Ok(ImagePromptOutput {
        extracted_topics,
        image_prompt,
    })
}

/// Parse the JSON array between the first `[` and the last `]` of `text`.
/// Tolerates prose or code fences around the array.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(TourpostError::ResponseParse(
            "no JSON array in model output".to_string(),
        ));
    };
    if end < start {
        return Err(TourpostError::ResponseParse(
            "no JSON array in model output".to_string(),
        ));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| TourpostError::ResponseParse(format!("bad JSON array: {}", e)))
}

/// Keep URL strings and objects carrying a `link` or `url` string, dropping
/// blanks and repeats while preserving order.
pub fn normalize_links(values: Vec<Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Object(mut map) => match map.remove("link").or_else(|| map.remove("url")) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_tolerate_markdown_and_case() {
        let text = "**Rationale:** upbeat, short\nmentions the keynote\n\n## post: Loving the #AI keynote!\nSecond line";
        let fields = parse_fields(text, &[RATIONALE_FIELD, POST_FIELD]);
        assert_eq!(fields["Rationale"], "upbeat, short\nmentions the keynote");
        assert_eq!(fields["Post"], "Loving the #AI keynote!\nSecond line");
    }

    #[test]
    fn multi_word_labels_and_first_occurrence() {
        let text = "Extracted  Topics: Unity Catalog\nImage Prompt: a glowing catalog\nImage Prompt: ignored";
        let fields = parse_fields(text, &[EXTRACTED_TOPICS_FIELD, IMAGE_PROMPT_FIELD]);
        assert_eq!(fields["Extracted Topics"], "Unity Catalog");
        assert_eq!(fields["Image Prompt"], "a glowing catalog");
    }

    #[test]
    fn post_is_cut_to_one_line() {
        let out = parse_post_output("Rationale: keep it light\nPost:\n  Hello Atlanta! #DataAI\nMore text").unwrap();
        assert_eq!(out.post, "Hello Atlanta! #DataAI");
        assert_eq!(out.rationale, "keep it light");
    }

    #[test]
    fn unlabelled_reply_falls_back_to_first_line() {
        let out = parse_post_output("\nJust a post #AI\nexplanation").unwrap();
        assert_eq!(out.post, "Just a post #AI");
        assert!(out.rationale.is_empty());
    }

    #[test]
    fn missing_post_is_parse_error() {
        assert!(matches!(
            parse_post_output("Rationale: thought about it"),
            Err(TourpostError::ResponseParse(_))
        ));
        assert!(matches!(parse_post_output("Post:   "), Err(TourpostError::ResponseParse(_))));
        assert!(matches!(
            parse_image_prompt_output("Extracted Topics: AI"),
            Err(TourpostError::ResponseParse(_))
        ));
    }

    #[test]
    fn json_array_is_found_inside_prose() {
        let text = "Sure! ```json\n[\"https://a.test\", {\"link\": \"https://b.test\"}]\n```";
        let values = extract_json_array(text).unwrap();
        assert_eq!(values.len(), 2);

        assert!(extract_json_array("no links here").is_err());
        assert!(extract_json_array("] backwards [").is_err());
        assert!(extract_json_array("[not json]").is_err());
    }

    #[test]
    fn links_are_normalized() {
        let links = normalize_links(vec![
            json!("https://a.test"),
            json!({ "title": "B", "url": "https://b.test" }),
            json!({ "link": " https://a.test " }),
            json!(42),
            json!(""),
            json!({ "title": "no link" }),
        ]);
        assert_eq!(links, vec!["https://a.test", "https://b.test"]);
    }
}
