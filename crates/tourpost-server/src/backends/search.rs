use super::{excerpt, http_client};
use crate::config::SearchConfig;
use async_trait::async_trait;
use tourpost_core::{Result, SearchHit, TourpostError, WebSearch};
use tracing::debug;

const SERVICE: &str = "search";

/// DuckDuckGo's HTML results page. Needs no API key.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        debug!("Searching: {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TourpostError::upstream(SERVICE, e.to_string()))?;
        let status = resp.status();
        let html = resp
            .text()
            .await
            .map_err(|e| TourpostError::upstream(SERVICE, format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(TourpostError::upstream(
                SERVICE,
                format!("{} {}", status, excerpt(&html, 200)),
            ));
        }

        let mut hits = parse_results(&html);
        hits.truncate(self.max_results);
        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }
}

/// Strip markup and decode entities.
fn clean(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    html_escape::decode_html_entities(text.trim()).to_string()
}

/// Result links go through a `/l/?uddg=<encoded target>` redirect.
fn resolve_href(href: &str) -> String {
    let href = html_escape::decode_html_entities(href).to_string();
    if let Some(start) = href.find("uddg=") {
        let encoded = &href[start + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(target) = urlencoding::decode(encoded) {
            return target.into_owned();
        }
    }
    if href.starts_with("//") {
        return format!("https:{}", href);
    }
    href
}

/// Contents of the first element in `block` opened at or after `class_pos`,
/// up to the closing `close` tag.
fn inner_after<'a>(block: &'a str, class_pos: usize, close: &str) -> Option<&'a str> {
    let open_end = class_pos + block[class_pos..].find('>')? + 1;
    let len = block[open_end..].find(close)?;
    Some(&block[open_end..open_end + len])
}

fn parse_results(html: &str) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for block in html.split("class=\"result ").skip(1) {
        let Some(title_pos) = block.find("class=\"result__a\"") else {
            continue;
        };
        let Some(href_rel) = block[title_pos..].find("href=\"") else {
            continue;
        };
        let href_start = title_pos + href_rel + 6;
        let Some(href_len) = block[href_start..].find('"') else {
            continue;
        };
        let url = resolve_href(&block[href_start..href_start + href_len]);
        let title = inner_after(block, title_pos, "</a>").map(clean).unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let snippet = block
            .find("class=\"result__snippet\"")
            .and_then(|pos| inner_after(block, pos, "</a>"))
            .map(clean)
            .unwrap_or_default();

        hits.push(SearchHit { title, url, snippet });
    }

    hits
}
