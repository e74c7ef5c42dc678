//! Generation pipelines: resolver and prompts in front, collaborators behind.
//!
//! Each pipeline is constructed once with its collaborators and shared by
//! reference. Nothing here knows which hosted service answers.

use crate::agenda::AgendaStore;
use crate::collaborators::{
    render_hits, ChatRequest, GeneratedImage, ImageGenerator, TextGenerator, WebSearch,
};
use crate::error::{Result, TourpostError};
use crate::mention::extract_mentions;
use crate::output::{extract_json_array, normalize_links, parse_image_prompt_output, parse_post_output};
use crate::prompt::{
    image_prompt_messages, link_extraction_messages, link_search_query, post_messages,
    PostPromptInput,
};
use crate::resolver::{decide_on, SessionResolver};
use crate::time::LocalTime;
use crate::types::{Query, Resolution, Role};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Sampling knobs for every model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub base_temperature: f32,
    /// Each call adds `k / 10000` to the base temperature, `k` uniform in `1..=jitter_steps`.
    pub jitter_steps: u32,
    /// Link extraction wants the model close to deterministic.
    pub link_temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            base_temperature: 0.7,
            jitter_steps: 100,
            link_temperature: 0.1,
        }
    }
}

impl GenerationSettings {
    /// Temperature for one creative call, rounded to four decimals.
    pub fn sampled_temperature<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let jitter = if self.jitter_steps == 0 {
            0
        } else {
            rng.gen_range(1..=self.jitter_steps)
        };
        let t = f64::from(self.base_temperature) + f64::from(jitter) / 10_000.0;
        ((t * 10_000.0).round() / 10_000.0) as f32
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_tokens == 0 {
            errors.push("generation.max_tokens must be positive".to_string());
        }
        if !(0.0..=2.0).contains(&self.base_temperature) {
            errors.push(format!(
                "generation.base_temperature must be within 0.0..=2.0, got {}",
                self.base_temperature
            ));
        }
        if !(0.0..=2.0).contains(&self.link_temperature) {
            errors.push(format!(
                "generation.link_temperature must be within 0.0..=2.0, got {}",
                self.link_temperature
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRequest {
    pub user_post: String,
    #[serde(default)]
    pub role: Role,
    pub site: String,
    /// When absent, the caller's "now" is used.
    #[serde(default)]
    pub local_time: Option<LocalTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPost {
    pub id: Uuid,
    pub post: String,
    pub rationale: String,
    pub resolution: Resolution,
    pub current_session_title: Option<String>,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

pub struct PostGenerator {
    resolver: SessionResolver,
    text: Arc<dyn TextGenerator>,
    settings: GenerationSettings,
}

impl PostGenerator {
    pub fn new(
        resolver: SessionResolver,
        text: Arc<dyn TextGenerator>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            resolver,
            text,
            settings,
        }
    }

    pub async fn generate(&self, request: &PostRequest, now: LocalTime) -> Result<GeneratedPost> {
        if request.user_post.trim().is_empty() {
            return Err(TourpostError::Validation("user_post must not be empty".into()));
        }
        if request.site.trim().is_empty() {
            return Err(TourpostError::Validation("social media site must not be empty".into()));
        }

        let agenda = self.resolver.store().snapshot();
        let local_time = request.local_time.clone().unwrap_or(now);
        let mentions = extract_mentions(&request.user_post, &agenda);
        let query = Query::new(local_time.clone())
            .with_mentions(mentions)
            .with_role(request.role);
        let decision = decide_on(&query, &agenda)?;

        let messages = post_messages(PostPromptInput {
            agenda: &agenda,
            local_time: &local_time,
            user_post: &request.user_post,
            role: request.role,
            site: request.site.trim(),
            decision: &decision,
        });
        let temperature = self.settings.sampled_temperature(&mut rand::thread_rng());
        let completion = self
            .text
            .complete(ChatRequest {
                messages,
                max_tokens: self.settings.max_tokens,
                temperature,
            })
            .await?;

        let parsed = parse_post_output(&completion.content)?;
        let model = if completion.model.trim().is_empty() {
            self.text.model_name().to_string()
        } else {
            completion.model
        };
        log::debug!(
            "Generated post for {} at {} with {} (session {:?}, temperature {})",
            request.role,
            local_time,
            model,
            decision.session_title(),
            temperature
        );

        Ok(GeneratedPost {
            id: Uuid::now_v7(),
            post: parsed.post,
            rationale: parsed.rationale,
            current_session_title: decision.session_title().map(str::to_string),
            resolution: decision.resolution,
            model,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePromptResult {
    pub extracted_topics: String,
    pub flux_prompt: String,
}

pub struct ImagePromptGenerator {
    store: Arc<AgendaStore>,
    text: Arc<dyn TextGenerator>,
    settings: GenerationSettings,
}

impl ImagePromptGenerator {
    pub fn new(store: Arc<AgendaStore>, text: Arc<dyn TextGenerator>, settings: GenerationSettings) -> Self {
        Self { store, text, settings }
    }

    pub async fn generate(&self, user_post: &str, negative_prompt: Option<&str>) -> Result<ImagePromptResult> {
        if user_post.trim().is_empty() {
            return Err(TourpostError::Validation("user_post must not be empty".into()));
        }
        let event = self.store.snapshot().event.clone();
        let messages = image_prompt_messages(&event, user_post, negative_prompt);
        let temperature = self.settings.sampled_temperature(&mut rand::thread_rng());
        let completion = self
            .text
            .complete(ChatRequest {
                messages,
                max_tokens: self.settings.max_tokens,
                temperature,
            })
            .await?;

        let parsed = parse_image_prompt_output(&completion.content)?;
        Ok(ImagePromptResult {
            extracted_topics: parsed.extracted_topics,
            flux_prompt: parsed.image_prompt,
        })
    }
}

pub struct ImageService {
    images: Arc<dyn ImageGenerator>,
}

impl ImageService {
    pub fn new(images: Arc<dyn ImageGenerator>) -> Self {
        Self { images }
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TourpostError::Validation("image prompt must not be empty".into()));
        }
        self.images.generate(prompt).await
    }
}

/// Recommends reading links for a set of topics.
pub struct LinkFinder {
    store: Arc<AgendaStore>,
    search: Arc<dyn WebSearch>,
    text: Arc<dyn TextGenerator>,
    settings: GenerationSettings,
}

impl LinkFinder {
    pub fn new(
        store: Arc<AgendaStore>,
        search: Arc<dyn WebSearch>,
        text: Arc<dyn TextGenerator>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            search,
            text,
            settings,
        }
    }

    pub async fn find(&self, topics: &str) -> Result<Vec<String>> {
        if topics.trim().is_empty() {
            return Err(TourpostError::Validation("topics must not be empty".into()));
        }
        let event = self.store.snapshot().event.clone();
        let query = link_search_query(&event, topics);
        let hits = self.search.search(&query).await?;
        if hits.is_empty() {
            log::debug!("No search results for '{}'", query);
            return Ok(Vec::new());
        }

        let completion = self
            .text
            .complete(ChatRequest {
                messages: link_extraction_messages(&render_hits(&hits)),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.link_temperature,
            })
            .await?;

        let links = normalize_links(extract_json_array(&completion.content)?);
        log::debug!("Extracted {} links from {} search results", links.len(), hits.len());
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sampled_temperature_stays_in_jitter_band() {
        let settings = GenerationSettings::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let t = settings.sampled_temperature(&mut rng);
            assert!(t > 0.7 && t <= 0.7101, "temperature {} out of range", t);
            let scaled = f64::from(t) * 10_000.0;
            assert!((scaled - scaled.round()).abs() < 0.05);
        }
    }

    #[test]
    fn zero_jitter_is_base() {
        let settings = GenerationSettings {
            jitter_steps: 0,
            ..GenerationSettings::default()
        };
        assert_eq!(settings.sampled_temperature(&mut rand::thread_rng()), 0.7);
    }

    #[test]
    fn settings_validation() {
        assert!(GenerationSettings::default().validate().is_empty());
        let bad = GenerationSettings {
            max_tokens: 0,
            base_temperature: 3.0,
            ..GenerationSettings::default()
        };
        assert_eq!(bad.validate().len(), 2);
    }
}
