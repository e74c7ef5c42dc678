use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tourpost_core::{parse_zone, GenerationSettings, LocalTime};

/// Full configuration, loaded from `tourpost.toml`. Every section is optional.
///
/// Secrets (`chat.api_key`, `image.api_token`, `security.auth_token`) are read
/// from the file or the environment but never serialized back out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TourpostConfig {
    pub server: ServerConfig,
    pub event: EventClockConfig,
    pub chat: ChatConfig,
    pub image: ImageConfig,
    pub search: SearchConfig,
    pub generation: GenerationSettings,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
    pub agenda_path: PathBuf,
    /// Seconds between agenda file checks. 0 disables hot reload.
    pub agenda_reload_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8000".to_string(),
            agenda_path: PathBuf::from("agenda.json"),
            agenda_reload_secs: 0,
        }
    }
}

/// The clock used for "now" when a request does not name a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventClockConfig {
    pub utc_offset: String,
    pub zone_label: String,
}

impl Default for EventClockConfig {
    fn default() -> Self {
        Self {
            utc_offset: "-04:00".to_string(),
            zone_label: "EDT".to_string(),
        }
    }
}

impl EventClockConfig {
    pub fn offset(&self) -> Option<FixedOffset> {
        parse_zone(&self.utc_offset)
    }

    /// Current time at the event. Falls back to UTC on a bad offset, which
    /// `validate` reports.
    pub fn now(&self) -> LocalTime {
        match self.offset() {
            Some(offset) => LocalTime::now_in(offset, &self.zone_label),
            None => LocalTime::now_in(Utc.fix(), "UTC"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// OpenAI-compatible base URL, e.g. a serving-endpoints URL ending in `/serving-endpoints`.
    pub api_base: String,
    /// Model or serving endpoint name.
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            endpoint: String::new(),
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub api_base: String,
    /// `owner/name` of the image model.
    pub model: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.replicate.com/v1".to_string(),
            model: "black-forest-labs/flux-schnell".to_string(),
            api_token: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 10,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub auth_enabled: bool,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
}

impl TourpostConfig {
    /// Parse `path` and apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: TourpostConfig = toml::from_str(&raw)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::debug!("No config at {}, using defaults", path.display());
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment variables win over file values when set and non-empty.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("API_BASE") {
            self.chat.api_base = v;
        }
        if let Some(v) = get("ENDPOINT_NAME") {
            self.chat.endpoint = v;
        }
        if let Some(v) = get("API_KEY") {
            self.chat.api_key = Some(v);
        }
        if let Some(v) = get("IMAGE_MODEL_NAME") {
            self.image.model = v;
        }
        if let Some(v) = get("REPLICATE_API_TOKEN") {
            self.image.api_token = Some(v);
        }
        if let Some(v) = get("TOURPOST_AUTH_TOKEN") {
            self.security.auth_token = Some(v);
        }
    }

    pub fn http_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .http_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid server.http_addr '{}': {}", self.server.http_addr, e))
    }

    /// Structural problems that make the configuration unusable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.http_addr() {
            errors.push(e.to_string());
        }
        if self.event.offset().is_none() {
            errors.push(format!(
                "event.utc_offset '{}' is not a UTC offset or known zone",
                self.event.utc_offset
            ));
        }
        if self.chat.timeout_secs == 0 {
            errors.push("chat.timeout_secs must be positive".to_string());
        }
        if self.image.timeout_secs == 0 {
            errors.push("image.timeout_secs must be positive".to_string());
        }
        if self.search.max_results == 0 {
            errors.push("search.max_results must be positive".to_string());
        }
        for url in [&self.image.api_base, &self.search.endpoint] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("'{}' is not an http(s) URL", url));
            }
        }
        if !self.chat.api_base.is_empty()
            && !self.chat.api_base.starts_with("http://")
            && !self.chat.api_base.starts_with("https://")
        {
            errors.push(format!("chat.api_base '{}' is not an http(s) URL", self.chat.api_base));
        }
        if self.security.auth_enabled && self.security.auth_token.is_none() {
            errors.push(
                "[security] auth_enabled = true but no token found. \
                 Set TOURPOST_AUTH_TOKEN or auth_token in [security]."
                    .to_string(),
            );
        }
        errors.extend(self.generation.validate());
        errors
    }

    /// Missing collaborator settings. The server still starts; the affected
    /// routes fail with an upstream error until they are provided.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.chat.api_base.is_empty() {
            warnings.push("chat.api_base is not set (API_BASE); post generation is unavailable".to_string());
        }
        if self.chat.endpoint.is_empty() {
            warnings.push("chat.endpoint is not set (ENDPOINT_NAME)".to_string());
        }
        if self.chat.api_key.is_none() {
            warnings.push("chat.api_key is not set (API_KEY)".to_string());
        }
        if self.image.api_token.is_none() {
            warnings.push("image.api_token is not set (REPLICATE_API_TOKEN); image generation is unavailable".to_string());
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TourpostConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.server.http_addr, "0.0.0.0:8000");
        assert_eq!(config.generation.max_tokens, 2000);
        assert_eq!(config.event.offset(), FixedOffset::west_opt(4 * 3600));
        assert_eq!(config.warnings().len(), 4);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nagenda_path = \"/srv/agenda.json\"\n\n[chat]\napi_base = \"https://dbc.example.com/serving-endpoints\"\nendpoint = \"llama-70b\"\napi_key = \"from-file\"\n\n[generation]\nlink_temperature = 0.2"
        )
        .unwrap();

        let config = TourpostConfig::load(file.path()).unwrap();
        assert_eq!(config.server.agenda_path, PathBuf::from("/srv/agenda.json"));
        assert_eq!(config.server.http_addr, "0.0.0.0:8000");
        assert_eq!(config.chat.max_retries, 2);
        assert_eq!(config.generation.link_temperature, 0.2);
        assert_eq!(config.generation.max_tokens, 2000);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("API_BASE", "https://env.example.com"),
            ("API_KEY", "secret"),
            ("ENDPOINT_NAME", "dbrx"),
            ("IMAGE_MODEL_NAME", "owner/model"),
            ("TOURPOST_AUTH_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = TourpostConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.chat.api_base, "https://env.example.com");
        assert_eq!(config.chat.api_key.as_deref(), Some("secret"));
        assert_eq!(config.chat.endpoint, "dbrx");
        assert_eq!(config.image.model, "owner/model");
        assert_eq!(config.security.auth_token, None);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = TourpostConfig::default();
        config.chat.api_key = Some("sk-live".into());
        config.image.api_token = Some("r8-live".into());
        config.security.auth_token = Some("bearer-live".into());
        let shown = toml::to_string_pretty(&config).unwrap();
        assert!(!shown.contains("live"));
        assert!(shown.contains("[chat]"));
    }

    #[test]
    fn validation_reports_each_problem() {
        let mut config = TourpostConfig::default();
        config.server.http_addr = "not-an-addr".into();
        config.event.utc_offset = "Mars/Olympus".into();
        config.security.auth_enabled = true;
        config.search.max_results = 0;
        assert_eq!(config.validate().len(), 4);
    }

    #[test]
    fn event_clock_carries_label() {
        let now = EventClockConfig::default().now();
        assert_eq!(now.zone_label.as_deref(), Some("EDT"));
        assert!(now.date.is_none());
    }
}
