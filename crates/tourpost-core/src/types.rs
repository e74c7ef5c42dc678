use crate::error::{Result, TourpostError};
use crate::time::LocalTime;
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic tags that mark a session as an AI session. Compared case-insensitively.
pub const AI_TOPIC_TAGS: &[&str] = &["AI", "Mosaic AI", "GenAI", "Generative AI"];

/// Agenda session identifier, e.g. `sess-12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One agenda slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Display name shown to attendees.
    pub title: String,

    /// Start of the slot on the agenda's timeline (inclusive).
    #[serde(rename = "start", with = "hhmm")]
    pub start_time: NaiveTime,

    /// End of the slot (exclusive).
    #[serde(rename = "end", with = "hhmm")]
    pub end_time: NaiveTime,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speakers: Vec<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
        topics: &[&str],
    ) -> Self {
        Self {
            id: SessionId::new(id),
            title: title.into(),
            start_time,
            end_time,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            description: None,
            room: None,
            speakers: Vec::new(),
        }
    }

    /// Whether `time` falls inside `[start_time, end_time)`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn has_topic(&self, name: &str) -> bool {
        let needle = normalize(name);
        self.topics.iter().any(|t| normalize(t) == needle)
    }

    pub fn is_ai_topic(&self) -> bool {
        AI_TOPIC_TAGS.iter().any(|tag| self.has_topic(tag))
    }

    /// A mention names this session when it equals one of its topic tags,
    /// its id, or its title.
    pub fn matches_mention(&self, mention: &str) -> bool {
        let needle = normalize(mention);
        if needle.is_empty() {
            return false;
        }
        self.has_topic(&needle)
            || normalize(self.id.as_str()) == needle
            || normalize(&self.title) == needle
    }

    /// `09:00–09:50`
    pub fn window_label(&self) -> String {
        format!(
            "{}–{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The attendee's role. Carried into prompts; has no effect on matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Attendee,
    Organizer,
    Presenter,
}

impl FromStr for Role {
    type Err = TourpostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "attendee" => Ok(Role::Attendee),
            "organizer" | "organiser" => Ok(Role::Organizer),
            "presenter" => Ok(Role::Presenter),
            _ => Err(TourpostError::UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Attendee => "attendee",
            Role::Organizer => "organizer",
            Role::Presenter => "presenter",
        })
    }
}

/// Why a session was (or was not) chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    /// The user's text named a topic or session.
    ExplicitMention,
    /// Several sessions were running; an AI session won.
    AiPriorityOverlap,
    /// One running session, or the earliest-listed of several non-AI ones.
    SingleOverlap,
    NoOverlap,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::ExplicitMention => "explicit-mention",
            MatchReason::AiPriorityOverlap => "ai-priority-overlap",
            MatchReason::SingleOverlap => "single-overlap",
            MatchReason::NoOverlap => "no-overlap",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub local_time: LocalTime,
    #[serde(default)]
    pub mentioned_topics: Vec<String>,
    #[serde(default)]
    pub role: Role,
}

impl Query {
    pub fn new(local_time: LocalTime) -> Self {
        Self {
            local_time,
            mentioned_topics: Vec::new(),
            role: Role::default(),
        }
    }

    pub fn with_mentions<I, S>(mut self, mentions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mentioned_topics = mentions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// The decided current session (or none) plus the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(rename = "matched_session_id")]
    pub matched_session: Option<SessionId>,
    pub reason: MatchReason,
}

impl Resolution {
    pub fn matched(session: &Session, reason: MatchReason) -> Self {
        Self {
            matched_session: Some(session.id.clone()),
            reason,
        }
    }

    pub fn none() -> Self {
        Self {
            matched_session: None,
            reason: MatchReason::NoOverlap,
        }
    }
}

/// Serde for `HH:MM` session times. `HH:MM:SS` is accepted on input.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(|_| serde::de::Error::custom(format!("invalid session time '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let s = Session::new("s1", "Keynote", t(9, 0), t(9, 50), &["AI"]);
        assert!(s.contains(t(9, 0)));
        assert!(s.contains(t(9, 49)));
        assert!(!s.contains(t(9, 50)));
        assert!(!s.contains(t(8, 59)));
        assert_eq!(s.duration(), TimeDelta::minutes(50));
    }

    #[test]
    fn ai_tag_detection_ignores_case() {
        let ai = Session::new("s1", "Deep Dive", t(13, 30), t(14, 20), &["mosaic ai"]);
        let genai = Session::new("s2", "Agents", t(13, 30), t(14, 20), &["GenAI"]);
        let gov = Session::new("s3", "Governance", t(13, 30), t(14, 20), &["Governance", "Data"]);
        assert!(ai.is_ai_topic());
        assert!(genai.is_ai_topic());
        assert!(!gov.is_ai_topic());
    }

    #[test]
    fn mentions_match_topic_id_or_title() {
        let s = Session::new("sess-12", "Mosaic AI Deep Dive", t(13, 30), t(14, 20), &["AI", "GenAI"]);
        assert!(s.matches_mention("genai"));
        assert!(s.matches_mention("SESS-12"));
        assert!(s.matches_mention("mosaic  ai deep dive"));
        assert!(!s.matches_mention("Mosaic"));
        assert!(!s.matches_mention("  "));
    }

    #[test]
    fn session_json_shape() {
        let json = r#"{ "id": "sess-12", "title": "Mosaic AI Deep Dive", "start": "13:30", "end": "14:20", "topics": ["AI", "GenAI"] }"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.start_time, t(13, 30));
        assert_eq!(s.end_time, t(14, 20));
        assert_eq!(s.id.as_str(), "sess-12");

        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["start"], "13:30");
        assert!(back.get("room").is_none());
    }

    #[test]
    fn resolution_json_shape() {
        let r = Resolution {
            matched_session: Some(SessionId::new("sess-12")),
            reason: MatchReason::AiPriorityOverlap,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "matched_session_id": "sess-12", "reason": "ai-priority-overlap" })
        );
        let none = serde_json::to_value(Resolution::none()).unwrap();
        assert_eq!(none["matched_session_id"], serde_json::Value::Null);
        assert_eq!(none["reason"], "no-overlap");
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Presenter".parse::<Role>().unwrap(), Role::Presenter);
        assert_eq!(" organizer ".parse::<Role>().unwrap(), Role::Organizer);
        assert!(matches!("keynoter".parse::<Role>(), Err(TourpostError::UnknownRole(_))));
        assert_eq!(Role::Attendee.to_string(), "attendee");
    }

    #[test]
    fn query_deserializes_conceptual_input() {
        let q: Query = serde_json::from_str(
            r#"{ "local_time": "13:45 EDT", "mentioned_topics": ["AI"], "role": "attendee" }"#,
        )
        .unwrap();
        assert_eq!(q.local_time.time, t(13, 45));
        assert_eq!(q.mentioned_topics, vec!["AI".to_string()]);
        assert_eq!(q.role, Role::Attendee);
    }

    #[test]
    fn dated_query_survives_serde() {
        let q = Query::new(LocalTime::parse("2024-10-24T13:45:00-04:00").unwrap())
            .with_mentions(["Governance"])
            .with_role(Role::Presenter);
        let json = serde_json::to_string(&q).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
        assert!(json.contains("2024-10-24T13:45:00-04:00"));
    }
}
