//! Session-overlap resolution: which agenda session is "current" for a post.
//!
//! Rules, in order:
//!
//! 1. If the user named topics or sessions and any session matches them, the
//!    user's choice wins. Among the matches, one running at the query time is
//!    preferred; otherwise the first match in agenda order.
//! 2. Otherwise, sessions running at the query time (`[start, end)`) are
//!    considered. None: no match. One: that session. Several: the first AI
//!    session in agenda order, or the first listed session when none is AI.
//!
//! Resolution is a pure function of the query and the agenda.

use crate::agenda::{Agenda, AgendaStore};
use crate::error::Result;
use crate::types::{MatchReason, Query, Resolution, Session};
use chrono::NaiveTime;
use serde::Serialize;
use std::sync::Arc;

/// Decide the current session for `query`.
///
/// Fails only with `InvalidTimeInput` when the query time cannot be placed
/// on the agenda's day.
pub fn resolve(query: &Query, agenda: &Agenda) -> Result<Resolution> {
    let time = agenda.localize(&query.local_time)?;
    Ok(resolve_at(time, &query.mentioned_topics, agenda))
}

/// Resolution on an already-localized time.
pub fn resolve_at(time: NaiveTime, mentioned_topics: &[String], agenda: &Agenda) -> Resolution {
    let resolution = decide(time, mentioned_topics, agenda);
    log::debug!(
        "Resolved {} (mentions {:?}) to {:?} via {}",
        time.format("%H:%M"),
        mentioned_topics,
        resolution.matched_session,
        resolution.reason
    );
    resolution
}

fn decide(time: NaiveTime, mentioned_topics: &[String], agenda: &Agenda) -> Resolution {
    let mentions: Vec<&str> = mentioned_topics
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();

    if !mentions.is_empty() {
        let explicit: Vec<&Session> = agenda
            .sessions
            .iter()
            .filter(|s| mentions.iter().any(|m| s.matches_mention(m)))
            .collect();

        if let Some(first) = explicit.first() {
            let chosen = explicit
                .iter()
                .find(|s| s.contains(time))
                .unwrap_or(first);
            return Resolution::matched(chosen, MatchReason::ExplicitMention);
        }
    }

    let overlapping: Vec<&Session> = agenda.sessions_at(time).collect();
    match overlapping.as_slice() {
        [] => Resolution::none(),
        [only] => Resolution::matched(only, MatchReason::SingleOverlap),
        [first, ..] => match overlapping.iter().find(|s| s.is_ai_topic()) {
            Some(ai) => Resolution::matched(ai, MatchReason::AiPriorityOverlap),
            None => Resolution::matched(first, MatchReason::SingleOverlap),
        },
    }
}

/// A resolution together with the session it points at.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub session: Option<Session>,
    /// The query time on the agenda's timeline.
    #[serde(serialize_with = "serialize_hhmm")]
    pub agenda_time: NaiveTime,
}

impl Decision {
    pub fn session_title(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.title.as_str())
    }
}

fn serialize_hhmm<S: serde::Serializer>(time: &NaiveTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&time.format("%H:%M").to_string())
}

/// Resolves queries against whatever agenda the store currently holds.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    store: Arc<AgendaStore>,
}

impl SessionResolver {
    pub fn new(store: Arc<AgendaStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AgendaStore> {
        &self.store
    }

    pub fn resolve(&self, query: &Query) -> Result<Resolution> {
        resolve(query, &self.store.snapshot())
    }

    /// Resolve and attach the matched session from the same agenda snapshot.
    pub fn decide(&self, query: &Query) -> Result<Decision> {
        let agenda = self.store.snapshot();
        decide_on(query, &agenda)
    }
}

pub fn decide_on(query: &Query, agenda: &Agenda) -> Result<Decision> {
    let agenda_time = agenda.localize(&query.local_time)?;
    let resolution = resolve_at(agenda_time, &query.mentioned_topics, agenda);
    let session = resolution
        .matched_session
        .as_ref()
        .and_then(|id| agenda.session(id))
        .cloned();
    Ok(Decision {
        resolution,
        session,
        agenda_time,
    })
}
