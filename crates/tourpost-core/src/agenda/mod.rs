mod store;

pub use store::AgendaStore;

use crate::error::{Result, TourpostError};
use crate::time::{parse_zone, LocalTime};
use crate::types::{Session, SessionId};
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Every agenda slot lasts at least this long.
pub const MIN_SESSION_MINUTES: i64 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub name: String,
    /// Company running the event; used to scope image topics and link searches.
    pub organizer: String,
    pub city: String,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            name: "Data + AI World Tour 2024".to_string(),
            organizer: "Databricks".to_string(),
            city: "Atlanta".to_string(),
        }
    }
}

/// A validated, immutable conference agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agenda {
    pub event: EventInfo,
    /// The single day the agenda covers, when known.
    pub date: Option<NaiveDate>,
    /// Offset the session times are written in, when known.
    #[serde(skip)]
    pub utc_offset: Option<FixedOffset>,
    pub sessions: Vec<Session>,
}

/// On-disk shape: either a full document or a bare session list.
#[derive(Deserialize)]
#[serde(untagged)]
enum AgendaDocument {
    Full(AgendaFile),
    Sessions(Vec<Session>),
}

#[derive(Deserialize)]
struct AgendaFile {
    #[serde(default)]
    event: EventInfo,
    #[serde(default)]
    date: Option<NaiveDate>,
    /// Zone abbreviation or numeric offset, e.g. `EDT` or `-04:00`.
    #[serde(default)]
    timezone: Option<String>,
    sessions: Vec<Session>,
}

impl Agenda {
    /// Build and validate an agenda. Sessions keep the given order, which is
    /// the order every tie-break uses.
    pub fn new(event: EventInfo, sessions: Vec<Session>) -> Result<Self> {
        let agenda = Self {
            event,
            date: None,
            utc_offset: None,
            sessions,
        };
        agenda.validate()?;
        Ok(agenda)
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: AgendaDocument = serde_json::from_str(json)
            .map_err(|e| TourpostError::malformed(None, format!("unreadable agenda: {}", e)))?;

        let agenda = match doc {
            AgendaDocument::Sessions(sessions) => Self {
                event: EventInfo::default(),
                date: None,
                utc_offset: None,
                sessions,
            },
            AgendaDocument::Full(file) => {
                let utc_offset = match file.timezone.as_deref() {
                    None => None,
                    Some(label) => Some(parse_zone(label).ok_or_else(|| {
                        TourpostError::malformed(None, format!("unknown timezone '{}'", label))
                    })?),
                };
                Self {
                    event: file.event,
                    date: file.date,
                    utc_offset,
                    sessions: file.sessions,
                }
            }
        };

        agenda.validate()?;
        Ok(agenda)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let agenda = Self::from_json_str(&raw)?;
        log::debug!(
            "Loaded agenda '{}' from {}: {} sessions",
            agenda.event.name,
            path.display(),
            agenda.sessions.len()
        );
        Ok(agenda)
    }

    /// Reject agendas the resolver cannot reason about.
    pub fn validate(&self) -> Result<()> {
        let min = TimeDelta::minutes(MIN_SESSION_MINUTES);
        let mut seen: HashSet<&str> = HashSet::new();

        for session in &self.sessions {
            let id = session.id.as_str();
            if id.trim().is_empty() {
                return Err(TourpostError::malformed(
                    None,
                    format!("session '{}' has an empty id", session.title),
                ));
            }
            if session.title.trim().is_empty() {
                return Err(TourpostError::malformed(Some(id), "empty title"));
            }
            if !seen.insert(id) {
                return Err(TourpostError::malformed(Some(id), "duplicate session id"));
            }
            if session.end_time <= session.start_time {
                return Err(TourpostError::malformed(
                    Some(id),
                    format!(
                        "end {} is not after start {}",
                        session.end_time.format("%H:%M"),
                        session.start_time.format("%H:%M")
                    ),
                ));
            }
            if session.duration() < min {
                return Err(TourpostError::malformed(
                    Some(id),
                    format!(
                        "lasts {} minutes, shorter than the {} minute minimum",
                        session.duration().num_minutes(),
                        MIN_SESSION_MINUTES
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Sessions running at `time`, in agenda order.
    pub fn sessions_at(&self, time: NaiveTime) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(move |s| s.contains(time))
    }

    /// Distinct topic tags in first-seen order.
    pub fn known_topics(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.sessions
            .iter()
            .flat_map(|s| s.topics.iter())
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(String::as_str)
            .collect()
    }

    /// Place a caller's time on this agenda's timeline.
    ///
    /// A stated offset is converted into the agenda's offset. A dated input
    /// is converted as a full instant and must land on the agenda's date. An
    /// undated input that wraps past midnight once converted is rejected.
    /// When the agenda declares no offset its times are taken as written, so
    /// a caller's offset cannot be applied and only the clock time is used.
    pub fn localize(&self, local: &LocalTime) -> Result<NaiveTime> {
        let (time, date) = match (local.offset, self.utc_offset) {
            (Some(from), Some(to)) => match local.date {
                Some(date) => {
                    let instant = date
                        .and_time(local.time)
                        .and_local_timezone(from)
                        .single()
                        .ok_or_else(|| {
                            TourpostError::invalid_time(local.to_string(), "ambiguous local time")
                        })?
                        .with_timezone(&to);
                    (instant.time(), Some(instant.date_naive()))
                }
                None => {
                    let shift = i64::from(to.local_minus_utc() - from.local_minus_utc());
                    let (shifted, wrapped) =
                        local.time.overflowing_add_signed(TimeDelta::seconds(shift));
                    if wrapped != 0 {
                        return Err(TourpostError::invalid_time(
                            local.to_string(),
                            "not on the agenda's reference day once converted to the agenda's time zone",
                        ));
                    }
                    (shifted, None)
                }
            },
            (Some(_), None) => {
                log::debug!(
                    "Agenda has no time zone; using {} as agenda time",
                    local.time.format("%H:%M")
                );
                (local.time, local.date)
            }
            (None, _) => (local.time, local.date),
        };

        if let (Some(date), Some(agenda_date)) = (date, self.date) {
            if date != agenda_date {
                return Err(TourpostError::invalid_time(
                    local.to_string(),
                    format!("not on the agenda's reference day ({})", agenda_date),
                ));
            }
        }

        Ok(time)
    }

    /// Compact JSON of the sessions, embedded in generation prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(&self.sessions).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    const DOC: &str = r#"{
        "event": { "name": "World Tour", "organizer": "Databricks", "city": "Atlanta" },
        "date": "2024-10-24",
        "timezone": "EDT",
        "sessions": [
            { "id": "k1", "title": "AI Keynote", "start": "09:00", "end": "09:50", "topics": ["AI"] },
            { "id": "g1", "title": "Data Governance", "start": "09:30", "end": "10:10", "topics": ["Governance", "ai"] }
        ]
    }"#;

    #[test]
    fn loads_full_document() {
        let agenda = Agenda::from_json_str(DOC).unwrap();
        assert_eq!(agenda.len(), 2);
        assert_eq!(agenda.event.city, "Atlanta");
        assert_eq!(agenda.utc_offset, FixedOffset::west_opt(4 * 3600));
        assert_eq!(agenda.date, NaiveDate::from_ymd_opt(2024, 10, 24));
        assert_eq!(agenda.known_topics(), vec!["AI", "Governance"]);
    }

    #[test]
    fn loads_bare_session_list() {
        let agenda = Agenda::from_json_str(
            r#"[{ "id": "a", "title": "A", "start": "10:00", "end": "10:45" }]"#,
        )
        .unwrap();
        assert_eq!(agenda.event, EventInfo::default());
        assert!(agenda.sessions[0].topics.is_empty());
    }

    #[test]
    fn rejects_inverted_window() {
        let err = Agenda::from_json_str(
            r#"[{ "id": "bad", "title": "Backwards", "start": "11:00", "end": "10:00" }]"#,
        )
        .unwrap_err();
        match err {
            TourpostError::MalformedAgenda { session, .. } => assert_eq!(session.as_deref(), Some("bad")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn rejects_short_duplicate_and_blank_sessions() {
        let short = Session::new("s", "Lightning", t(10, 0), t(10, 30), &[]);
        assert!(Agenda::new(EventInfo::default(), vec![short]).is_err());

        let a = Session::new("dup", "One", t(10, 0), t(10, 40), &[]);
        let b = Session::new("dup", "Two", t(11, 0), t(11, 40), &[]);
        assert!(Agenda::new(EventInfo::default(), vec![a, b]).is_err());

        let blank = Session::new("x", " ", t(10, 0), t(10, 40), &[]);
        assert!(Agenda::new(EventInfo::default(), vec![blank]).is_err());

        let exact = Session::new("ok", "Exactly forty", t(10, 0), t(10, 40), &[]);
        assert!(Agenda::new(EventInfo::default(), vec![exact]).is_ok());
    }

    #[test]
    fn rejects_unreadable_json_as_malformed() {
        assert!(matches!(
            Agenda::from_json_str("{ nope"),
            Err(TourpostError::MalformedAgenda { .. })
        ));
        assert!(matches!(
            Agenda::from_json_str(r#"[{ "id": "a", "title": "A", "start": "ten", "end": "11:00" }]"#),
            Err(TourpostError::MalformedAgenda { .. })
        ));
    }

    #[test]
    fn localize_converts_offsets() {
        let agenda = Agenda::from_json_str(DOC).unwrap();

        let same = LocalTime::parse("09:40 EDT").unwrap();
        assert_eq!(agenda.localize(&same).unwrap(), t(9, 40));

        let utc = LocalTime::parse("13:40 UTC").unwrap();
        assert_eq!(agenda.localize(&utc).unwrap(), t(9, 40));

        let bare = LocalTime::parse("09:40").unwrap();
        assert_eq!(agenda.localize(&bare).unwrap(), t(9, 40));
    }

    #[test]
    fn localize_rejects_other_days() {
        let agenda = Agenda::from_json_str(DOC).unwrap();

        let rolled = LocalTime::parse("02:00 UTC").unwrap();
        assert!(matches!(
            agenda.localize(&rolled),
            Err(TourpostError::InvalidTimeInput { .. })
        ));

        let other_day = LocalTime::parse("2024-10-25T09:40:00-04:00").unwrap();
        assert!(matches!(
            agenda.localize(&other_day),
            Err(TourpostError::InvalidTimeInput { .. })
        ));

        let right_day = LocalTime::parse("2024-10-24T09:40:00-04:00").unwrap();
        assert_eq!(agenda.localize(&right_day).unwrap(), t(9, 40));
    }

    #[test]
    fn dated_input_crossing_midnight_converts_as_an_instant() {
        let agenda = Agenda::from_json_str(DOC).unwrap();

        // 01:00 UTC on the 25th is 21:00 EDT on the 24th.
        let late_utc = LocalTime::parse("2024-10-25T01:00:00Z").unwrap();
        assert_eq!(agenda.localize(&late_utc).unwrap(), t(21, 0));

        // 00:30 at -03:00 on the 25th is 23:30 EDT on the 24th.
        let late_west = LocalTime::parse("2024-10-25T00:30:00-03:00").unwrap();
        assert_eq!(agenda.localize(&late_west).unwrap(), t(23, 30));

        // 23:30 at -06:00 on the 24th is 01:30 EDT on the 25th.
        let next_day = LocalTime::parse("2024-10-24T23:30:00-06:00").unwrap();
        assert!(matches!(
            agenda.localize(&next_day),
            Err(TourpostError::InvalidTimeInput { .. })
        ));

        // 03:00 at +05:00 on the 25th is 18:00 EDT on the 24th.
        let from_east = LocalTime::parse("2024-10-25T03:00:00+05:00").unwrap();
        assert_eq!(agenda.localize(&from_east).unwrap(), t(18, 0));
    }

    #[test]
    fn dated_input_against_agenda_without_date() {
        let mut agenda = Agenda::from_json_str(DOC).unwrap();
        agenda.date = None;

        let any_day = LocalTime::parse("2030-01-01T13:40:00Z").unwrap();
        assert_eq!(agenda.localize(&any_day).unwrap(), t(9, 40));

        let crossing = LocalTime::parse("2030-01-02T01:00:00Z").unwrap();
        assert_eq!(agenda.localize(&crossing).unwrap(), t(21, 0));
    }

    #[test]
    fn agenda_without_zone_takes_clock_time_as_written() {
        let agenda = Agenda::from_json_str(
            r#"[{ "id": "a", "title": "A", "start": "09:00", "end": "10:00" }]"#,
        )
        .unwrap();
        assert!(agenda.utc_offset.is_none());

        let with_offset = LocalTime::parse("09:40 UTC").unwrap();
        assert_eq!(agenda.localize(&with_offset).unwrap(), t(9, 40));

        let dated = LocalTime::parse("2024-10-24T09:40:00-04:00").unwrap();
        assert_eq!(agenda.localize(&dated).unwrap(), t(9, 40));
    }
}
