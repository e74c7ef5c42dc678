use thiserror::Error;

pub type Result<T> = std::result::Result<T, TourpostError>;

#[derive(Debug, Error)]
pub enum TourpostError {
    /// The agenda cannot be served. Fatal when raised at startup.
    #[error("Malformed agenda{}: {reason}", session_suffix(.session))]
    MalformedAgenda {
        session: Option<String>,
        reason: String,
    },

    /// A query time that cannot be placed on the agenda's timeline.
    #[error("Invalid time input '{input}': {reason}")]
    InvalidTimeInput { input: String, reason: String },

    #[error("Unknown role '{0}' (expected attendee, organizer or presenter)")]
    UnknownRole(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{service} request failed: {reason}")]
    Upstream { service: String, reason: String },

    #[error("Could not parse model output: {0}")]
    ResponseParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn session_suffix(session: &Option<String>) -> String {
    match session {
        Some(id) => format!(" (session '{}')", id),
        None => String::new(),
    }
}

impl TourpostError {
    pub fn malformed(session: Option<&str>, reason: impl Into<String>) -> Self {
        Self::MalformedAgenda {
            session: session.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn invalid_time(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimeInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure was caused by the caller's input rather than by
    /// this process or one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeInput { .. } | Self::UnknownRole(_) | Self::Validation(_)
        )
    }

    /// True when an external collaborator failed or answered with something unusable.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::ResponseParse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_agenda_names_session() {
        let err = TourpostError::malformed(Some("sess-3"), "end_time is not after start_time");
        let msg = err.to_string();
        assert!(msg.contains("sess-3"));
        assert!(msg.contains("end_time"));

        let err = TourpostError::malformed(None, "duplicate ids");
        assert_eq!(err.to_string(), "Malformed agenda: duplicate ids");
    }

    #[test]
    fn error_classes() {
        assert!(TourpostError::invalid_time("25:00", "hour out of range").is_client_error());
        assert!(TourpostError::UnknownRole("speaker".into()).is_client_error());
        assert!(!TourpostError::upstream("chat", "timeout").is_client_error());
        assert!(TourpostError::upstream("chat", "timeout").is_upstream_error());
        assert!(TourpostError::ResponseParse("no post".into()).is_upstream_error());
        assert!(!TourpostError::malformed(None, "x").is_upstream_error());
    }
}
