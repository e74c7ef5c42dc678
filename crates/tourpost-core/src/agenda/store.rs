use super::Agenda;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Shared, swappable handle to the agenda in service.
///
/// Readers take a snapshot `Arc<Agenda>` and keep using it for the whole
/// request. A reload builds a complete new agenda and replaces the reference
/// in one step; entries are never mutated in place.
#[derive(Debug)]
pub struct AgendaStore {
    current: RwLock<Arc<Agenda>>,
}

impl AgendaStore {
    pub fn new(agenda: Agenda) -> Self {
        Self {
            current: RwLock::new(Arc::new(agenda)),
        }
    }

    /// Load and validate the agenda at `path`.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        Ok(Self::new(Agenda::load(path)?))
    }

    pub fn snapshot(&self) -> Arc<Agenda> {
        // A poisoned lock still holds a complete agenda: writers only swap the Arc.
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a new agenda, returning the one it replaced.
    pub fn replace(&self, agenda: Agenda) -> Arc<Agenda> {
        let next = Arc::new(agenda);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Re-read `path` and swap it in. On error the current agenda stays.
    pub fn reload(&self, path: impl AsRef<Path>) -> crate::Result<Arc<Agenda>> {
        let agenda = Agenda::load(path)?;
        self.replace(agenda);
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::EventInfo;
    use crate::types::Session;
    use chrono::NaiveTime;
    use std::io::Write;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn agenda(title: &str) -> Agenda {
        Agenda::new(
            EventInfo::default(),
            vec![Session::new("s1", title, t(9, 0), t(9, 50), &["AI"])],
        )
        .unwrap()
    }

    #[test]
    fn snapshots_survive_replacement() {
        let store = AgendaStore::new(agenda("Old"));
        let before = store.snapshot();

        let replaced = store.replace(agenda("New"));
        assert_eq!(replaced.sessions[0].title, "Old");
        assert_eq!(before.sessions[0].title, "Old");
        assert_eq!(store.snapshot().sessions[0].title, "New");
    }

    #[test]
    fn failed_reload_keeps_current_agenda() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "id": "s1", "title": "Broken", "start": "10:00", "end": "09:00" }}]"#
        )
        .unwrap();

        let store = AgendaStore::new(agenda("Keep me"));
        assert!(store.reload(file.path()).is_err());
        assert_eq!(store.snapshot().sessions[0].title, "Keep me");
    }

    #[test]
    fn reload_swaps_in_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "id": "s2", "title": "Fresh", "start": "10:00", "end": "10:45" }}]"#
        )
        .unwrap();

        let store = AgendaStore::new(agenda("Stale"));
        let now = store.reload(file.path()).unwrap();
        assert_eq!(now.sessions[0].title, "Fresh");
    }
}
