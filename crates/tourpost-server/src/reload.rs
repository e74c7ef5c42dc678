//! Agenda hot reload.

use crate::http::TourpostMetrics;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tourpost_core::AgendaStore;
use tracing::{debug, info, warn};

pub enum PollOutcome {
    Unchanged,
    Reloaded { sessions: usize },
    /// The file changed but did not validate; the old agenda stays.
    Rejected(String),
}

/// Watches one agenda file by modification time.
pub struct AgendaWatcher {
    store: Arc<AgendaStore>,
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl AgendaWatcher {
    pub fn new(store: Arc<AgendaStore>, path: PathBuf) -> Self {
        let last_seen = modified(&path);
        Self {
            store,
            path,
            last_seen,
        }
    }

    pub fn poll(&mut self) -> PollOutcome {
        let current = modified(&self.path);
        if current.is_none() || current == self.last_seen {
            return PollOutcome::Unchanged;
        }
        self.last_seen = current;

        match self.store.reload(&self.path) {
            Ok(agenda) => PollOutcome::Reloaded {
                sessions: agenda.len(),
            },
            Err(e) => PollOutcome::Rejected(e.to_string()),
        }
    }

    /// Poll forever every `interval`.
    pub async fn run(mut self, interval: Duration, metrics: Arc<TourpostMetrics>) {
        info!(
            "Watching {} for agenda changes every {}s",
            self.path.display(),
            interval.as_secs()
        );
        loop {
            tokio::time::sleep(interval).await;
            match self.poll() {
                PollOutcome::Unchanged => debug!("Agenda unchanged"),
                PollOutcome::Reloaded { sessions } => {
                    metrics.record_reload(true);
                    info!("Agenda reloaded: {} sessions", sessions);
                }
                PollOutcome::Rejected(reason) => {
                    metrics.record_reload(false);
                    warn!("Agenda change rejected, keeping previous agenda: {}", reason);
                }
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tourpost_core::Agenda;

    const ONE: &str = r#"[{ "id": "a", "title": "A", "start": "09:00", "end": "09:45" }]"#;
    const TWO: &str = r#"[
        { "id": "a", "title": "A", "start": "09:00", "end": "09:45" },
        { "id": "b", "title": "B", "start": "10:00", "end": "10:45" }
    ]"#;
    const BAD: &str = r#"[{ "id": "a", "title": "A", "start": "09:00", "end": "09:10" }]"#;

    fn rewrite(path: &std::path::Path, body: &str, bump_secs: u64) {
        let mut f = File::create(path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(bump_secs)).unwrap();
    }

    #[test]
    fn swaps_on_change_and_keeps_old_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agenda.json");
        rewrite(&path, ONE, 0);

        let store = Arc::new(AgendaStore::new(Agenda::load(&path).unwrap()));
        let mut watcher = AgendaWatcher::new(store.clone(), path.clone());
        assert!(matches!(watcher.poll(), PollOutcome::Unchanged));

        rewrite(&path, TWO, 10);
        assert!(matches!(watcher.poll(), PollOutcome::Reloaded { sessions: 2 }));
        assert_eq!(store.snapshot().len(), 2);

        rewrite(&path, BAD, 20);
        assert!(matches!(watcher.poll(), PollOutcome::Rejected(_)));
        assert_eq!(store.snapshot().len(), 2);
        assert!(matches!(watcher.poll(), PollOutcome::Unchanged));
    }
}
