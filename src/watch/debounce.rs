//! Per-path stability debouncer.
//!
//! A path is reported once no event for it has arrived for the stability
//! window, so a file still being written is never picked up half-way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use notify::event::ModifyKind;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

use crate::debug;
use crate::utils::path::normalize_path;

/// Editor swap, backup and hidden files.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

pub struct Debouncer {
    /// Path -> time of its latest event.
    pending: FxHashMap<PathBuf, Instant>,
    stability: Duration,
}

impl Debouncer {
    pub fn new(stability: Duration) -> Self {
        Self {
            pending: FxHashMap::default(),
            stability,
        }
    }

    /// Record the paths of a notify event.
    ///
    /// Only content changes count: creations, data writes and renames.
    /// Removals and metadata-only changes (mtime, chmod) are dropped.
    pub fn add_event(&mut self, event: &notify::Event, now: Instant) {
        let relevant = match event.kind {
            EventKind::Create(_) => true,
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Modify(_) => true,
            _ => false,
        };
        if !relevant {
            return;
        }

        for path in &event.paths {
            if is_temp_file(path) || path.is_dir() {
                continue;
            }
            debug!("watch"; "{:?}: {}", event.kind, path.display());
            self.pending.insert(normalize_path(path), now);
        }
    }

    /// Paths whose stability window has passed, sorted.
    pub fn take_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let stability = self.stability;
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) >= stability)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }

    /// When the earliest pending path becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().map(|at| *at + self.stability)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(paths: &[&str], kind: EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify() -> EventKind {
        EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Any))
    }

    const STABLE: Duration = Duration::from_millis(50);

    #[test]
    fn test_temp_files() {
        assert!(is_temp_file(Path::new("/doc/.report.hbs.swp")));
        assert!(is_temp_file(Path::new("/doc/report.hbs~")));
        assert!(is_temp_file(Path::new("/doc/#report.hbs#")));
        assert!(is_temp_file(Path::new("/doc/report.bak")));
        assert!(!is_temp_file(Path::new("/doc/report.hbs")));
    }

    #[test]
    fn test_reported_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(STABLE);
        debouncer.add_event(&event(&["/doc/a.hbs"], modify()), start);

        assert!(debouncer.take_ready(start + Duration::from_millis(49)).is_empty());
        assert_eq!(debouncer.next_deadline(), Some(start + STABLE));
        assert_eq!(
            debouncer.take_ready(start + STABLE),
            vec![PathBuf::from("/doc/a.hbs")]
        );
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_repeated_writes_extend_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(STABLE);
        debouncer.add_event(&event(&["/doc/a.hbs"], modify()), start);
        debouncer.add_event(
            &event(&["/doc/a.hbs"], modify()),
            start + Duration::from_millis(40),
        );

        assert!(debouncer.take_ready(start + Duration::from_millis(60)).is_empty());
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(90)).len(), 1);
    }

    #[test]
    fn test_paths_ready_independently() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(STABLE);
        debouncer.add_event(&event(&["/doc/a.css"], modify()), start);
        debouncer.add_event(
            &event(&["/doc/b.css"], modify()),
            start + Duration::from_millis(30),
        );

        assert_eq!(
            debouncer.take_ready(start + STABLE),
            vec![PathBuf::from("/doc/a.css")]
        );
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(80))
        );
    }

    #[test]
    fn test_irrelevant_events_dropped() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(STABLE);
        debouncer.add_event(
            &event(&["/doc/a.hbs"], EventKind::Remove(notify::event::RemoveKind::File)),
            now,
        );
        debouncer.add_event(
            &event(
                &["/doc/a.hbs"],
                EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any)),
            ),
            now,
        );
        debouncer.add_event(&event(&["/doc/.a.hbs.swp"], modify()), now);
        assert!(debouncer.is_empty());
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_duplicate_paths_in_one_event() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(STABLE);
        debouncer.add_event(&event(&["/doc/a.hbs", "/doc/a.hbs"], modify()), now);
        assert_eq!(debouncer.take_ready(now + STABLE).len(), 1);
    }
}
