//! Filesystem watching.
//!
//! ```text
//! notify thread ──> mpsc ──> Debouncer (stability window) ──> batches of paths
//! ```
//!
//! Roots that are deleted are detached and re-attached once they exist
//! again, so replacing a watched directory wholesale keeps it watched.

mod debounce;

pub use debounce::{Debouncer, is_temp_file};

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{debug, log};

/// How often detached roots are checked for reappearance.
const REATTACH_INTERVAL: Duration = Duration::from_secs(1);

/// Far-future sleep when nothing is pending.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

/// Watched locations and whether each is currently attached.
#[derive(Debug)]
pub struct WatchRoots {
    roots: Vec<(PathBuf, bool)>,
}

impl WatchRoots {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut unique: Vec<(PathBuf, bool)> = Vec::new();
        for root in roots {
            if !unique.iter().any(|(r, _)| *r == root) {
                unique.push((root, false));
            }
        }
        Self { roots: unique }
    }

    /// Attach every detached root that exists. Returns the newly attached ones.
    pub fn attach(&mut self, watcher: &mut impl Watcher) -> Vec<PathBuf> {
        let mut attached = Vec::new();
        for (root, active) in &mut self.roots {
            if *active || !root.exists() {
                continue;
            }
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    *active = true;
                    attached.push(root.clone());
                }
                Err(e) => debug!("watch"; "cannot watch {}: {}", root.display(), e),
            }
        }
        attached
    }

    /// Mark a removed root as detached.
    pub fn detach(&mut self, path: &Path, watcher: &mut impl Watcher) -> bool {
        let Some((root, active)) = self.roots.iter_mut().find(|(r, a)| *a && r == path) else {
            return false;
        };
        // The OS watch is usually gone already; unwatch only to drop the
        // watcher's own bookkeeping.
        let _ = watcher.unwatch(root);
        *active = false;
        true
    }

    pub fn has_detached(&self) -> bool {
        self.roots.iter().any(|(_, active)| !active)
    }

    pub fn attached(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().filter(|(_, a)| *a).map(|(r, _)| r.as_path())
    }
}

/// Debounced change stream over the watch roots.
pub struct FileWatcher {
    events: mpsc::Receiver<notify::Event>,
    watcher: RecommendedWatcher,
    roots: WatchRoots,
    debouncer: Debouncer,
}

impl FileWatcher {
    /// Start watching immediately; events buffer until [`next_batch`] is polled.
    ///
    /// [`next_batch`]: Self::next_batch
    pub fn new(roots: Vec<PathBuf>, stability: Duration) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut roots = WatchRoots::new(roots);
        for root in roots.attach(&mut watcher) {
            debug!("watch"; "watching {}", root.display());
        }

        // notify delivers on its own thread; bridge into the async world.
        let (tx, rx) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        Ok(Self {
            events: rx,
            watcher,
            roots,
            debouncer: Debouncer::new(stability),
        })
    }

    pub fn roots(&self) -> &WatchRoots {
        &self.roots
    }

    /// Wait for the next set of stable changed paths.
    ///
    /// Returns `None` once the notify thread has gone away.
    pub async fn next_batch(&mut self) -> Option<Vec<PathBuf>> {
        let mut reattach = tokio::time::interval(REATTACH_INTERVAL);
        reattach.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let deadline = self
                .debouncer
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_SLEEP);

            tokio::select! {
                biased;
                event = self.events.recv() => {
                    let event = event?;
                    self.observe(&event);
                }
                _ = tokio::time::sleep_until(deadline), if !self.debouncer.is_empty() => {
                    let ready = self.debouncer.take_ready(Instant::now());
                    if !ready.is_empty() {
                        return Some(ready);
                    }
                }
                _ = reattach.tick(), if self.roots.has_detached() => {
                    for root in self.roots.attach(&mut self.watcher) {
                        log!("watch"; "re-attached {}", root.display());
                    }
                }
            }
        }
    }

    fn observe(&mut self, event: &notify::Event) {
        if matches!(event.kind, EventKind::Remove(_)) {
            for path in &event.paths {
                if self.roots.detach(path, &mut self.watcher) {
                    log!("watch"; "{} was removed, waiting for it to return", path.display());
                }
            }
        }
        self.debouncer.add_event(event, Instant::now());
    }
}
