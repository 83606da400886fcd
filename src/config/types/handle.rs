//! Swappable config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement.
//! Builds take one snapshot up front, so a reload never changes the
//! configuration underneath an in-flight build.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::config::{ConfigError, ProjectConfig};

/// Active configuration plus the hash of the file it came from.
pub struct ConfigHandle {
    current: ArcSwap<ProjectConfig>,
    content_hash: AtomicU64,
}

impl ConfigHandle {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            content_hash: AtomicU64::new(0),
        }
    }

    /// Snapshot of the active configuration.
    #[inline]
    pub fn get(&self) -> Arc<ProjectConfig> {
        self.current.load_full()
    }

    /// Replace the active configuration.
    pub fn store(&self, config: ProjectConfig) {
        self.current.store(Arc::new(config));
    }

    /// Remember the hash of the content that produced the active config.
    pub fn set_content_hash(&self, hash: u64) {
        self.content_hash.store(hash, Ordering::Relaxed);
    }

    /// Hash of the content behind the active config (0 for defaults).
    pub fn content_hash(&self) -> u64 {
        self.content_hash.load(Ordering::Relaxed)
    }

    /// Reload from disk if the file content changed.
    ///
    /// Returns `Ok(true)` if the config was replaced, `Ok(false)` if the
    /// content is unchanged. On error the previous config stays active.
    pub fn reload(&self, path: &Path) -> Result<bool, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let new_hash = content_hash(&content);
        if new_hash == self.content_hash() {
            return Ok(false);
        }

        let config = ProjectConfig::parse(&content, path)?;
        self.store(config);
        self.set_content_hash(new_hash);
        Ok(true)
    }
}

/// Hash of config file content, used to skip no-op reloads.
pub fn content_hash(content: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_replaces_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_rendering_timeout = 10").unwrap();

        let handle = ConfigHandle::new(ProjectConfig::default());
        assert!(handle.reload(&path).unwrap());
        assert_eq!(handle.get().page_rendering_timeout, 10);

        // Same content: no-op
        assert!(!handle.reload(&path).unwrap());
    }

    #[test]
    fn test_reload_failure_keeps_previous() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_rendering_timeout = 12").unwrap();

        let handle = ConfigHandle::new(ProjectConfig::default());
        handle.reload(&path).unwrap();

        std::fs::write(&path, "page_rendering_timeout = [oops").unwrap();
        assert!(handle.reload(&path).is_err());
        assert_eq!(handle.get().page_rendering_timeout, 12);
    }

    #[test]
    fn test_snapshot_survives_store() {
        let handle = ConfigHandle::new(ProjectConfig::default());
        let before = handle.get();

        let mut changed = ProjectConfig::default();
        changed.page_rendering_timeout = 99;
        handle.store(changed);

        assert_eq!(before.page_rendering_timeout, 30);
        assert_eq!(handle.get().page_rendering_timeout, 99);
    }
}
