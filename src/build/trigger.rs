//! Routing of changed paths.

use std::path::{Path, PathBuf};

use crate::config::{ProjectPaths, WatchConfig, is_config_file};
use crate::plugin::{AggregatedHooks, is_plugin_file};

/// What a changed path asks the scheduler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTrigger {
    /// Config file or plugin manifest: reload config and plugins.
    Reload(PathBuf),
    /// Source of a registered watcher: regenerate its derived file.
    Watcher(PathBuf),
    /// Generated artifact or unrecognized file.
    Ignore(PathBuf),
    /// Any other recognized source: rebuild the master document.
    Rebuild(PathBuf),
}

impl BuildTrigger {
    /// Classify a changed path, first matching rule wins.
    pub fn classify(
        path: &Path,
        paths: &ProjectPaths,
        watch: &WatchConfig,
        hooks: &AggregatedHooks,
    ) -> Self {
        let path = path.to_path_buf();
        if is_config_file(&path, &paths.input_dir) || is_plugin_file(&path) {
            return Self::Reload(path);
        }
        if hooks.watcher_for(&path).is_some() {
            return Self::Watcher(path);
        }
        // The master always rebuilds, whatever `[watch].extensions` says.
        if path == paths.master {
            return Self::Rebuild(path);
        }
        if path == paths.output || path == paths.temp_html || !is_recognized(&path, watch) {
            return Self::Ignore(path);
        }
        Self::Rebuild(path)
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Reload(p) | Self::Watcher(p) | Self::Ignore(p) | Self::Rebuild(p) => p,
        }
    }
}

fn is_recognized(path: &Path, watch: &WatchConfig) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    watch
        .normalized_extensions()
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
}
