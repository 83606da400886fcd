//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Recognized config file names, in lookup order.
pub const CONFIG_FILENAMES: &[&str] = &["config.toml", "config.json"];

/// Find the config file in the input directory.
///
/// `config.toml` wins when both exist.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Whether `path` is a config file of the project rooted at `dir`.
pub fn is_config_file(path: &Path, dir: &Path) -> bool {
    path.parent() == Some(dir)
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| CONFIG_FILENAMES.contains(&name))
}
