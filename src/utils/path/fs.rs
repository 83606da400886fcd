//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `resolve_path` - resolve relative paths with fallback directory
//! - `display_relative` - short form of a path for log lines
//! - `collect_files` - recursive file listing in traversal order

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve a path that may be relative to cwd or a fallback directory.
///
/// Tries in order:
/// 1. If absolute, use as-is
/// 2. If exists relative to cwd, normalize to absolute
/// 3. Otherwise, resolve relative to fallback_dir
#[inline]
pub fn resolve_path(path: &Path, fallback_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    if path.exists() {
        return normalize_path(path);
    }

    normalize_path(&fallback_dir.join(path))
}

/// Path relative to `root` for log output, or the full path if outside it.
pub fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Collect all files under `dir` recursively, hidden paths included.
///
/// Entries are sorted within each directory, so the order is stable
/// across runs.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .skip_hidden(false)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_untouched() {
        let path = Path::new("/definitely/absolute.hbs");
        assert_eq!(resolve_path(path, Path::new("/elsewhere")), path);
    }

    #[test]
    fn test_resolve_falls_back_to_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.plugin.toml"), "").unwrap();
        let resolved = resolve_path(Path::new("style.plugin.toml"), dir.path());
        assert_eq!(resolved, normalize_path(&dir.path().join("style.plugin.toml")));
    }

    #[test]
    fn test_display_relative() {
        let root = Path::new("/work/report");
        assert_eq!(
            display_relative(Path::new("/work/report/charts/a.vegalite.json"), root),
            "charts/a.vegalite.json"
        );
        assert_eq!(display_relative(Path::new("/tmp/x.css"), root), "/tmp/x.css");
    }

    #[test]
    fn test_collect_files_includes_hidden() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".charts")).unwrap();
        std::fs::write(dir.path().join(".charts/a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let files = collect_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with(".charts/a.txt")));
    }
}
