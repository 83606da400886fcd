//! Extension matching for multi-dot extensions like `.vegalite.json`.
//!
//! `Path::extension` only sees the last component, so matching is done on
//! the file name suffix instead.

use std::path::{Path, PathBuf};

/// Check whether the file name ends with `ext` (e.g. `.vegalite.json`).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() > ext.len() && name.ends_with(ext))
}

/// Replace the `from` suffix of the file name with `to`.
///
/// Returns `None` when the file name does not end with `from`.
pub fn swap_extension(path: &Path, from: &str, to: &str) -> Option<PathBuf> {
    if !has_extension(path, from) {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    let stem = &name[..name.len() - from.len()];
    Some(path.with_file_name(format!("{stem}{to}")))
}
