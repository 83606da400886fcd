//! Path utilities.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `resolve_path`, `collect_files`)
//! - [`ext`]: Multi-dot extension matching (`has_extension`, `swap_extension`)

pub mod ext;
pub mod fs;

pub use ext::{has_extension, swap_extension};
pub use fs::{collect_files, display_relative, normalize_path, resolve_path};
