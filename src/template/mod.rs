//! Template rendering.
//!
//! The generator hands the engine the assembled template text, the
//! aggregated content filters and the scope bindings; the engine returns
//! the rendered body. [`HandlebarsEngine`] is the only implementation.

mod hbs;

pub use hbs::HandlebarsEngine;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::plugin::ContentFilter;

/// One template render, fully owned so it can move to a blocking thread.
pub struct TemplateJob {
    /// Template headers followed by the master template.
    pub source: String,
    /// Master document path.
    pub master: PathBuf,
    /// Base directory for `/absolute` references.
    pub basedir: PathBuf,
    /// User-supplied locals (`--locals`), merged into the scope.
    pub locals: serde_json::Value,
    /// Content filters by name.
    pub filters: Vec<(String, Arc<dyn ContentFilter>)>,
}

impl TemplateJob {
    /// Directory of the master document.
    pub fn root(&self) -> &Path {
        self.master.parent().unwrap_or(Path::new("."))
    }
}

/// Expands a template into HTML.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, job: &TemplateJob) -> Result<String>;
}

/// Resolve a template reference: `/x` against the base directory,
/// anything else against the master's directory.
pub fn resolve_reference(reference: &str, basedir: &Path, root: &Path) -> PathBuf {
    match reference.strip_prefix('/') {
        Some(rest) => basedir.join(rest),
        None => root.join(reference),
    }
}
