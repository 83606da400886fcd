//! Hook capabilities a plugin can provide.
//!
//! A plugin's factory returns a [`HookBundle`]: a list of [`Capability`]
//! values, one per hook it contributes. The registry sorts them into
//! per-category chains.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::browser::{BrowserPage, PdfOptions};
use crate::utils::path::{has_extension, swap_extension};

// ============================================================================
// Hook traits
// ============================================================================

/// Regenerates one derived file from its source.
#[async_trait]
pub trait WatcherHandler: Send + Sync {
    async fn handle(&self, source: &Path, output: &Path, page: &dyn BrowserPage) -> Result<()>;
}

/// Options passed to a content filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions<'a> {
    /// Master document being rendered.
    pub filename: &'a Path,
    /// Named arguments from the filter invocation.
    pub params: &'a serde_json::Map<String, serde_json::Value>,
}

impl FilterOptions<'_> {
    /// String parameter, if present.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }
}

/// Named template content filter.
pub trait ContentFilter: Send + Sync {
    fn apply(&self, text: &str, options: &FilterOptions<'_>) -> Result<String>;
}

impl<F> ContentFilter for F
where
    F: Fn(&str, &FilterOptions<'_>) -> Result<String> + Send + Sync,
{
    fn apply(&self, text: &str, options: &FilterOptions<'_>) -> Result<String> {
        self(text, options)
    }
}

/// Transforms the fully assembled document.
#[async_trait]
pub trait HtmlModifier: Send + Sync {
    async fn modify(&self, html: String) -> Result<String>;
}

#[async_trait]
impl<F> HtmlModifier for F
where
    F: Fn(String) -> Result<String> + Send + Sync,
{
    async fn modify(&self, html: String) -> Result<String> {
        self(html)
    }
}

/// Mutates the live page or the pending print options before printing.
#[async_trait]
pub trait PageModifier: Send + Sync {
    async fn modify(&self, page: &dyn BrowserPage, options: &mut PdfOptions) -> Result<()>;
}

// ============================================================================
// Capabilities
// ============================================================================

/// Source extensions mapped to one derived extension.
#[derive(Clone)]
pub struct Watcher {
    /// Source extensions, e.g. `.vegalite.json`.
    pub extensions: Vec<String>,
    /// Derived extension, e.g. `.svg`.
    pub output_extension: String,
    pub handler: Arc<dyn WatcherHandler>,
}

impl Watcher {
    pub fn new(
        extensions: impl IntoIterator<Item = impl Into<String>>,
        output_extension: impl Into<String>,
        handler: Arc<dyn WatcherHandler>,
    ) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            output_extension: output_extension.into(),
            handler,
        }
    }

    /// Whether `path` is a source file of this watcher.
    pub fn matches(&self, path: &Path) -> bool {
        self.extensions.iter().any(|ext| has_extension(path, ext))
    }

    /// Derived file for a source path.
    ///
    /// The longest matching source extension is replaced, so
    /// `chart.vegalite.json` maps to `chart.svg` even if `.json` is listed too.
    pub fn derived_path(&self, source: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .filter(|ext| has_extension(source, ext))
            .max_by_key(|ext| ext.len())
            .and_then(|ext| swap_extension(source, ext, &self.output_extension))
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("extensions", &self.extensions)
            .field("output_extension", &self.output_extension)
            .finish_non_exhaustive()
    }
}

/// Which page-modifier pass a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePass {
    First,
    Second,
}

/// One hook contributed by a plugin.
pub enum Capability {
    Watcher(Watcher),
    Filter {
        name: String,
        filter: Arc<dyn ContentFilter>,
    },
    TemplateHeader(String),
    HeadElement(String),
    HtmlModifier(Arc<dyn HtmlModifier>),
    PageModifier {
        pass: PagePass,
        modifier: Arc<dyn PageModifier>,
    },
}

impl Capability {
    pub fn filter(name: impl Into<String>, filter: impl ContentFilter + 'static) -> Self {
        Self::Filter {
            name: name.into(),
            filter: Arc::new(filter),
        }
    }

    pub fn html_modifier(modifier: impl HtmlModifier + 'static) -> Self {
        Self::HtmlModifier(Arc::new(modifier))
    }

    pub fn page_modifier(pass: PagePass, modifier: impl PageModifier + 'static) -> Self {
        Self::PageModifier {
            pass,
            modifier: Arc::new(modifier),
        }
    }
}

/// Everything one plugin contributes, in declaration order.
#[derive(Default)]
pub struct HookBundle {
    capabilities: Vec<Capability>,
}

impl HookBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn push(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn into_capabilities(self) -> Vec<Capability> {
        self.capabilities
    }
}
