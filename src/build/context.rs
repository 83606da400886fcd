//! State shared by every build.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::browser::BrowserPage;
use crate::config::{ConfigHandle, ProjectPaths, find_config_file};
use crate::html::HtmlGenerator;
use crate::plugin::{AggregatedHooks, PluginRegistry};
use crate::template::TemplateEngine;

/// Everything a build reads, owned by one scheduler.
///
/// Config and hooks are swapped whole on reload; a build takes one
/// snapshot of each up front and never sees a mid-build change.
pub struct BuildContext {
    pub paths: ProjectPaths,
    pub config: ConfigHandle,
    hooks: ArcSwap<AggregatedHooks>,
    /// The one page every build and watcher handler renders on.
    pub page: Arc<dyn BrowserPage>,
    pub generator: HtmlGenerator,
    pub registry: PluginRegistry,
    /// Template locals from the command line.
    pub locals: serde_json::Value,
    /// Stop after writing the intermediate HTML.
    pub html_only: bool,
}

impl BuildContext {
    pub fn new(
        paths: ProjectPaths,
        config: ConfigHandle,
        hooks: AggregatedHooks,
        page: Arc<dyn BrowserPage>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        let registry = PluginRegistry::new(paths.input_dir.clone(), paths.basedir.clone());
        Self {
            paths,
            config,
            hooks: ArcSwap::from_pointee(hooks),
            page,
            generator: HtmlGenerator::new(engine),
            registry,
            locals: serde_json::Value::Null,
            html_only: false,
        }
    }

    pub fn with_locals(mut self, locals: serde_json::Value) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_html_only(mut self, html_only: bool) -> Self {
        self.html_only = html_only;
        self
    }

    /// Snapshot of the active hook set.
    pub fn hooks(&self) -> Arc<AggregatedHooks> {
        self.hooks.load_full()
    }

    /// Publish a freshly initialized hook set.
    pub fn replace_hooks(&self, hooks: AggregatedHooks) {
        self.hooks.store(Arc::new(hooks));
    }

    /// Config file currently in effect, if any.
    pub fn config_file(&self) -> Option<PathBuf> {
        find_config_file(&self.paths.input_dir)
    }
}
