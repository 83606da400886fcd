//! Plugin load order and hook aggregation.
//!
//! Load order is fixed:
//!
//! 1. built-ins (`vegalite`, `scss`)
//! 2. configured `plugins`, in configuration order
//! 3. `*.plugin.toml` files found under the input directory, in traversal order

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::builtin;
use super::chain::{HookChain, Registered};
use super::hooks::{Capability, ContentFilter, HookBundle, HtmlModifier, PageModifier, PagePass, Watcher};
use super::manifest::ManifestPlugin;
use super::{PLUGIN_SUFFIX, Plugin, PluginError, PluginParams};
use crate::config::{PluginSpec, ProjectConfig};
use crate::utils::path::{collect_files, display_relative, normalize_path};
use crate::{debug, log};

// ============================================================================
// Aggregated hooks
// ============================================================================

/// Union of every loaded plugin's hooks, one collection per category.
///
/// Built once per (re)load and shared read-only with every build.
#[derive(Default)]
pub struct AggregatedHooks {
    pub watchers: HookChain<Watcher>,
    /// Keyed by filter name; the last plugin to register a name wins.
    pub filters: FxHashMap<String, Registered<Arc<dyn ContentFilter>>>,
    pub template_headers: HookChain<String>,
    pub head_elements: HookChain<String>,
    pub html_modifiers: HookChain<Arc<dyn HtmlModifier>>,
    pub page_modifiers: HookChain<Arc<dyn PageModifier>>,
    pub page_second_modifiers: HookChain<Arc<dyn PageModifier>>,
    /// Loaded plugin names, in load order.
    pub plugins: Vec<Arc<str>>,
}

impl AggregatedHooks {
    /// Merge one plugin's bundle, preserving declaration order.
    pub fn absorb(&mut self, plugin: Arc<str>, bundle: HookBundle) {
        for capability in bundle.into_capabilities() {
            let owner = Arc::clone(&plugin);
            match capability {
                Capability::Watcher(watcher) => self.watchers.push(owner, watcher),
                Capability::Filter { name, filter } => {
                    let entry = Registered {
                        plugin: owner,
                        hook: filter,
                    };
                    if let Some(previous) = self.filters.insert(name.clone(), entry) {
                        log!(
                            "plugin";
                            "filter `{}` from `{}` shadows the one from `{}`",
                            name, plugin, previous.plugin
                        );
                    }
                }
                Capability::TemplateHeader(fragment) => self.template_headers.push(owner, fragment),
                Capability::HeadElement(fragment) => self.head_elements.push(owner, fragment),
                Capability::HtmlModifier(modifier) => self.html_modifiers.push(owner, modifier),
                Capability::PageModifier { pass, modifier } => match pass {
                    PagePass::First => self.page_modifiers.push(owner, modifier),
                    PagePass::Second => self.page_second_modifiers.push(owner, modifier),
                },
            }
        }
        self.plugins.push(plugin);
    }

    /// First registered watcher whose source extensions match `path`.
    pub fn watcher_for(&self, path: &Path) -> Option<&Registered<Watcher>> {
        self.watchers.iter().find(|w| w.hook.matches(path))
    }

    pub fn filter(&self, name: &str) -> Option<&Arc<dyn ContentFilter>> {
        self.filters.get(name).map(|r| &r.hook)
    }

    /// Filter names, sorted.
    pub fn filter_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A plugin paired with the parameters its factory receives.
pub type LoadEntry = (Arc<dyn Plugin>, serde_json::Value);

/// Resolves plugin sources and runs their factories.
pub struct PluginRegistry {
    input_dir: PathBuf,
    basedir: PathBuf,
}

impl PluginRegistry {
    pub fn new(input_dir: PathBuf, basedir: PathBuf) -> Self {
        Self { input_dir, basedir }
    }

    /// Build the hook set from scratch for `config`.
    ///
    /// Any factory failure aborts the whole initialization; no partial
    /// hook set is returned.
    pub async fn initialize(&self, config: &ProjectConfig) -> Result<AggregatedHooks, PluginError> {
        let discovered = discover_plugin_files(&self.input_dir);
        let plugins = self.load_order(&config.plugins, &discovered)?;
        let hooks = self.aggregate(plugins).await?;

        debug!(
            "plugin";
            "loaded {}: {} watcher(s), filters [{}]",
            hooks.plugins.join(", "),
            hooks.watchers.len(),
            hooks.filter_names().join(", ")
        );
        Ok(hooks)
    }

    /// Resolve every plugin source in load order.
    pub fn load_order(
        &self,
        specs: &[PluginSpec],
        discovered: &[PathBuf],
    ) -> Result<Vec<LoadEntry>, PluginError> {
        let mut entries: Vec<LoadEntry> = builtin::always_on()
            .into_iter()
            .map(|plugin| (plugin, serde_json::Value::Null))
            .collect();
        let mut manifests: Vec<PathBuf> = Vec::new();

        for spec in specs {
            let name = spec.name();
            if builtin::is_always_on(name) {
                debug!("plugin"; "`{}` is built in, ignoring config entry", name);
                continue;
            }
            if let Some(plugin) = builtin::by_name(name) {
                entries.push((plugin, spec.params()));
                continue;
            }

            let path = normalize_path(&self.input_dir.join(name));
            if !is_plugin_file(&path) || !path.is_file() {
                return Err(PluginError::Unknown(name.to_string()));
            }
            entries.push((Arc::new(ManifestPlugin::load(&path)?), spec.params()));
            manifests.push(path);
        }

        for path in discovered {
            if manifests.contains(path) {
                continue;
            }
            debug!("plugin"; "discovered {}", display_relative(path, &self.input_dir));
            entries.push((Arc::new(ManifestPlugin::load(path)?), serde_json::Value::Null));
        }

        Ok(entries)
    }

    /// Run every factory in order and merge the results.
    pub async fn aggregate(&self, plugins: Vec<LoadEntry>) -> Result<AggregatedHooks, PluginError> {
        let mut hooks = AggregatedHooks::default();
        for (plugin, params) in plugins {
            let params = PluginParams {
                params,
                input_dir: self.input_dir.clone(),
                basedir: self.basedir.clone(),
            };
            let bundle = plugin
                .construct(&params)
                .await
                .map_err(|source| PluginError::Construct {
                    name: plugin.name().to_string(),
                    source,
                })?;
            hooks.absorb(Arc::from(plugin.name()), bundle);
        }
        Ok(hooks)
    }
}

/// Whether the file name follows the plugin naming convention.
pub fn is_plugin_file(path: &Path) -> bool {
    crate::utils::path::has_extension(path, PLUGIN_SUFFIX)
}

/// All plugin manifests under `root`, in traversal order.
pub fn discover_plugin_files(root: &Path) -> Vec<PathBuf> {
    collect_files(root)
        .into_iter()
        .filter(|path| is_plugin_file(path))
        .map(|path| normalize_path(&path))
        .collect()
}
