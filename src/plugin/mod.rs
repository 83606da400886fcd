//! Plugin system.
//!
//! # Module Structure
//!
//! ```text
//! plugin/
//! ├── hooks      # Capability traits and HookBundle
//! ├── chain      # HookChain and the fold pipeline primitive
//! ├── registry   # Load order and AggregatedHooks
//! ├── manifest   # Declarative *.plugin.toml plugins
//! └── builtin/   # vegalite, scss, markdown
//! ```
//!
//! Every plugin has one async factory, [`Plugin::construct`]. Its
//! capabilities are merged into an [`AggregatedHooks`] that builds read
//! but never mutate; a reload builds a fresh one from scratch.

pub mod builtin;
mod chain;
mod hooks;
mod manifest;
mod registry;

#[cfg(test)]
mod tests;

pub use chain::{HookChain, Registered};
pub use hooks::{
    Capability, ContentFilter, FilterOptions, HookBundle, HtmlModifier, PageModifier, PagePass,
    Watcher, WatcherHandler,
};
pub use manifest::ManifestPlugin;
pub use registry::{AggregatedHooks, PluginRegistry, discover_plugin_files, is_plugin_file};

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Suffix that marks a declarative plugin file.
pub const PLUGIN_SUFFIX: &str = ".plugin.toml";

/// Plugin loading errors. Any of these aborts registry initialization.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin `{name}` failed to construct")]
    Construct {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read plugin manifest `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid plugin manifest `{0}`")]
    Manifest(PathBuf, #[source] toml::de::Error),

    #[error("unknown plugin `{0}` (not a built-in and no such manifest)")]
    Unknown(String),
}

/// Arguments handed to a plugin factory.
#[derive(Debug, Clone)]
pub struct PluginParams {
    /// Entry-specific parameters from the config (`null` when absent).
    pub params: serde_json::Value,
    /// Directory of the master document.
    pub input_dir: PathBuf,
    /// Base directory for absolute references.
    pub basedir: PathBuf,
}

/// A unit of extension: one async factory producing hook capabilities.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn construct(&self, params: &PluginParams) -> Result<HookBundle>;
}
