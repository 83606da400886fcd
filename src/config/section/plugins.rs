//! `plugins = [...]` entries.
//!
//! # Example
//!
//! ```toml
//! plugins = [
//!     "markdown",                                   # built-in by name
//!     "plugins/mermaid.plugin.toml",                # manifest path
//!     { name = "theme.plugin.toml", params = { accent = "teal" } },
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// One configured plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl PluginSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Factory parameters; `null` when none were given.
    pub fn params(&self) -> serde_json::Value {
        match self {
            Self::Name(_) => serde_json::Value::Null,
            Self::Detailed { params, .. } => params.clone(),
        }
    }
}
