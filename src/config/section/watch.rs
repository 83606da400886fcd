//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! extensions = [".hbs", ".css", ".svg"]   # Changes that rebuild the document
//! stability_ms = 50                       # Quiet window before a change counts
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Recognized source extensions when none are configured.
const DEFAULT_EXTENSIONS: &[&str] = &[
    ".hbs", ".html", ".md", ".css", ".scss", ".js", ".svg", ".png", ".jpg", ".jpeg", ".gif",
    ".json", ".csv",
];

/// File watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Extensions that trigger a document rebuild.
    pub extensions: Vec<String>,

    /// Milliseconds a file must stay unchanged before its change is reported.
    pub stability_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            stability_ms: 50,
        }
    }
}

impl WatchConfig {
    #[inline]
    pub fn stability(&self) -> Duration {
        Duration::from_millis(self.stability_ms)
    }

    /// Normalized extensions, each with a leading dot and lowercased.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                if ext.starts_with('.') { ext } else { format!(".{ext}") }
            })
            .collect()
    }
}
