//! `[inline]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [inline]
//! enable = true     # Embed local stylesheets, scripts and images
//! compress = true   # Minify embedded stylesheets and scripts
//! ```

use serde::{Deserialize, Serialize};

/// Resource inlining settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    pub enable: bool,
    pub compress: bool,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            enable: true,
            compress: true,
        }
    }
}
