//! `[browser]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [browser]
//! executable = "~/bin/chromium"   # Default: discovered on PATH
//! sandbox = true                  # --no-sandbox on the command line overrides
//! args = ["--font-render-hinting=none"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Headless browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome/Chromium executable. `~` is expanded.
    pub executable: Option<PathBuf>,

    /// Run the browser inside its sandbox.
    pub sandbox: bool,

    /// Extra command-line flags passed to the browser.
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            sandbox: true,
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Executable path with `~` expanded.
    pub fn executable_path(&self) -> Option<PathBuf> {
        let path = self.executable.as_ref()?;
        let raw = path.to_string_lossy();
        Some(PathBuf::from(shellexpand::tilde(&raw).as_ref()))
    }
}
