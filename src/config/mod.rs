//! Project configuration (`config.toml` or `config.json` next to the master).
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── browser    # [browser]
//! │   ├── inline     # [inline]
//! │   ├── network_idle
//! │   ├── plugins    # plugins = [..]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError
//! │   ├── handle     # Swappable config cell
//! │   └── paths      # ProjectPaths
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Key                       | Purpose                                   |
//! |---------------------------|-------------------------------------------|
//! | `page_rendering_timeout`  | Navigation timeout in seconds             |
//! | `plugins`                 | Plugins loaded after the built-ins        |
//! | `[inline]`                | Resource inlining                         |
//! | `[browser]`               | Browser executable, sandbox, flags        |
//! | `[watch]`                 | Watched extensions and stability window   |
//! | `[network_idle]`          | Idle detection after navigation           |
//! | `[serve]`                 | Report server address (`--serve`)         |

pub mod section;
pub mod types;
mod util;

pub use section::{
    BrowserConfig, InlineConfig, NetworkIdleConfig, PluginSpec, ServeConfig, WatchConfig,
};
pub use types::{ConfigError, ConfigHandle, ProjectPaths, detect_master};
pub use util::{find_config_file, is_config_file};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::log;

/// Largest accepted `page_rendering_timeout`, in seconds.
pub const MAX_RENDERING_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Seconds allowed for navigating to the generated document.
    #[serde(alias = "pageRenderingTimeout")]
    pub page_rendering_timeout: u64,

    /// Plugins loaded after the built-ins, in order.
    pub plugins: Vec<PluginSpec>,

    pub inline: InlineConfig,
    pub browser: BrowserConfig,
    pub watch: WatchConfig,
    pub network_idle: NetworkIdleConfig,
    pub serve: ServeConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            page_rendering_timeout: 30,
            plugins: Vec::new(),
            inline: InlineConfig::default(),
            browser: BrowserConfig::default(),
            watch: WatchConfig::default(),
            network_idle: NetworkIdleConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load the project config from `dir`, or defaults when there is none.
    ///
    /// Returns the config together with the hash of the file content, so a
    /// later reload of unchanged content is a no-op.
    pub fn load(dir: &Path) -> Result<(Self, u64), ConfigError> {
        let Some(path) = find_config_file(dir) else {
            return Ok((Self::default(), 0));
        };

        let content =
            std::fs::read_to_string(&path).map_err(|err| ConfigError::Io(path.clone(), err))?;
        let config = Self::parse(&content, &path)?;
        Ok((config, types::content_hash(&content)))
    }

    /// Parse config content, choosing the format by file extension.
    ///
    /// Unknown fields are reported as warnings, not errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let (config, ignored) = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::parse_toml(content)?,
            Some("json") => Self::parse_json(content)?,
            _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
        };

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_toml(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Parse JSON content, collecting any unknown fields.
    fn parse_json(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let mut deserializer = serde_json::Deserializer::from_str(content);
        let config = serde_ignored::deserialize(&mut deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        deserializer.end()?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("config"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            log!("config"; "  - {}", field);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_rendering_timeout == 0 {
            return Err(ConfigError::Validation(
                "page_rendering_timeout must be at least 1 second".into(),
            ));
        }
        if self.page_rendering_timeout > MAX_RENDERING_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "page_rendering_timeout must be at most {MAX_RENDERING_TIMEOUT_SECS} seconds"
            )));
        }
        if let Some(spec) = self.plugins.iter().find(|p| p.name().trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "plugin entry with empty name: {spec:?}"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn rendering_timeout(&self) -> Duration {
        Duration::from_secs(self.page_rendering_timeout)
    }
}

// ============================================================================
// test helpers
// ============================================================================

#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_toml(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.page_rendering_timeout, 30);
        assert!(config.plugins.is_empty());
        assert!(config.inline.enable);
        assert!(config.inline.compress);
        assert_eq!(config.network_idle.timeout_ms, 200);
        assert_eq!(config.network_idle.max_inflight, 0);
    }

    #[test]
    fn test_camel_case_timeout_alias() {
        let config = ProjectConfig::parse(
            r#"{ "pageRenderingTimeout": 45 }"#,
            Path::new("config.json"),
        )
        .unwrap();
        assert_eq!(config.rendering_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (config, ignored) =
            ProjectConfig::parse_toml("page_rendering_timeout = 5\nmystery = 1").unwrap();
        assert_eq!(config.page_rendering_timeout, 5);
        assert!(ignored.iter().any(|f| f.contains("mystery")));
    }

    #[test]
    fn test_json_unknown_fields_collected() {
        let (_, ignored) = ProjectConfig::parse_json(r#"{ "inline": { "nope": true } }"#).unwrap();
        assert!(ignored.iter().any(|f| f.contains("nope")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ProjectConfig::parse("page_rendering_timeout = 0", Path::new("config.toml"));
        assert!(matches!(err, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_timeout_ceiling() {
        let at = format!("page_rendering_timeout = {MAX_RENDERING_TIMEOUT_SECS}");
        assert!(ProjectConfig::parse(&at, Path::new("config.toml")).is_ok());

        let above = format!("page_rendering_timeout = {}", MAX_RENDERING_TIMEOUT_SECS + 1);
        let err = ProjectConfig::parse(&above, Path::new("config.toml"));
        assert!(matches!(err, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = ProjectConfig::parse("", Path::new("config.yml"));
        assert!(matches!(err, Err(ConfigError::UnknownFormat(_))));
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = TempDir::new().unwrap();
        let (config, hash) = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.page_rendering_timeout, 30);
        assert_eq!(hash, 0);
    }

    #[test]
    fn test_load_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
