//! Declarative plugins (`*.plugin.toml`).
//!
//! # Example
//!
//! ```toml
//! name = "diagrams"
//! stylesheets = ["diagrams.css"]
//! head = ['<meta name="generator" content="quire">']
//! template_headers = ["{{#*inline \"note\"}}<aside>{{> @partial-block}}</aside>{{/inline}}"]
//!
//! [[watchers]]
//! extensions = [".mmd"]
//! output = ".svg"
//! command = ["mmdc", "-i", "$SOURCE", "-o", "$OUTPUT"]
//!
//! [[filters]]
//! name = "upper"
//! command = ["tr", "a-z", "A-Z"]
//!
//! [[html_modifiers]]
//! pattern = "TODO"
//! replace = "<mark>TODO</mark>"
//!
//! [[page_scripts]]
//! script = "document.body.classList.add('print')"
//! pass = 1
//! ```
//!
//! Commands run in the manifest's directory. String, number and boolean
//! entries of the plugin's `params` are available as `$NAME` in commands,
//! head elements and template headers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::hooks::{
    Capability, ContentFilter, FilterOptions, HookBundle, HtmlModifier, PageModifier, PagePass, Watcher,
    WatcherHandler,
};
use super::{PLUGIN_SUFFIX, Plugin, PluginError, PluginParams};
use crate::browser::{BrowserPage, PdfOptions};
use crate::utils::exec::{Cmd, substitute_vars};
use crate::utils::html::escape_attr;

// ============================================================================
// Manifest schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Manifest {
    name: Option<String>,
    head: Vec<String>,
    stylesheets: Vec<String>,
    template_headers: Vec<String>,
    watchers: Vec<WatcherDecl>,
    filters: Vec<FilterDecl>,
    html_modifiers: Vec<ReplaceDecl>,
    page_scripts: Vec<PageScriptDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WatcherDecl {
    extensions: Vec<String>,
    output: String,
    command: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterDecl {
    name: String,
    command: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplaceDecl {
    pattern: String,
    replace: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageScriptDecl {
    script: String,
    #[serde(default = "first_pass")]
    pass: u8,
}

const fn first_pass() -> u8 {
    1
}

// ============================================================================
// Plugin
// ============================================================================

/// A plugin declared by a manifest file.
pub struct ManifestPlugin {
    name: String,
    dir: PathBuf,
    manifest: Manifest,
}

impl ManifestPlugin {
    /// Read and parse a manifest. The plugin name defaults to the file stem.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PluginError::Io(path.to_path_buf(), e))?;
        let manifest: Manifest =
            toml::from_str(&content).map_err(|e| PluginError::Manifest(path.to_path_buf(), e))?;

        let name = manifest.name.clone().unwrap_or_else(|| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            file_name
                .strip_suffix(PLUGIN_SUFFIX)
                .unwrap_or(&file_name)
                .to_string()
        });
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(Self {
            name,
            dir,
            manifest,
        })
    }
}

#[async_trait]
impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn construct(&self, params: &PluginParams) -> Result<HookBundle> {
        let vars = param_vars(&params.params);
        let expand = |s: &str| substitute_vars(&[s.to_string()], &vars).remove(0);
        let mut bundle = HookBundle::new();

        for header in &self.manifest.template_headers {
            bundle.push(Capability::TemplateHeader(expand(header)));
        }
        for element in &self.manifest.head {
            bundle.push(Capability::HeadElement(expand(element)));
        }
        for href in &self.manifest.stylesheets {
            let href = self.dir.join(expand(href));
            bundle.push(Capability::HeadElement(format!(
                r#"<link rel="stylesheet" href="{}">"#,
                escape_attr(&href.to_string_lossy())
            )));
        }

        for decl in &self.manifest.watchers {
            if decl.command.is_empty() {
                bail!("watcher for {:?} has an empty command", decl.extensions);
            }
            let handler = CommandWatcher {
                command: substitute_vars(&decl.command, &vars),
                dir: self.dir.clone(),
            };
            bundle.push(Capability::Watcher(Watcher::new(
                decl.extensions.iter().cloned(),
                decl.output.clone(),
                Arc::new(handler),
            )));
        }

        for decl in &self.manifest.filters {
            if decl.command.is_empty() {
                bail!("filter `{}` has an empty command", decl.name);
            }
            let filter = CommandFilter {
                command: substitute_vars(&decl.command, &vars),
                dir: self.dir.clone(),
            };
            bundle.push(Capability::Filter {
                name: decl.name.clone(),
                filter: Arc::new(filter),
            });
        }

        for decl in &self.manifest.html_modifiers {
            let pattern = Regex::new(&decl.pattern)
                .with_context(|| format!("invalid html_modifiers pattern `{}`", decl.pattern))?;
            bundle.push(Capability::html_modifier(RegexReplace {
                pattern,
                replace: decl.replace.clone(),
            }));
        }

        for decl in &self.manifest.page_scripts {
            let pass = match decl.pass {
                1 => PagePass::First,
                2 => PagePass::Second,
                other => bail!("page script pass must be 1 or 2, got {other}"),
            };
            bundle.push(Capability::page_modifier(
                pass,
                PageScript {
                    script: expand(&decl.script),
                },
            ));
        }

        Ok(bundle)
    }
}

/// `$NAME` substitutions from scalar plugin params.
fn param_vars(params: &serde_json::Value) -> FxHashMap<&str, String> {
    let mut vars = FxHashMap::default();
    if let Some(map) = params.as_object() {
        for (key, value) in map {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            vars.insert(key.as_str(), text);
        }
    }
    vars
}

// ============================================================================
// Hook implementations
// ============================================================================

/// Runs a command with `$SOURCE` and `$OUTPUT` substituted.
struct CommandWatcher {
    command: Vec<String>,
    dir: PathBuf,
}

#[async_trait]
impl WatcherHandler for CommandWatcher {
    async fn handle(&self, source: &Path, output: &Path, _page: &dyn BrowserPage) -> Result<()> {
        let mut vars = FxHashMap::default();
        vars.insert("SOURCE", source.display().to_string());
        vars.insert("OUTPUT", output.display().to_string());
        let args = substitute_vars(&self.command, &vars);
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || Cmd::from_slice(&args).cwd(dir).run())
            .await
            .context("watcher command panicked")??;
        Ok(())
    }
}

/// Pipes the filter text through a command.
struct CommandFilter {
    command: Vec<String>,
    dir: PathBuf,
}

impl ContentFilter for CommandFilter {
    fn apply(&self, text: &str, options: &FilterOptions<'_>) -> Result<String> {
        let mut vars = FxHashMap::default();
        vars.insert("FILENAME", options.filename.display().to_string());
        let args = substitute_vars(&self.command, &vars);

        let output = Cmd::from_slice(&args).cwd(&self.dir).stdin(text).run()?;
        String::from_utf8(output.stdout).context("filter output is not UTF-8")
    }
}

/// Regex replacement over the whole document.
struct RegexReplace {
    pattern: Regex,
    replace: String,
}

#[async_trait]
impl HtmlModifier for RegexReplace {
    async fn modify(&self, html: String) -> Result<String> {
        Ok(self
            .pattern
            .replace_all(&html, self.replace.as_str())
            .into_owned())
    }
}

/// Evaluates a script on the live page.
struct PageScript {
    script: String,
}

#[async_trait]
impl PageModifier for PageScript {
    async fn modify(&self, page: &dyn BrowserPage, _options: &mut PdfOptions) -> Result<()> {
        page.evaluate(&self.script).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockPage;
    use std::fs;
    use tempfile::TempDir;

    fn params(value: serde_json::Value) -> PluginParams {
        PluginParams {
            params: value,
            input_dir: PathBuf::from("/doc"),
            basedir: PathBuf::from("/doc"),
        }
    }

    fn write_manifest(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_name_defaults_to_stem() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(dir.path(), "fancy.plugin.toml", "");
        let plugin = ManifestPlugin::load(&path).unwrap();
        assert_eq!(plugin.name(), "fancy");
    }

    #[test]
    fn test_unknown_field_is_manifest_error() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(dir.path(), "x.plugin.toml", "heads = []");
        assert!(matches!(
            ManifestPlugin::load(&path),
            Err(PluginError::Manifest(_, _))
        ));
    }

    #[tokio::test]
    async fn test_construct_capabilities_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            dir.path(),
            "x.plugin.toml",
            r#"
name = "x"
template_headers = ["{{! $accent }}"]
head = ['<meta name="accent" content="$accent">']
stylesheets = ["x.css"]

[[html_modifiers]]
pattern = "a+"
replace = "b"

[[page_scripts]]
script = "1"
pass = 2
"#,
        );
        let plugin = ManifestPlugin::load(&path).unwrap();
        let bundle = plugin
            .construct(&params(serde_json::json!({ "accent": "teal" })))
            .await
            .unwrap();
        let caps = bundle.into_capabilities();

        assert!(matches!(&caps[0], Capability::TemplateHeader(h) if h == "{{! teal }}"));
        assert!(matches!(&caps[1], Capability::HeadElement(h) if h.contains("content=\"teal\"")));
        assert!(matches!(&caps[2], Capability::HeadElement(h) if h.contains("x.css")));
        assert!(matches!(&caps[3], Capability::HtmlModifier(_)));
        assert!(matches!(
            &caps[4],
            Capability::PageModifier {
                pass: PagePass::Second,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_bad_pass_fails_construct() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            dir.path(),
            "x.plugin.toml",
            "[[page_scripts]]\nscript = \"1\"\npass = 3",
        );
        let plugin = ManifestPlugin::load(&path).unwrap();
        assert!(plugin.construct(&params(serde_json::Value::Null)).await.is_err());
    }

    #[tokio::test]
    async fn test_regex_modifier() {
        let modifier = RegexReplace {
            pattern: Regex::new("a+").unwrap(),
            replace: "b".into(),
        };
        assert_eq!(modifier.modify("caaat".into()).await.unwrap(), "cbt");
    }

    #[tokio::test]
    async fn test_page_script_evaluates() {
        let page = MockPage::new();
        let script = PageScript {
            script: "document.title = 'x'".into(),
        };
        script
            .modify(&page, &mut PdfOptions::default())
            .await
            .unwrap();
        assert_eq!(page.calls(), vec!["evaluate:document.title = 'x'"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_watcher_writes_output() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        let output = dir.path().join("a.out");
        fs::write(&source, "data").unwrap();

        let watcher = CommandWatcher {
            command: vec!["cp".into(), "$SOURCE".into(), "$OUTPUT".into()],
            dir: dir.path().to_path_buf(),
        };
        watcher
            .handle(&source, &output, &MockPage::new())
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "data");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_filter_pipes_stdin() {
        let filter = CommandFilter {
            command: vec!["tr".into(), "a-z".into(), "A-Z".into()],
            dir: std::env::temp_dir(),
        };
        let map = serde_json::Map::new();
        let options = FilterOptions {
            filename: Path::new("doc.hbs"),
            params: &map,
        };
        assert_eq!(filter.apply("shout", &options).unwrap(), "SHOUT");
    }
}
