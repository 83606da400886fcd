//! Registry tests: load order, shadowing, failure and reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use super::*;
use crate::config::{PluginSpec, ProjectConfig};

/// Test plugin whose factory returns the given capabilities.
struct Fixed {
    name: &'static str,
    make: fn() -> Result<HookBundle>,
}

#[async_trait]
impl Plugin for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    async fn construct(&self, _params: &PluginParams) -> Result<HookBundle> {
        (self.make)()
    }
}

fn entry(name: &'static str, make: fn() -> Result<HookBundle>) -> (Arc<dyn Plugin>, serde_json::Value) {
    (Arc::new(Fixed { name, make }), serde_json::Value::Null)
}

fn registry(dir: &Path) -> PluginRegistry {
    PluginRegistry::new(dir.to_path_buf(), dir.to_path_buf())
}

fn tagging_filter(tag: &'static str) -> Capability {
    Capability::filter("shared", move |_: &str, _: &FilterOptions<'_>| -> Result<String> {
        Ok(tag.to_string())
    })
}

fn apply_shared(hooks: &AggregatedHooks) -> String {
    let params = serde_json::Map::new();
    let options = FilterOptions {
        filename: Path::new("doc.hbs"),
        params: &params,
    };
    hooks.filter("shared").unwrap().apply("", &options).unwrap()
}

#[tokio::test]
async fn test_filters_last_registered_wins() {
    let dir = TempDir::new().unwrap();
    let hooks = registry(dir.path())
        .aggregate(vec![
            entry("first", || Ok(HookBundle::new().with(tagging_filter("first")))),
            entry("second", || Ok(HookBundle::new().with(tagging_filter("second")))),
        ])
        .await
        .unwrap();

    assert_eq!(apply_shared(&hooks), "second");
    assert_eq!(&*hooks.filters["shared"].plugin, "second");
}

#[tokio::test]
async fn test_ordered_categories_keep_duplicates() {
    let dir = TempDir::new().unwrap();
    let hooks = registry(dir.path())
        .aggregate(vec![
            entry("a", || {
                Ok(HookBundle::new()
                    .with(Capability::HeadElement("<x>".into()))
                    .with(Capability::TemplateHeader("h1".into())))
            }),
            entry("b", || {
                Ok(HookBundle::new()
                    .with(Capability::HeadElement("<x>".into()))
                    .with(Capability::TemplateHeader("h2".into())))
            }),
        ])
        .await
        .unwrap();

    let heads: Vec<_> = hooks.head_elements.iter().map(|r| r.hook.as_str()).collect();
    assert_eq!(heads, vec!["<x>", "<x>"]);
    let headers: Vec<_> = hooks
        .template_headers
        .iter()
        .map(|r| (&*r.plugin, r.hook.as_str()))
        .collect();
    assert_eq!(headers, vec![("a", "h1"), ("b", "h2")]);
    assert_eq!(hooks.plugins.len(), 2);
}

#[tokio::test]
async fn test_factory_failure_aborts() {
    let dir = TempDir::new().unwrap();
    let result = registry(dir.path())
        .aggregate(vec![
            entry("fine", || Ok(HookBundle::new())),
            entry("broken", || anyhow::bail!("cannot start")),
            entry("later", || Ok(HookBundle::new())),
        ])
        .await;

    match result {
        Err(PluginError::Construct { name, .. }) => assert_eq!(name, "broken"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected construct failure"),
    }
}

#[tokio::test]
async fn test_load_order_builtins_config_discovered() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("listed.plugin.toml"), "").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/found.plugin.toml"), "").unwrap();

    let mut config = ProjectConfig::default();
    config.plugins = vec![
        PluginSpec::Name("listed.plugin.toml".into()),
        PluginSpec::Name("markdown".into()),
    ];

    let hooks = registry(dir.path()).initialize(&config).await.unwrap();
    let names: Vec<_> = hooks.plugins.iter().map(|n| &**n).collect();

    // The listed manifest is also under the tree but loads only once.
    assert_eq!(names, vec!["vegalite", "scss", "listed", "markdown", "found"]);
}

#[tokio::test]
async fn test_builtin_names_in_config_are_not_doubled() {
    let dir = TempDir::new().unwrap();
    let mut config = ProjectConfig::default();
    config.plugins = vec![PluginSpec::Name("vegalite".into())];

    let hooks = registry(dir.path()).initialize(&config).await.unwrap();
    assert_eq!(hooks.watchers.len(), 1);
}

#[tokio::test]
async fn test_unknown_plugin_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = ProjectConfig::default();
    config.plugins = vec![PluginSpec::Name("missing.plugin.toml".into())];

    assert!(matches!(
        registry(dir.path()).initialize(&config).await,
        Err(PluginError::Unknown(_))
    ));
}

#[tokio::test]
async fn test_reload_is_total() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("extra.plugin.toml");
    fs::write(&manifest, "head = ['<meta name=\"v\" content=\"1\">']").unwrap();

    let registry = registry(dir.path());
    let config = ProjectConfig::default();
    let first = registry.initialize(&config).await.unwrap();
    assert_eq!(first.head_elements.len(), 1);

    fs::remove_file(&manifest).unwrap();
    let second = registry.initialize(&config).await.unwrap();
    assert!(second.head_elements.is_empty());
    assert!(!second.plugins.iter().any(|p| &**p == "extra"));
}

#[tokio::test]
async fn test_broken_discovered_manifest_aborts() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.plugin.toml"), "head = 3").unwrap();
    let result = registry(dir.path()).initialize(&ProjectConfig::default()).await;
    assert!(matches!(result, Err(PluginError::Manifest(_, _))));
}

#[test]
fn test_watcher_lookup() {
    struct Noop;

    #[async_trait]
    impl WatcherHandler for Noop {
        async fn handle(&self, _: &Path, _: &Path, _: &dyn crate::browser::BrowserPage) -> Result<()> {
            Ok(())
        }
    }

    let mut hooks = AggregatedHooks::default();
    hooks.absorb(
        Arc::from("charts"),
        HookBundle::new().with(Capability::Watcher(Watcher::new([".mmd"], ".svg", Arc::new(Noop)))),
    );

    let found = hooks.watcher_for(Path::new("/doc/a.mmd")).unwrap();
    assert_eq!(&*found.plugin, "charts");
    assert!(hooks.watcher_for(Path::new("/doc/a.svg")).is_none());
}

#[test]
fn test_discover_plugin_files() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".hidden")).unwrap();
    fs::write(dir.path().join(".hidden/h.plugin.toml"), "").unwrap();
    fs::write(dir.path().join("b.plugin.toml"), "").unwrap();
    fs::write(dir.path().join("plugin.toml"), "").unwrap();

    let found: Vec<PathBuf> = discover_plugin_files(dir.path());
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| is_plugin_file(p)));
}
