//! Document assembly.
//!
//! ```text
//! template headers ──┐
//! master template ───┴─> engine ─> skeleton + head elements ─> html modifiers ─> inline
//! ```
//!
//! A literal `.html` master skips everything but inlining.

mod inline;
mod minify;

pub use inline::Inliner;
pub use minify::{minify_css, minify_js};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::InlineConfig;
use crate::debug;
use crate::plugin::AggregatedHooks;
use crate::template::{TemplateEngine, TemplateJob};
use crate::utils::path::has_extension;

/// The master document and the bindings it renders with.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSource<'a> {
    pub master: &'a Path,
    pub basedir: &'a Path,
    pub locals: &'a serde_json::Value,
}

impl DocumentSource<'_> {
    fn is_literal_html(&self) -> bool {
        has_extension(self.master, ".html") || has_extension(self.master, ".htm")
    }

    fn root(&self) -> &Path {
        self.master.parent().unwrap_or(Path::new("."))
    }
}

/// Turns the master document into one self-contained HTML string.
#[derive(Clone)]
pub struct HtmlGenerator {
    engine: Arc<dyn TemplateEngine>,
}

impl HtmlGenerator {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    pub async fn generate(
        &self,
        doc: DocumentSource<'_>,
        hooks: &AggregatedHooks,
        inline: &InlineConfig,
    ) -> Result<String> {
        let master = doc.master.to_path_buf();
        let source = blocking("reading the master", move || read_master(&master)).await??;
        let html = if doc.is_literal_html() {
            source
        } else {
            self.assemble(source, doc, hooks).await?
        };
        self.inline(html, doc, inline).await
    }

    /// Same as [`generate`](Self::generate) for template text held in memory.
    ///
    /// `doc.master` only names the document: it anchors relative references
    /// and the `filename` binding, and need not exist.
    pub async fn generate_from_content(
        &self,
        source: String,
        doc: DocumentSource<'_>,
        hooks: &AggregatedHooks,
        inline: &InlineConfig,
    ) -> Result<String> {
        let html = self.assemble(source, doc, hooks).await?;
        self.inline(html, doc, inline).await
    }

    async fn inline(&self, html: String, doc: DocumentSource<'_>, inline: &InlineConfig) -> Result<String> {
        if !inline.enable {
            return Ok(html);
        }
        let basedir = doc.basedir.to_path_buf();
        let root = doc.root().to_path_buf();
        let compress = inline.compress;
        blocking("inlining", move || Inliner::new(&basedir, &root, compress).inline(&html)).await
    }

    /// Render the template and run it through the document hooks.
    async fn assemble(&self, master: String, doc: DocumentSource<'_>, hooks: &AggregatedHooks) -> Result<String> {
        let headers = hooks
            .template_headers
            .fold(String::new(), |fragment, mut acc| async move {
                if !acc.is_empty() {
                    acc.push_str("\n\n");
                }
                acc.push_str(fragment);
                Ok::<_, anyhow::Error>(acc)
            })
            .await?;

        let job = TemplateJob {
            source: format!("{headers}\n{master}"),
            master: doc.master.to_path_buf(),
            basedir: doc.basedir.to_path_buf(),
            locals: doc.locals.clone(),
            filters: hooks
                .filters
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(&entry.hook)))
                .collect(),
        };
        let engine = Arc::clone(&self.engine);
        let body = blocking("template rendering", move || engine.render(&job))
            .await?
            .with_context(|| format!("failed to render `{}`", doc.master.display()))?;
        debug!("build"; "template rendered ({} bytes)", body.len());

        let head: Vec<&str> = hooks.head_elements.iter().map(|e| e.hook.as_str()).collect();
        let html = wrap(&head.join("\n\n"), &body);

        hooks
            .html_modifiers
            .fold(html, |modifier, html| modifier.modify(html))
            .await
    }
}

/// Run filesystem-bound work off the async workers.
async fn blocking<T, F>(what: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .with_context(|| format!("{what} task panicked"))
}

fn read_master(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
}

fn wrap(head: &str, body: &str) -> String {
    format!(
        "<html>\n<head>\n<meta charset=\"UTF-8\">\n{head}\n</head>\n<body> {body} </body>\n</html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{Capability, FilterOptions, HookBundle};
    use crate::template::HandlebarsEngine;
    use std::fs;
    use tempfile::TempDir;

    fn generator() -> HtmlGenerator {
        HtmlGenerator::new(Arc::new(HandlebarsEngine::new()))
    }

    fn hooks(bundles: Vec<(&str, HookBundle)>) -> AggregatedHooks {
        let mut hooks = AggregatedHooks::default();
        for (name, bundle) in bundles {
            hooks.absorb(Arc::from(name), bundle);
        }
        hooks
    }

    async fn generate(dir: &TempDir, master: &str, hooks: &AggregatedHooks, inline: InlineConfig) -> Result<String> {
        let locals = serde_json::json!({ "title": "Quarterly" });
        let doc = DocumentSource {
            master: &dir.path().join(master),
            basedir: dir.path(),
            locals: &locals,
        };
        generator().generate(doc, hooks, &inline).await
    }

    fn no_inline() -> InlineConfig {
        InlineConfig {
            enable: false,
            compress: false,
        }
    }

    #[tokio::test]
    async fn test_template_assembly() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.hbs"), "<h1>{{title}}</h1>{{> greet}}").unwrap();
        let hooks = hooks(vec![
            (
                "a",
                HookBundle::new()
                    .with(Capability::TemplateHeader(r#"{{#*inline "greet"}}<p>hi</p>{{/inline}}"#.into()))
                    .with(Capability::HeadElement("<style>h1{}</style>".into())),
            ),
            ("b", HookBundle::new().with(Capability::HeadElement("<meta name=\"x\">".into()))),
        ]);

        let html = generate(&dir, "doc.hbs", &hooks, no_inline()).await.unwrap();
        assert!(html.starts_with(
            "<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>h1{}</style>\n\n<meta name=\"x\">\n</head>"
        ));
        assert!(html.contains("<body> \n<h1>Quarterly</h1><p>hi</p> </body>"));
    }

    #[tokio::test]
    async fn test_filters_exposed_to_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.hbs"), "{{#shout}}quiet{{/shout}}").unwrap();
        let shout = |text: &str, _: &FilterOptions<'_>| -> Result<String> { Ok(text.to_uppercase()) };
        let hooks = hooks(vec![("a", HookBundle::new().with(Capability::filter("shout", shout)))]);

        let html = generate(&dir, "doc.hbs", &hooks, no_inline()).await.unwrap();
        assert!(html.contains("<body> \nQUIET </body>"));
    }

    #[tokio::test]
    async fn test_html_modifiers_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.hbs"), "x").unwrap();
        let first = |html: String| -> Result<String> { Ok(html + "<!--1-->") };
        let second = |html: String| -> Result<String> {
            anyhow::ensure!(html.ends_with("<!--1-->"), "first modifier did not run");
            Ok(html + "<!--2-->")
        };
        let hooks = hooks(vec![
            ("a", HookBundle::new().with(Capability::html_modifier(first))),
            ("b", HookBundle::new().with(Capability::html_modifier(second))),
        ]);

        let html = generate(&dir, "doc.hbs", &hooks, no_inline()).await.unwrap();
        assert!(html.ends_with("</html><!--1--><!--2-->"));
    }

    #[tokio::test]
    async fn test_failing_modifier_names_plugin() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.hbs"), "x").unwrap();
        let broken = |_: String| -> Result<String> { anyhow::bail!("toc failed") };
        let hooks = hooks(vec![("toc", HookBundle::new().with(Capability::html_modifier(broken)))]);

        let err = generate(&dir, "doc.hbs", &hooks, no_inline()).await.unwrap_err();
        assert_eq!(format!("{err:#}"), "plugin `toc`: toc failed");
    }

    #[tokio::test]
    async fn test_literal_html_only_inlined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.css"), "p { margin: 0 }").unwrap();
        let source = r#"<link rel="stylesheet" href="style.css"><p>{{title}}</p>"#;
        fs::write(dir.path().join("doc.html"), source).unwrap();
        let modifier = |_: String| -> Result<String> { Ok(String::new()) };
        let hooks = hooks(vec![(
            "a",
            HookBundle::new()
                .with(Capability::HeadElement("<meta>".into()))
                .with(Capability::html_modifier(modifier)),
        )]);

        let html = generate(&dir, "doc.html", &hooks, InlineConfig::default()).await.unwrap();
        assert_eq!(html, "<style>p{margin:0}</style><p>{{title}}</p>");
    }

    #[tokio::test]
    async fn test_inline_disabled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.css"), "p {}").unwrap();
        let source = r#"<link rel="stylesheet" href="style.css">"#;
        fs::write(dir.path().join("doc.html"), source).unwrap();

        let html = generate(&dir, "doc.html", &AggregatedHooks::default(), no_inline())
            .await
            .unwrap();
        assert_eq!(html, source);
    }

    #[tokio::test]
    async fn test_generate_from_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.css"), "p { margin: 0 }").unwrap();
        let hooks = hooks(vec![("a", HookBundle::new().with(Capability::HeadElement("<meta>".into())))]);
        let locals = serde_json::json!({ "title": "Draft" });
        let doc = DocumentSource {
            master: &dir.path().join("unsaved.hbs"),
            basedir: dir.path(),
            locals: &locals,
        };
        let source = r#"<link rel="stylesheet" href="style.css"><h1>{{title}}</h1>"#.to_string();

        let html = generator()
            .generate_from_content(source, doc, &hooks, &InlineConfig::default())
            .await
            .unwrap();
        assert!(html.contains("<meta>"));
        assert!(html.contains("<style>p{margin:0}</style><h1>Draft</h1>"));
        assert!(!dir.path().join("unsaved.hbs").exists());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_work_leaves_runtime_free() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let ticker = tokio::spawn(async move { tx.send(()).ok() });
        let waited = blocking("waiting", move || rx.blocking_recv().is_ok()).await.unwrap();
        assert!(waited);
        ticker.await.unwrap();

        let err = blocking("exploding", || panic!("boom")).await.map(|()| ()).unwrap_err();
        assert!(err.to_string().contains("exploding task panicked"));
    }

    #[tokio::test]
    async fn test_missing_master() {
        let dir = TempDir::new().unwrap();
        let err = generate(&dir, "gone.hbs", &AggregatedHooks::default(), no_inline())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gone.hbs"));
    }
}
