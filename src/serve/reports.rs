//! Reports under the server root.
//!
//! Every non-hidden directory directly under the root is a report. `GET`
//! renders the directory's master document; `POST` renders the request body
//! as if it were that master, so relative assets still resolve against the
//! report directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use super::response::Reply;
use super::route::Route;
use crate::config::{InlineConfig, detect_master};
use crate::debug;
use crate::html::{DocumentSource, HtmlGenerator};
use crate::plugin::AggregatedHooks;
use crate::template::TemplateEngine;

pub const BANNER: &str = "You have reached the quire report server";

/// Sorted names of the report directories under `root`.
pub fn list_reports(root: &Path) -> Result<Vec<String>> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("failed to read `{}`", root.display()))?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

/// Directory of report `id`, if `id` names one.
fn report_dir(root: &Path, id: &str) -> Option<PathBuf> {
    if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
        return None;
    }
    let dir = root.join(id);
    dir.is_dir().then_some(dir)
}

/// Answers routed requests.
pub struct ReportService {
    root: PathBuf,
    generator: HtmlGenerator,
    hooks: Arc<AggregatedHooks>,
    inline: InlineConfig,
}

impl ReportService {
    pub fn new(
        root: PathBuf,
        engine: Arc<dyn TemplateEngine>,
        hooks: Arc<AggregatedHooks>,
        inline: InlineConfig,
    ) -> Self {
        Self {
            root,
            generator: HtmlGenerator::new(engine),
            hooks,
            inline,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn reply(&self, route: Route, body: String) -> Reply {
        match route {
            Route::Banner => Reply::text(200, BANNER),
            Route::List => match list_reports(&self.root) {
                Ok(names) => Reply::json(&names),
                Err(e) => Reply::error(&e),
            },
            Route::Render { id, locals } => {
                finish(self.render(&id, &locals, None).await, &id)
            }
            Route::Submit { id, locals } => {
                finish(self.render(&id, &locals, Some(body)).await, &id)
            }
            Route::NotFound => Reply::not_found(),
            Route::MethodNotAllowed => Reply::text(405, "405 Method Not Allowed"),
        }
    }

    /// `Ok(None)` when `id` is not a report.
    async fn render(
        &self,
        id: &str,
        locals: &Value,
        content: Option<String>,
    ) -> Result<Option<String>> {
        let Some(dir) = report_dir(&self.root, id) else {
            return Ok(None);
        };

        let html = match content {
            Some(source) => {
                let master = dir.join(format!("{id}.hbs"));
                let doc = self.document(&master, locals);
                self.generator
                    .generate_from_content(source, doc, &self.hooks, &self.inline)
                    .await?
            }
            None => {
                let master = detect_master(&dir)?;
                let doc = self.document(&master, locals);
                self.generator
                    .generate(doc, &self.hooks, &self.inline)
                    .await?
            }
        };
        Ok(Some(html))
    }

    fn document<'a>(&'a self, master: &'a Path, locals: &'a Value) -> DocumentSource<'a> {
        DocumentSource {
            master,
            basedir: &self.root,
            locals,
        }
    }
}

fn finish(rendered: Result<Option<String>>, id: &str) -> Reply {
    match rendered {
        Ok(Some(html)) => Reply::html(html),
        Ok(None) => {
            debug!("serve"; "no report `{}`", id);
            Reply::not_found()
        }
        Err(e) => Reply::error(&e.context(format!("rendering report `{id}`"))),
    }
}
