//! Handlebars implementation.
//!
//! # Scope
//!
//! | Binding    | Value                                   |
//! |------------|-----------------------------------------|
//! | `basedir`  | base directory for `/absolute` paths    |
//! | `__root__` | directory of the master document        |
//! | `filename` | master document path                    |
//! | locals     | every key of `--locals`                 |
//!
//! # Helpers
//!
//! - `{{{read "chart.svg"}}}` file contents
//! - `{{{select html "h2.title"}}}` outer HTML of matching nodes
//! - `{{elapsed}}` milliseconds since rendering started
//! - `{{#name key="v"}}...{{/name}}` for every content filter

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, JsonRender, Output, RenderContext,
    RenderError, RenderErrorReason, Renderable, ScopedJson, StringOutput,
};
use serde_json::Value as Json;

use super::{TemplateEngine, TemplateJob, resolve_reference};
use crate::plugin::{ContentFilter, FilterOptions};

#[derive(Debug, Default)]
pub struct HandlebarsEngine;

impl HandlebarsEngine {
    pub fn new() -> Self {
        Self
    }

    fn registry(job: &TemplateJob) -> Handlebars<'static> {
        let mut hb = Handlebars::new();
        hb.register_helper(
            "read",
            Box::new(ReadHelper {
                basedir: job.basedir.clone(),
                root: job.root().to_path_buf(),
            }),
        );
        hb.register_helper("select", Box::new(SelectHelper));
        hb.register_helper(
            "elapsed",
            Box::new(ElapsedHelper {
                started: Instant::now(),
            }),
        );
        for (name, filter) in &job.filters {
            hb.register_helper(
                name,
                Box::new(FilterHelper {
                    filter: Arc::clone(filter),
                    filename: job.master.clone(),
                }),
            );
        }
        hb
    }

    fn scope(job: &TemplateJob) -> Json {
        let mut scope = match &job.locals {
            Json::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        let path = |p: &Path| Json::String(p.display().to_string());
        scope.insert("basedir".into(), path(&job.basedir));
        scope.insert("__root__".into(), path(job.root()));
        scope.insert("filename".into(), path(&job.master));
        Json::Object(scope)
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, job: &TemplateJob) -> Result<String> {
        let hb = Self::registry(job);
        Ok(hb.render_template(&job.source, &Self::scope(job))?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn other(message: impl Into<String>) -> RenderError {
    RenderErrorReason::Other(message.into()).into()
}

/// Block helper running the inner content through a content filter.
struct FilterHelper {
    filter: Arc<dyn ContentFilter>,
    filename: PathBuf,
}

impl HelperDef for FilterHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let mut inner = StringOutput::new();
        if let Some(template) = h.template() {
            template.render(r, ctx, rc, &mut inner)?;
        }
        let text = inner.into_string().map_err(|e| other(e.to_string()))?;

        let params: serde_json::Map<String, Json> = h
            .hash()
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.value().clone()))
            .collect();
        let options = FilterOptions {
            filename: &self.filename,
            params: &params,
        };

        let result = self
            .filter
            .apply(&text, &options)
            .map_err(|e| other(format!("filter `{}`: {e:#}", h.name())))?;
        out.write(&result)?;
        Ok(())
    }
}

/// `read path`: file contents as a string.
struct ReadHelper {
    basedir: PathBuf,
    root: PathBuf,
}

impl HelperDef for ReadHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let reference = h
            .param(0)
            .and_then(|p| p.value().as_str())
            .ok_or_else(|| other("`read` expects a path"))?;
        let path = resolve_reference(reference, &self.basedir, &self.root);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| other(format!("read `{}`: {e}", path.display())))?;
        Ok(ScopedJson::Derived(Json::String(content)))
    }
}

/// `select html selector`: outer HTML of every match, concatenated.
struct SelectHelper;

impl HelperDef for SelectHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let html = h
            .param(0)
            .map(|p| p.value().render())
            .ok_or_else(|| other("`select` expects HTML and a selector"))?;
        let selector = h
            .param(1)
            .and_then(|p| p.value().as_str())
            .ok_or_else(|| other("`select` expects HTML and a selector"))?;

        Ok(ScopedJson::Derived(Json::String(select(&html, selector)?)))
    }
}

fn select(html: &str, selector: &str) -> Result<String, RenderError> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|e| other(format!("select: {e}")))?;
    let parser = dom.parser();
    let Some(matches) = dom.query_selector(selector) else {
        return Err(other(format!("select: invalid selector `{selector}`")));
    };
    Ok(matches
        .filter_map(|handle| handle.get(parser))
        .map(|node| node.outer_html(parser).to_string())
        .collect())
}

/// `elapsed`: milliseconds since the render started.
struct ElapsedHelper {
    started: Instant,
}

impl HelperDef for ElapsedHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        _: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let millis = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(ScopedJson::Derived(Json::from(millis)))
    }
}
