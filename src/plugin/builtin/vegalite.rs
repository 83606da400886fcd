//! Vega-Lite charts.
//!
//! The watcher renders `chart.vegalite.json` to `chart.svg` on the shared
//! page; the `vegalite` filter embeds a chart that renders at print time.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::browser::BrowserPage;
use crate::plugin::{
    Capability, FilterOptions, HookBundle, Plugin, PluginParams, Watcher, WatcherHandler,
};
use crate::utils::path::resolve_path;

pub const NAME: &str = "vegalite";

const VEGA: &str = "https://cdn.jsdelivr.net/npm/vega@5";
const VEGA_LITE: &str = "https://cdn.jsdelivr.net/npm/vega-lite@5";
const VEGA_EMBED: &str = "https://cdn.jsdelivr.net/npm/vega-embed@6";

/// How long a chart may take to produce its SVG.
const CHART_TIMEOUT: Duration = Duration::from_secs(10);

pub struct VegaLitePlugin;

#[async_trait]
impl Plugin for VegaLitePlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn construct(&self, _params: &PluginParams) -> Result<HookBundle> {
        Ok(HookBundle::new()
            .with(Capability::Watcher(Watcher::new(
                [".vegalite.json"],
                ".svg",
                std::sync::Arc::new(SvgRenderer),
            )))
            .with(Capability::filter(NAME, embed_filter)))
    }
}

/// Renders a chart spec to a standalone SVG file.
struct SvgRenderer;

#[async_trait]
impl WatcherHandler for SvgRenderer {
    async fn handle(&self, source: &Path, output: &Path, page: &dyn BrowserPage) -> Result<()> {
        let text = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read `{}`", source.display()))?;
        let spec = script_json(&text)?;

        page.set_content(&chart_page(&spec)).await?;
        page.wait_for_selector("#vis svg", CHART_TIMEOUT).await?;
        let svg = page
            .evaluate("document.querySelector('#vis svg').outerHTML")
            .await?;
        let Some(svg) = svg.as_str() else {
            bail!("chart produced no SVG");
        };

        tokio::fs::write(output, svg)
            .await
            .with_context(|| format!("failed to write `{}`", output.display()))
    }
}

/// `{{#vegalite}}{ ...spec... }{{/vegalite}}` or `{{#vegalite file="chart.json"}}{{/vegalite}}`.
fn embed_filter(text: &str, options: &FilterOptions<'_>) -> Result<String> {
    let spec = match options.param_str("file") {
        Some(file) => {
            let dir = options.filename.parent().unwrap_or(Path::new("."));
            let path = resolve_path(Path::new(file), dir);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read `{}`", path.display()))?;
            script_json(&content)?
        }
        None => script_json(text)?,
    };

    Ok(format!(
        r#"<div class="vegalite"></div><script>
(() => {{
  const target = document.currentScript.previousElementSibling;
  const load = (src) => new Promise((ok, fail) => {{
    const s = document.createElement('script');
    s.src = src; s.onload = ok; s.onerror = fail;
    document.head.appendChild(s);
  }});
  window.__vegaReady = window.__vegaReady ||
    ["{VEGA}", "{VEGA_LITE}", "{VEGA_EMBED}"].reduce((p, src) => p.then(() => load(src)), Promise.resolve());
  window.__vegaReady.then(() => vegaEmbed(target, {spec}, {{ renderer: 'svg', actions: false }}));
}})();
</script>"#
    ))
}

/// Validate a spec and serialize it for embedding in a `<script>`.
fn script_json(text: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("invalid Vega-Lite spec")?;
    let json = serde_json::to_string(&value)?;
    Ok(json.replace("</", "<\\/"))
}

fn chart_page(spec: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta charset="UTF-8">
<script src="{VEGA}"></script>
<script src="{VEGA_LITE}"></script>
<script src="{VEGA_EMBED}"></script>
</head><body><div id="vis"></div>
<script>vegaEmbed('#vis', {spec}, {{ renderer: 'svg', actions: false }});</script>
</body></html>"#
    )
}
