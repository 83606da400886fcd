//! Markdown blocks inside templates.

use anyhow::Result;
use async_trait::async_trait;
use pulldown_cmark::{Options, Parser, html};

use crate::plugin::{Capability, FilterOptions, HookBundle, Plugin, PluginParams};

pub const NAME: &str = "markdown";

pub struct MarkdownPlugin;

#[async_trait]
impl Plugin for MarkdownPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn construct(&self, _params: &PluginParams) -> Result<HookBundle> {
        Ok(HookBundle::new().with(Capability::filter(NAME, render)))
    }
}

fn render(text: &str, _options: &FilterOptions<'_>) -> Result<String> {
    let source = dedent(text);
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(&source, options));
    Ok(out)
}

/// Strip the indentation shared by all non-blank lines.
///
/// Template blocks are usually indented to match the surrounding markup,
/// which Markdown would otherwise read as code blocks.
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("    # Title\n\n      text"), "# Title\n\n  text");
        assert_eq!(dedent("flat"), "flat");
    }

    #[test]
    fn test_render_indented_block() {
        let params = serde_json::Map::new();
        let options = FilterOptions {
            filename: Path::new("doc.hbs"),
            params: &params,
        };
        let html = render("\n    # Title\n\n    | a |\n    |---|\n    | 1 |\n", &options).unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<table>"));
        assert!(!html.contains("<pre>"));
    }
}
