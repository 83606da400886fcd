//! Embeds local resources so the generated document is self-contained.
//!
//! | Reference                          | Becomes                         |
//! |------------------------------------|---------------------------------|
//! | `<link rel="stylesheet" href=..>`  | `<style>` with the file content |
//! | `<script src=..></script>`         | inline `<script>`               |
//! | `<img src="x.svg">`                | percent-encoded SVG data URI    |
//! | `<img src="x.png">`                | base64 data URI                 |
//!
//! Tags are located with `tl`, so markup inside comments is never touched.
//! Tags inside `<script>` or `<style>` content are text, not markup.
//!
//! Remote and `data:` references are left alone. A reference that cannot be
//! read is logged and kept as written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use super::minify::{minify_css, minify_js};
use crate::log;
use crate::template::resolve_reference;
use crate::utils::html::{attr, escape_attr, parse_attributes, render_attributes, split_start_tag};
use crate::utils::mime;

/// Elements whose content is raw text.
const RAW_TEXT: &[&str] = &["script", "style"];

/// Characters escaped in SVG data URIs.
const SVG_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Byte span of one element in the source document.
struct Span {
    name: String,
    start: usize,
    end: usize,
}

impl Span {
    fn within(&self, other: &Span) -> bool {
        other.start < self.start && self.end <= other.end
    }
}

/// Resolves and embeds local references.
pub struct Inliner<'a> {
    basedir: &'a Path,
    root: &'a Path,
    compress: bool,
}

impl<'a> Inliner<'a> {
    /// `basedir` resolves `/absolute` references, `root` everything else.
    pub fn new(basedir: &'a Path, root: &'a Path, compress: bool) -> Self {
        Self {
            basedir,
            root,
            compress,
        }
    }

    /// Inline every local stylesheet, script and image in `html`.
    pub fn inline(&self, html: &str) -> String {
        let spans = match element_spans(html) {
            Ok(spans) => spans,
            Err(e) => {
                log!("inline"; "could not parse the document, nothing inlined: {}", e);
                return html.to_string();
            }
        };
        let raw_text: Vec<&Span> = spans
            .iter()
            .filter(|s| RAW_TEXT.contains(&s.name.as_str()))
            .collect();

        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        for span in &spans {
            if span.start < cursor || raw_text.iter().any(|outer| span.within(outer)) {
                continue;
            }
            let source = &html[span.start..span.end];
            let replacement = match span.name.as_str() {
                "link" => self.stylesheet(source),
                "script" => self.script(source),
                "img" => self.image(source),
                _ => None,
            };
            if let Some(replacement) = replacement {
                out.push_str(&html[cursor..span.start]);
                out.push_str(&replacement);
                cursor = span.end;
            }
        }
        out.push_str(&html[cursor..]);
        out
    }

    fn stylesheet(&self, source: &str) -> Option<String> {
        let (attrs, _) = split_start_tag(source)?;
        let attrs = parse_attributes(attrs);
        let is_stylesheet = attr(&attrs, "rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
        let href = attr(&attrs, "href").filter(|_| is_stylesheet)?;

        self.embed(href, |path| {
            let css = read_text(path)?;
            let css = if self.compress {
                minify_css(&css).unwrap_or(css)
            } else {
                css
            };
            let media = attr(&attrs, "media")
                .map(|m| format!(" media=\"{}\"", escape_attr(m)))
                .unwrap_or_default();
            Ok(format!("<style{media}>{}</style>", css.replace("</style", "<\\/style")))
        })
    }

    /// Only empty `<script src>` elements are replaced.
    fn script(&self, source: &str) -> Option<String> {
        let (attrs, rest) = split_start_tag(source)?;
        let body = rest.rfind("</").map_or(rest, |end| &rest[..end]);
        if !body.trim().is_empty() {
            return None;
        }
        let attrs = parse_attributes(attrs);
        let src = attr(&attrs, "src")?;

        self.embed(src, |path| {
            let js = read_text(path)?;
            let js = if self.compress {
                minify_js(&js).unwrap_or(js)
            } else {
                js
            };
            Ok(format!(
                "<script{}>{}</script>",
                render_attributes(&attrs, &["src", "defer", "async"]),
                js.replace("</script", "<\\/script")
            ))
        })
    }

    fn image(&self, source: &str) -> Option<String> {
        let (attrs, _) = split_start_tag(source)?;
        let attrs = parse_attributes(attrs);
        let src = attr(&attrs, "src")?;

        self.embed(src, |path| {
            let uri = data_uri(path)?;
            Ok(format!(
                "<img src=\"{}\"{}>",
                escape_attr(&uri),
                render_attributes(&attrs, &["src"])
            ))
        })
    }

    /// `render(path)` for a local reference; `None` keeps the original tag.
    fn embed(&self, reference: &str, render: impl FnOnce(&Path) -> Result<String>) -> Option<String> {
        let path = self.local_path(reference)?;
        match render(&path) {
            Ok(replacement) => Some(replacement),
            Err(e) => {
                log!("inline"; "could not inline `{}`: {:#}", reference, e);
                None
            }
        }
    }

    /// Filesystem path of a local reference; `None` for remote ones.
    fn local_path(&self, reference: &str) -> Option<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() || is_remote(reference) {
            return None;
        }
        let reference = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference);
        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        let decoded = percent_decode_str(reference).decode_utf8_lossy();
        Some(resolve_reference(&decoded, self.basedir, self.root))
    }
}

/// Every element in `html`, ordered by position.
fn element_spans(html: &str) -> Result<Vec<Span>, tl::ParseError> {
    let dom = tl::parse(html, tl::ParserOptions::default())?;
    let parser = dom.parser();
    let mut spans: Vec<Span> = dom
        .nodes()
        .iter()
        .filter_map(tl::Node::as_tag)
        .map(|tag| {
            let (start, end) = tag.boundaries(parser);
            Span {
                name: tag.name().as_utf8_str().to_ascii_lowercase(),
                start,
                end: end + 1,
            }
        })
        .collect();
    spans.sort_by_key(|span| span.start);
    Ok(spans)
}

fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    ["http:", "https:", "//", "data:", "blob:", "about:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
}

/// Data URI for an image file.
fn data_uri(path: &Path) -> Result<String> {
    let mime = mime::from_path(path);
    if mime == mime::types::SVG {
        let svg = read_text(path)?;
        let encoded = utf8_percent_encode(svg.trim(), SVG_ESCAPE);
        return Ok(format!("data:{mime};charset=utf-8,{encoded}"));
    }

    let bytes = std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
