//! Compression of inlined stylesheets and scripts.
//!
//! Uses lightningcss for CSS and oxc for JavaScript. Inlined scripts share
//! the page's global scope, so JavaScript is only reprinted compactly,
//! never mangled or tree-shaken.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Compact JavaScript source, or `None` if it does not parse.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .build(&ret.program)
        .code;
    Some(code)
}

/// Minify CSS source, or `None` if it does not parse.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css() {
        let css = minify_css("body {\n  color: #ff0000;\n}\n").unwrap();
        assert_eq!(css, "body{color:red}");
    }

    #[test]
    fn test_minify_js_keeps_globals() {
        let js = minify_js("function setupCharts() {\n  // comment\n  return 1;\n}\n").unwrap();
        assert!(js.contains("setupCharts"));
        assert!(!js.contains("comment"));
    }

    #[test]
    fn test_unparseable_input() {
        assert!(minify_js("function (").is_none());
    }
}
