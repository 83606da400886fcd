//! Page geometry and header/footer templates.
//!
//! Documents declare their page box with CSS custom-property directives
//! anywhere in the text:
//!
//! ```css
//! :root { -relaxed-page-width: 8.5in; -relaxed-page-height: 11in; }
//! :root { -relaxed-page-size: A5; }
//! ```
//!
//! Header and footer templates come from `#page-header` and `#page-footer`.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::PdfOptions;

pub const HEADER_SELECTOR: &str = "#page-header";
pub const FOOTER_SELECTOR: &str = "#page-footer";

/// Stands in for the missing side when only one of header/footer is given.
const PLACEHOLDER: &str = "<span></span>";

static WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-relaxed-page-width:\s*([^\s;]+)\s*;").unwrap());
static HEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-relaxed-page-height:\s*([^\s;]+)\s*;").unwrap());
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-relaxed-page-size:\s*([^\s;]+)\s*;").unwrap());

/// Page box directives found in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBox {
    pub width: Option<String>,
    pub height: Option<String>,
    pub size: Option<String>,
}

impl PageBox {
    /// Scan document text for the directives. The first occurrence of each wins.
    pub fn scan(html: &str) -> Self {
        let capture = |re: &Regex| re.captures(html).map(|c| c[1].to_string());
        Self {
            width: capture(&WIDTH),
            height: capture(&HEIGHT),
            size: capture(&SIZE),
        }
    }

    /// Override whichever options the document declared.
    pub fn apply(&self, options: &mut PdfOptions) {
        if let Some(width) = &self.width {
            options.width = Some(width.clone());
        }
        if let Some(height) = &self.height {
            options.height = Some(height.clone());
        }
        if let Some(size) = &self.size {
            options.format = Some(size.clone());
        }
    }
}

/// Header and footer templates after pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFooter {
    pub header: String,
    pub footer: String,
}

impl HeaderFooter {
    /// Pair extracted templates: one side present means both are shown,
    /// the missing side as an empty placeholder.
    pub fn pair(header: Option<String>, footer: Option<String>) -> Self {
        let header = header.unwrap_or_default();
        let footer = footer.unwrap_or_default();

        if header.is_empty() && footer.is_empty() {
            return Self::default();
        }
        Self {
            header: or_placeholder(header),
            footer: or_placeholder(footer),
        }
    }

    #[inline]
    pub fn display(&self) -> bool {
        !self.header.is_empty() || !self.footer.is_empty()
    }

    /// Base print options for this document.
    pub fn into_options(self) -> PdfOptions {
        PdfOptions {
            display_header_footer: self.display(),
            print_background: true,
            header_template: self.header,
            footer_template: self.footer,
            ..Default::default()
        }
    }
}

fn or_placeholder(template: String) -> String {
    if template.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_width() {
        let page_box = PageBox::scan("<style>:root{ -relaxed-page-width: 8.5in; }</style>");
        assert_eq!(page_box.width.as_deref(), Some("8.5in"));
        assert_eq!(page_box.height, None);

        let mut options = PdfOptions::default();
        page_box.apply(&mut options);
        assert_eq!(options.width.as_deref(), Some("8.5in"));
        assert_eq!(options.format, None);
    }

    #[test]
    fn test_scan_size_and_dimensions_together() {
        let html = "-relaxed-page-size: A5; -relaxed-page-height:20cm;";
        let page_box = PageBox::scan(html);
        assert_eq!(page_box.size.as_deref(), Some("A5"));
        assert_eq!(page_box.height.as_deref(), Some("20cm"));
    }

    #[test]
    fn test_absent_directives_keep_defaults() {
        let mut options = PdfOptions::default();
        PageBox::scan("<p>plain</p>").apply(&mut options);
        assert_eq!(options, PdfOptions::default());
    }

    #[test]
    fn test_pair_header_only() {
        let pair = HeaderFooter::pair(Some("<b>Title</b>".into()), None);
        assert_eq!(pair.footer, PLACEHOLDER);
        assert!(pair.display());

        let options = pair.into_options();
        assert!(options.display_header_footer);
        assert!(options.print_background);
        assert_eq!(options.header_template, "<b>Title</b>");
    }

    #[test]
    fn test_pair_footer_only() {
        let pair = HeaderFooter::pair(Some(String::new()), Some("p. <span class=\"pageNumber\"></span>".into()));
        assert_eq!(pair.header, PLACEHOLDER);
        assert!(pair.display());
    }

    #[test]
    fn test_pair_neither() {
        let options = HeaderFooter::pair(None, Some(String::new())).into_options();
        assert!(!options.display_header_footer);
        assert!(options.print_background);
        assert!(options.header_template.is_empty());
        assert!(options.footer_template.is_empty());
    }
}
