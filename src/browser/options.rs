//! Print options and CSS unit conversion.

use super::BrowserError;

/// Options for printing the current page to PDF.
///
/// Lengths are kept as CSS strings (`"8.5in"`, `"210mm"`) until the print
/// call, so page modifiers see and edit the same values a document declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfOptions {
    pub display_header_footer: bool,
    pub print_background: bool,
    pub header_template: String,
    pub footer_template: String,
    pub width: Option<String>,
    pub height: Option<String>,
    /// Named paper size, e.g. `A4` or `Letter`.
    pub format: Option<String>,
    pub landscape: bool,
    pub scale: Option<f64>,
}

impl PdfOptions {
    /// Paper width and height in inches.
    ///
    /// The named format supplies both dimensions; an explicit width or
    /// height overrides its side. `None` leaves the engine default.
    pub fn paper_inches(&self) -> Result<(Option<f64>, Option<f64>), BrowserError> {
        let (mut width, mut height) = match &self.format {
            Some(name) => {
                let (w, h) = paper_size(name)
                    .ok_or_else(|| BrowserError::InvalidOption(format!("unknown page size `{name}`")))?;
                (Some(w), Some(h))
            }
            None => (None, None),
        };

        if let Some(w) = &self.width {
            width = Some(css_length_to_inches(w)?);
        }
        if let Some(h) = &self.height {
            height = Some(css_length_to_inches(h)?);
        }
        Ok((width, height))
    }
}

/// Convert a CSS length (`px`, `in`, `cm`, `mm`, or a bare pixel count) to inches.
pub fn css_length_to_inches(value: &str) -> Result<f64, BrowserError> {
    let value = value.trim();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| BrowserError::InvalidOption(format!("invalid length `{value}`")))?;

    let inches = match unit.to_ascii_lowercase().as_str() {
        "" | "px" => number / 96.0,
        "in" => number,
        "cm" => number / 2.54,
        "mm" => number / 25.4,
        other => {
            return Err(BrowserError::InvalidOption(format!(
                "unsupported unit `{other}` in `{value}`"
            )));
        }
    };
    Ok(inches)
}

/// Width and height in inches of a named paper size (case-insensitive).
pub fn paper_size(name: &str) -> Option<(f64, f64)> {
    let size = match name.to_ascii_lowercase().as_str() {
        "letter" => (8.5, 11.0),
        "legal" => (8.5, 14.0),
        "tabloid" => (11.0, 17.0),
        "ledger" => (17.0, 11.0),
        "a3" => (11.7, 16.54),
        "a4" => (8.27, 11.7),
        "a5" => (5.83, 8.27),
        _ => return None,
    };
    Some(size)
}
