//! Page-to-PDF rendering.
//!
//! # Module Structure
//!
//! ```text
//! render/
//! ├── idle       # Network idle waiter
//! ├── page_box   # Page size directives, header/footer pairing
//! ├── timing     # Build milestones
//! └── error      # RenderError
//! ```
//!
//! # Protocol
//!
//! 1. navigate to the generated file, bounded by the rendering timeout
//! 2. wait for the network to go idle
//! 3. extract `#page-header` / `#page-footer` and pair them
//! 4. base options, then page size directives from the document text
//! 5. first-pass page modifiers, then second-pass page modifiers
//! 6. print and write the PDF

mod error;
pub mod idle;
pub mod page_box;
pub mod timing;


pub use error::RenderError;
pub use idle::wait_for_network_idle;
pub use page_box::{HeaderFooter, PageBox};
pub use timing::{Milestone, Timings};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{BrowserError, BrowserPage, PdfOptions};
use crate::config::ProjectConfig;
use crate::plugin::{AggregatedHooks, HookChain, PageModifier};
use crate::utils::size::format_size;
use crate::{debug, log};

/// Rendering knobs taken from the project config.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub rendering_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_inflight: usize,
}

impl From<&ProjectConfig> for RenderSettings {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            rendering_timeout: config.rendering_timeout(),
            idle_timeout: config.network_idle.timeout(),
            max_inflight: config.network_idle.max_inflight,
        }
    }
}

/// Drives one page through the print protocol.
pub struct PdfRenderer<'a> {
    page: &'a dyn BrowserPage,
    hooks: &'a AggregatedHooks,
    settings: RenderSettings,
}

impl<'a> PdfRenderer<'a> {
    pub fn new(page: &'a dyn BrowserPage, hooks: &'a AggregatedHooks, settings: RenderSettings) -> Self {
        Self {
            page,
            hooks,
            settings,
        }
    }

    /// Render `html_path` (whose text is `html`) to `output`.
    ///
    /// Returns the PDF size in bytes.
    pub async fn render(
        &self,
        html_path: &Path,
        html: &str,
        output: &Path,
        timings: &mut Timings,
    ) -> Result<u64, RenderError> {
        let timeout = self.settings.rendering_timeout;
        match tokio::time::timeout(timeout, self.page.navigate(html_path)).await {
            Ok(Ok(())) => {}
            Ok(Err(BrowserError::RequestTimeout)) | Err(_) => {
                return Err(RenderError::NavigationTimeout(timeout));
            }
            Ok(Err(e)) => return Err(RenderError::Navigation(e)),
        }
        let took = timings.mark(Milestone::PageLoaded);
        debug!("render"; "{} in {}", Milestone::PageLoaded.label(), timing::seconds(took));

        wait_for_network_idle(self.page, self.settings.idle_timeout, self.settings.max_inflight).await;
        let took = timings.mark(Milestone::NetworkIdle);
        debug!("render"; "{} in {}", Milestone::NetworkIdle.label(), timing::seconds(took));

        let header = self.extract(page_box::HEADER_SELECTOR).await;
        let footer = self.extract(page_box::FOOTER_SELECTOR).await;
        let mut options = HeaderFooter::pair(header, footer).into_options();
        PageBox::scan(html).apply(&mut options);

        let options = self.run_pass(&self.hooks.page_modifiers, options).await?;
        let options = self.run_pass(&self.hooks.page_second_modifiers, options).await?;

        let pdf = self.page.print_pdf(&options).await.map_err(RenderError::Print)?;
        tokio::fs::write(output, &pdf)
            .await
            .map_err(|e| RenderError::Io(output.to_path_buf(), e))?;

        let size = pdf.len() as u64;
        let took = timings.mark(Milestone::PdfWritten);
        log!(
            "render";
            "{} in {} ({})",
            Milestone::PdfWritten.label(),
            timing::seconds(took),
            format_size(size)
        );
        Ok(size)
    }

    /// Inner HTML of a header/footer element; absence is not an error.
    async fn extract(&self, selector: &str) -> Option<String> {
        match self.page.inner_html(selector).await {
            Ok(html) => html,
            Err(e) => {
                debug!("render"; "no {}: {}", selector, e);
                None
            }
        }
    }

    /// Run one page-modifier pass over the pending options.
    async fn run_pass(
        &self,
        chain: &HookChain<Arc<dyn PageModifier>>,
        mut options: PdfOptions,
    ) -> Result<PdfOptions, RenderError> {
        let page = self.page;
        chain
            .fold(&mut options, |modifier, options| async move {
                modifier.modify(page, options).await?;
                Ok::<_, anyhow::Error>(options)
            })
            .await
            .map_err(RenderError::Hook)?;
        Ok(options)
    }
}
