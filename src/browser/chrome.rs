//! Chrome backend over the DevTools protocol.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Page};
use futures::{Stream, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::{BrowserError, BrowserPage, NetworkEvents, NetworkSignal, PdfOptions};
use crate::config::{BrowserConfig, MAX_RENDERING_TIMEOUT_SECS};
use crate::{debug, log};

/// Flags every session is launched with.
const LAUNCH_ARGS: &[&str] = &["--disable-translate", "--disable-extensions", "--disable-sync"];

/// Per-command protocol timeout.
///
/// Kept above the largest rendering timeout, so navigation is always bounded
/// by the configured value and never cut short by the protocol client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(MAX_RENDERING_TIMEOUT_SECS + 30);

/// Executable names tried on `PATH` when none is configured.
const EXECUTABLE_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// A launched browser and its one page.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    exceptions: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch headless Chrome and open a blank page.
    pub async fn launch(config: &BrowserConfig, no_sandbox: bool) -> Result<Self, BrowserError> {
        let mut builder = CdpConfig::builder().request_timeout(REQUEST_TIMEOUT);
        for arg in LAUNCH_ARGS.iter().map(|s| (*s).to_string()).chain(config.args.iter().cloned()) {
            builder = builder.arg(arg);
        }
        if no_sandbox || !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = discover_executable(config) {
            debug!("browser"; "using {}", executable.display());
            builder = builder.chrome_executable(executable);
        }
        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser"; "handler: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(protocol)?;

        let mut thrown = page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(protocol)?;
        let exceptions = tokio::spawn(async move {
            while let Some(event) = thrown.next().await {
                let details = &event.exception_details;
                let message = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                log!("page"; "{}", message);
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            exceptions,
        })
    }

    /// Close the browser and stop the protocol handler.
    pub async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("browser"; "close: {}", e);
        }
        browser.wait().await.ok();
        self.exceptions.abort();
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserPage for ChromeSession {
    async fn navigate(&self, path: &Path) -> Result<(), BrowserError> {
        let url = url::Url::from_file_path(path).map_err(|()| {
            BrowserError::Protocol(format!("`{}` is not an absolute path", path.display()))
        })?;
        // `goto` resolves on the load event, which follows DOMContentLoaded.
        self.page.goto(url.as_str()).await.map_err(protocol)?;
        Ok(())
    }

    async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        self.page.set_content(html).await.map_err(protocol)?;
        Ok(())
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        let selector = serde_json::to_string(selector)
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({selector}); return el ? el.innerHTML : null; }})()"
        );
        match self.evaluate(&script).await? {
            serde_json::Value::String(html) => Ok(Some(html)),
            _ => Ok(None),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self.page.evaluate(script).await.map_err(protocol)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn network_events(&self) -> Result<NetworkEvents, BrowserError> {
        let started = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(protocol)?;
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(protocol)?;
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(protocol)?;

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(NetworkEvents::new(rx)
            .with_task(forward(started, tx.clone(), NetworkSignal::RequestStarted))
            .with_task(forward(finished, tx.clone(), NetworkSignal::RequestFinished))
            .with_task(forward(failed, tx, NetworkSignal::RequestFailed)))
    }

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, BrowserError> {
        let (paper_width, paper_height) = options.paper_inches()?;
        let params = PrintToPdfParams {
            display_header_footer: Some(options.display_header_footer),
            print_background: Some(options.print_background),
            header_template: Some(options.header_template.clone()),
            footer_template: Some(options.footer_template.clone()),
            landscape: Some(options.landscape),
            scale: options.scale,
            paper_width,
            paper_height,
            // Margins come from the document's @page rules.
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            ..Default::default()
        };
        self.page.pdf(params).await.map_err(protocol)
    }
}

/// Forward every item of an event stream as `signal`.
fn forward<S>(stream: S, tx: mpsc::UnboundedSender<NetworkSignal>, signal: NetworkSignal) -> JoinHandle<()>
where
    S: Stream + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = std::pin::pin!(stream);
        while stream.next().await.is_some() {
            if tx.send(signal).is_err() {
                break;
            }
        }
    })
}

/// Configured executable, else the first known browser on `PATH`.
///
/// `None` lets the protocol client fall back to its own detection.
fn discover_executable(config: &BrowserConfig) -> Option<PathBuf> {
    config.executable_path().or_else(|| {
        EXECUTABLE_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
    })
}

#[inline]
fn protocol(err: CdpError) -> BrowserError {
    match err {
        CdpError::Timeout => BrowserError::RequestTimeout,
        err => BrowserError::Protocol(err.to_string()),
    }
}
