//! Headless browser session.
//!
//! The build drives exactly one long-lived page through [`BrowserPage`].
//! The Chrome backend lives in `chrome`; tests use the recording double in
//! `mock`.
//!
//! # Network events
//!
//! [`BrowserPage::network_events`] hands out a subscription. Signals flow
//! through an mpsc channel; dropping the [`NetworkEvents`] value stops the
//! forwarding tasks, which is how the idle waiter unsubscribes.

mod chrome;
mod options;

#[cfg(test)]
pub mod mock;

pub use chrome::ChromeSession;
pub use options::{PdfOptions, css_length_to_inches, paper_size};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Browser session errors.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    /// The protocol client gave up waiting for a command's response.
    #[error("browser request timed out")]
    RequestTimeout,

    #[error("no element matches `{0}`")]
    MissingElement(String),

    #[error("timed out after {0:?} waiting for `{1}`")]
    Timeout(Duration, String),

    #[error("invalid print option: {0}")]
    InvalidOption(String),
}

/// A page-level network signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSignal {
    RequestStarted,
    RequestFinished,
    RequestFailed,
}

/// Live subscription to a page's network signals.
///
/// Dropping it aborts the forwarding tasks.
pub struct NetworkEvents {
    rx: mpsc::UnboundedReceiver<NetworkSignal>,
    guards: Vec<AbortOnDrop>,
}

impl NetworkEvents {
    pub fn new(rx: mpsc::UnboundedReceiver<NetworkSignal>) -> Self {
        Self {
            rx,
            guards: Vec::new(),
        }
    }

    /// Tie a forwarding task to this subscription.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.guards.push(AbortOnDrop(task));
        self
    }

    /// Next signal, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<NetworkSignal> {
        self.rx.recv().await
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The single persistent page every build runs against.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to a local file, waiting for load and DOMContentLoaded.
    async fn navigate(&self, path: &Path) -> Result<(), BrowserError>;

    /// Replace the document with `html`.
    async fn set_content(&self, html: &str) -> Result<(), BrowserError>;

    /// Inner HTML of the first element matching `selector`, if any.
    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// Evaluate a script and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Subscribe to request started/finished/failed signals.
    async fn network_events(&self) -> Result<NetworkEvents, BrowserError>;

    /// Print the current document.
    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, BrowserError>;

    /// Poll until an element matching `selector` exists.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        const POLL: Duration = Duration::from_millis(50);

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.inner_html(selector).await?.is_some() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(timeout, selector.to_string()));
            }
            tokio::time::sleep(POLL).await;
        }
    }
}
