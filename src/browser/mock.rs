//! Recording in-memory page for tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::{BrowserError, BrowserPage, NetworkEvents, NetworkSignal, PdfOptions};

/// Bytes returned by every print call.
pub const MOCK_PDF: &[u8] = b"%PDF-1.7 mock";

#[derive(Default)]
struct State {
    calls: Vec<String>,
    elements: FxHashMap<String, String>,
    eval_result: Option<serde_json::Value>,
    navigate_delay: Option<Duration>,
    fail_navigation: bool,
    timeout_navigation: bool,
    network: Vec<mpsc::UnboundedSender<NetworkSignal>>,
    printed: Vec<PdfOptions>,
    navigated: Vec<PathBuf>,
    content: Option<String>,
}

/// A `BrowserPage` that records every call.
#[derive(Clone, Default)]
pub struct MockPage {
    state: Arc<Mutex<State>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_element(&self, selector: &str, html: &str) {
        self.state
            .lock()
            .elements
            .insert(selector.to_string(), html.to_string());
    }

    pub fn set_eval_result(&self, value: serde_json::Value) {
        self.state.lock().eval_result = Some(value);
    }

    pub fn set_navigate_delay(&self, delay: Duration) {
        self.state.lock().navigate_delay = Some(delay);
    }

    pub fn fail_navigation(&self) {
        self.state.lock().fail_navigation = true;
    }

    /// Make navigation fail the way an expired protocol request does.
    pub fn timeout_navigation(&self) {
        self.state.lock().timeout_navigation = true;
    }

    /// Push a network signal to every live subscription.
    pub fn emit(&self, signal: NetworkSignal) {
        self.state
            .lock()
            .network
            .retain(|tx| tx.send(signal).is_ok());
    }

    /// Number of subscriptions that are still listening.
    pub fn live_subscriptions(&self) -> usize {
        self.state.lock().network.iter().filter(|tx| !tx.is_closed()).count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn printed(&self) -> Vec<PdfOptions> {
        self.state.lock().printed.clone()
    }

    pub fn navigated(&self) -> Vec<PathBuf> {
        self.state.lock().navigated.clone()
    }

    pub fn content(&self) -> Option<String> {
        self.state.lock().content.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&self, path: &Path) -> Result<(), BrowserError> {
        self.record("navigate");
        let (delay, fail, timeout) = {
            let mut state = self.state.lock();
            state.navigated.push(path.to_path_buf());
            (state.navigate_delay, state.fail_navigation, state.timeout_navigation)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if timeout {
            return Err(BrowserError::RequestTimeout);
        }
        if fail {
            return Err(BrowserError::Protocol("net::ERR_FILE_NOT_FOUND".into()));
        }
        Ok(())
    }

    async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        self.record("set_content");
        self.state.lock().content = Some(html.to_string());
        Ok(())
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        self.record(format!("inner_html:{selector}"));
        Ok(self.state.lock().elements.get(selector).cloned())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.record(format!("evaluate:{script}"));
        Ok(self
            .state
            .lock()
            .eval_result
            .clone()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn network_events(&self) -> Result<NetworkEvents, BrowserError> {
        self.record("network_events");
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().network.push(tx);
        Ok(NetworkEvents::new(rx))
    }

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, BrowserError> {
        self.record("print_pdf");
        self.state.lock().printed.push(options.clone());
        Ok(MOCK_PDF.to_vec())
    }
}
