//! Render errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

/// Why a single render attempt was abandoned.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page loading timed out after {}s", .0.as_secs())]
    NavigationTimeout(Duration),

    #[error("page loading failed")]
    Navigation(#[source] BrowserError),

    #[error("page modifier failed")]
    Hook(#[source] anyhow::Error),

    #[error("PDF printing failed")]
    Print(#[source] BrowserError),

    #[error("failed to write `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl RenderError {
    /// What the user can do about it, if anything.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NavigationTimeout(_) => Some(
                "the document took too long to load; increase `page_rendering_timeout` \
                 (seconds) in the config file",
            ),
            Self::Navigation(_) => Some("check that the generated HTML file is readable"),
            _ => None,
        }
    }
}
