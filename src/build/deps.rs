//! Dependency pre-render pass.
//!
//! Runs once before the first build: every watcher source under the root
//! whose derived file is missing gets rendered, one at a time. Existing
//! derived files are never regenerated here, even when older than their
//! source; later edits go through the live watcher route instead.

use std::path::Path;

use anyhow::{Context, Result};

use crate::browser::BrowserPage;
use crate::plugin::{HookChain, Watcher};
use crate::utils::path::{collect_files, display_relative};
use crate::{debug, log};

/// Render missing derived files. Returns how many were written.
///
/// The first handler failure aborts the pass.
pub async fn resolve_dependencies(
    root: &Path,
    watchers: &HookChain<Watcher>,
    page: &dyn BrowserPage,
) -> Result<usize> {
    if watchers.is_empty() {
        return Ok(0);
    }

    let files = collect_files(root);
    let mut rendered = 0;

    for entry in watchers.iter() {
        let watcher = &entry.hook;
        for source in files.iter().filter(|path| watcher.matches(path)) {
            let Some(derived) = watcher.derived_path(source) else {
                continue;
            };
            if derived.exists() {
                debug!("deps"; "up to date: {}", display_relative(&derived, root));
                continue;
            }

            log!("deps"; "rendering {}", display_relative(source, root));
            watcher
                .handler
                .handle(source, &derived, page)
                .await
                .with_context(|| {
                    format!(
                        "plugin `{}` failed to render `{}`",
                        entry.plugin,
                        source.display()
                    )
                })?;
            rendered += 1;
        }
    }

    Ok(rendered)
}
