//! Build scheduling.
//!
//! # Module Structure
//!
//! ```text
//! build/
//! ├── context    # BuildContext: paths, config, hooks, page
//! ├── gate       # Single-permit gate and ConcurrencyPolicy
//! ├── trigger    # Changed path -> BuildTrigger
//! └── deps       # Startup dependency pass
//! ```
//!
//! # Routing
//!
//! | Trigger   | Gate                | Action                            |
//! |-----------|---------------------|-----------------------------------|
//! | `Reload`  | waits for the build | reload config, re-init plugins    |
//! | `Watcher` | drop if busy        | regenerate one derived file       |
//! | `Ignore`  | none                | logged at debug level             |
//! | `Rebuild` | drop if busy        | HTML generation, then PDF render  |

mod context;
mod deps;
mod gate;
mod trigger;


pub use context::BuildContext;
pub use deps::resolve_dependencies;
pub use gate::{BuildGate, BuildPermit, ConcurrencyPolicy};
pub use trigger::BuildTrigger;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{ConfigError, ProjectConfig};
use crate::html::DocumentSource;
use crate::logger::{status_error, status_success};
use crate::plugin::AggregatedHooks;
use crate::render::{Milestone, PdfRenderer, RenderError, RenderSettings, Timings, timing};
use crate::utils::path::display_relative;
use crate::utils::size::format_size;
use crate::{debug, log};

/// What handling one trigger amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// PDF written.
    Built,
    /// Intermediate HTML written (`--html-only`).
    HtmlWritten,
    /// One derived file regenerated by a watcher.
    Regenerated,
    /// Config and plugins reloaded.
    Reloaded,
    /// Config file touched but its content did not change.
    Unchanged,
    Ignored,
    /// Gate was busy; the trigger was discarded.
    Dropped,
    Failed,
}

/// Result of one successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Owns the build context and the gate in front of the shared page.
pub struct BuildScheduler {
    ctx: BuildContext,
    gate: BuildGate,
}

impl BuildScheduler {
    pub fn new(ctx: BuildContext, policy: ConcurrencyPolicy) -> Self {
        Self {
            ctx,
            gate: BuildGate::new(policy),
        }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn gate(&self) -> &BuildGate {
        &self.gate
    }

    /// Render every missing derived file. Runs once, before the first build.
    pub async fn prepare(&self) -> Result<usize> {
        let _permit = self.gate.enter().await;
        let hooks = self.ctx.hooks();
        let count =
            resolve_dependencies(&self.ctx.paths.input_dir, &hooks.watchers, self.ctx.page.as_ref())
                .await?;
        if count > 0 {
            log!("deps"; "rendered {} missing dependenc{}", count, if count == 1 { "y" } else { "ies" });
        }
        Ok(count)
    }

    /// Build the master document, waiting for the gate if needed.
    pub async fn build_now(&self) -> Result<BuildReport> {
        let _permit = self.gate.enter().await;
        self.build().await
    }

    /// Route one changed path.
    pub async fn handle(&self, path: &Path) -> Outcome {
        let config = self.ctx.config.get();
        let hooks = self.ctx.hooks();
        let trigger = BuildTrigger::classify(path, &self.ctx.paths, &config.watch, &hooks);
        let name = display_relative(path, &self.ctx.paths.input_dir);

        match trigger {
            BuildTrigger::Reload(path) => self.reload(&path).await,
            BuildTrigger::Watcher(path) => self.regenerate(&path, &hooks).await,
            BuildTrigger::Ignore(_) => {
                debug!("watch"; "no process defined for {}", name);
                Outcome::Ignored
            }
            BuildTrigger::Rebuild(_) => {
                let Some(_permit) = self.gate.try_enter() else {
                    debug!("watch"; "{}: ignoring trigger, too busy", name);
                    return Outcome::Dropped;
                };
                log!("build"; "processing {}", name);
                match self.build().await {
                    Ok(report) => {
                        status_success(&format!(
                            "{} ({}) in {}",
                            display_relative(&report.output, &self.ctx.paths.input_dir),
                            format_size(report.bytes),
                            timing::seconds(report.elapsed)
                        ));
                        if self.ctx.html_only {
                            Outcome::HtmlWritten
                        } else {
                            Outcome::Built
                        }
                    }
                    Err(e) => {
                        report_failure("build failed", &e);
                        Outcome::Failed
                    }
                }
            }
        }
    }

    /// Generate the HTML, write it, then render the PDF.
    ///
    /// Callers hold the gate.
    async fn build(&self) -> Result<BuildReport> {
        let config = self.ctx.config.get();
        let hooks = self.ctx.hooks();
        let paths = &self.ctx.paths;
        let mut timings = Timings::start();

        let doc = DocumentSource {
            master: &paths.master,
            basedir: &paths.basedir,
            locals: &self.ctx.locals,
        };
        let html = self.ctx.generator.generate(doc, &hooks, &config.inline).await?;
        tokio::fs::write(&paths.temp_html, &html)
            .await
            .with_context(|| format!("failed to write `{}`", paths.temp_html.display()))?;
        let took = timings.mark(Milestone::HtmlReady);
        debug!("build"; "{} in {}", Milestone::HtmlReady.label(), timing::seconds(took));

        if self.ctx.html_only {
            return Ok(BuildReport {
                output: paths.temp_html.clone(),
                bytes: html.len() as u64,
                elapsed: timings.total(),
            });
        }

        let renderer = PdfRenderer::new(self.ctx.page.as_ref(), &hooks, RenderSettings::from(config.as_ref()));
        let bytes = renderer
            .render(&paths.temp_html, &html, &paths.output, &mut timings)
            .await?;
        Ok(BuildReport {
            output: paths.output.clone(),
            bytes,
            elapsed: timings.total(),
        })
    }

    /// Regenerate the derived file of one watcher source.
    async fn regenerate(&self, source: &Path, hooks: &AggregatedHooks) -> Outcome {
        let root = &self.ctx.paths.input_dir;
        let Some(entry) = hooks.watcher_for(source) else {
            return Outcome::Ignored;
        };
        let Some(derived) = entry.hook.derived_path(source) else {
            return Outcome::Ignored;
        };
        let Some(_permit) = self.gate.try_enter() else {
            debug!("watch"; "{}: ignoring trigger, too busy", display_relative(source, root));
            return Outcome::Dropped;
        };

        log!("build"; "processing {}", display_relative(source, root));
        let started = std::time::Instant::now();
        let result = entry
            .hook
            .handler
            .handle(source, &derived, self.ctx.page.as_ref())
            .await
            .with_context(|| format!("plugin `{}`", entry.plugin));

        match result {
            Ok(()) => {
                status_success(&format!(
                    "{} in {}",
                    display_relative(&derived, root),
                    timing::seconds(started.elapsed())
                ));
                Outcome::Regenerated
            }
            Err(e) => {
                report_failure(&format!("failed to render {}", display_relative(source, root)), &e);
                Outcome::Failed
            }
        }
    }

    /// Reload config (if it changed) and rebuild the hook set from scratch.
    ///
    /// Waits for any in-flight build. On failure the previous hooks stay
    /// active.
    async fn reload(&self, path: &Path) -> Outcome {
        let _permit = self.gate.enter().await;

        if crate::config::is_config_file(path, &self.ctx.paths.input_dir) {
            match self.reload_config() {
                Ok(true) => log!("config"; "reloaded"),
                Ok(false) => {
                    debug!("config"; "unchanged");
                    return Outcome::Unchanged;
                }
                Err(e) => {
                    report_failure(
                        "config reload failed, keeping the previous configuration",
                        &anyhow::Error::from(e),
                    );
                    return Outcome::Failed;
                }
            }
        }

        let config = self.ctx.config.get();
        match self.ctx.registry.initialize(&config).await {
            Ok(hooks) => {
                let names = hooks.plugins.join(", ");
                self.ctx.replace_hooks(hooks);
                status_success(&format!("plugins reloaded: {names}"));
                Outcome::Reloaded
            }
            Err(e) => {
                report_failure(
                    "plugin reload failed, keeping the previous plugins",
                    &anyhow::Error::from(e),
                );
                Outcome::Failed
            }
        }
    }

    /// Returns whether the active config changed.
    fn reload_config(&self) -> Result<bool, ConfigError> {
        let handle = &self.ctx.config;
        match self.ctx.config_file() {
            Some(file) => handle.reload(&file),
            None if handle.content_hash() != 0 => {
                handle.store(ProjectConfig::default());
                handle.set_content_hash(0);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Print a failure with its cause chain and, for render errors, a hint.
pub fn report_failure(summary: &str, err: &anyhow::Error) {
    let mut detail = format!("{err:#}");
    if let Some(hint) = err.downcast_ref::<RenderError>().and_then(RenderError::hint) {
        detail.push_str("\nhint: ");
        detail.push_str(hint);
    }
    status_error(summary, &detail);
}
