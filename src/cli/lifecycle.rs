//! Process lifecycle: startup, the watch loop or the report server, shutdown.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::Notify;

use super::Cli;
use crate::browser::{BrowserPage, ChromeSession};
use crate::build::{BuildContext, BuildScheduler, ConcurrencyPolicy, report_failure};
use crate::config::{ConfigHandle, ProjectConfig, ProjectPaths};
use crate::logger::status_detach;
use crate::plugin::PluginRegistry;
use crate::render::timing;
use crate::serve::{ReportServer, ReportService};
use crate::template::HandlebarsEngine;
use crate::utils::path::normalize_path;
use crate::watch::FileWatcher;
use crate::{debug, log};

/// Run until the first build (`--build-once`) or until Ctrl+C.
///
/// Returns `false` when a one-shot build failed. Setup failures (config,
/// plugins, browser launch, dependency pass) are errors.
pub async fn run(cli: &Cli) -> Result<bool> {
    let shutdown = shutdown_signal()?;
    if cli.serve {
        serve(cli, &shutdown).await?;
        return Ok(true);
    }

    let paths = ProjectPaths::resolve(
        &cli.input,
        cli.output.as_deref(),
        cli.temp.as_deref(),
        cli.basedir.as_deref(),
        &cli.watch,
    )?;
    log!("build"; "master {}", paths.master.display());

    let (config, hash) = ProjectConfig::load(&paths.input_dir)?;
    let handle = ConfigHandle::new(config.clone());
    handle.set_content_hash(hash);

    let hooks = PluginRegistry::new(paths.input_dir.clone(), paths.basedir.clone())
        .initialize(&config)
        .await?;
    log!("plugin"; "loaded {}", hooks.plugins.join(", "));

    let session = Arc::new(
        ChromeSession::launch(&config.browser, cli.no_sandbox)
            .await
            .context("failed to launch the browser")?,
    );
    let page: Arc<dyn BrowserPage> = session.clone();

    let ctx = BuildContext::new(paths, handle, hooks, page, Arc::new(HandlebarsEngine::new()))
        .with_locals(cli.locals())
        .with_html_only(cli.html_only);
    let scheduler = Arc::new(BuildScheduler::new(ctx, ConcurrencyPolicy::DropIfBusy));

    let result = startup(&scheduler, cli.build_once, &config, &shutdown).await;
    session.close().await;
    result
}

async fn startup(
    scheduler: &Arc<BuildScheduler>,
    build_once: bool,
    config: &ProjectConfig,
    shutdown: &Notify,
) -> Result<bool> {
    scheduler.prepare().await?;

    let built = match scheduler.build_now().await {
        Ok(report) => {
            log!(
                "build"; "done in {}: {}",
                timing::seconds(report.elapsed),
                report.output.display()
            );
            true
        }
        Err(e) => {
            report_failure("build failed", &e);
            false
        }
    };
    if build_once {
        return Ok(built);
    }

    watch(scheduler, config, shutdown).await?;
    Ok(true)
}

/// Feed debounced changes to the scheduler until shutdown.
///
/// Each path is handled on its own task so that contending triggers reach
/// the gate while a build is running.
async fn watch(scheduler: &Arc<BuildScheduler>, config: &ProjectConfig, shutdown: &Notify) -> Result<()> {
    let roots = scheduler.context().paths.watch_roots();
    let mut watcher =
        FileWatcher::new(roots, config.watch.stability()).context("failed to start the file watcher")?;
    for root in watcher.roots().attached() {
        debug!("watch"; "watching {}", root.display());
    }
    status_detach();
    log!("watch"; "now idle and waiting for file changes");

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            batch = watcher.next_batch() => {
                let Some(paths) = batch else { break };
                for path in paths {
                    let scheduler = Arc::clone(scheduler);
                    tokio::spawn(async move { scheduler.handle(&path).await });
                }
            }
        }
    }

    log!("watch"; "shutting down");
    Ok(())
}

/// Serve the reports under the input directory (or `--basedir`) until Ctrl+C.
async fn serve(cli: &Cli, shutdown: &Notify) -> Result<()> {
    let root = normalize_path(cli.basedir.as_deref().unwrap_or(&cli.input));
    if !root.is_dir() {
        bail!("report root `{}` is not a directory", root.display());
    }

    let (config, _) = ProjectConfig::load(&root)?;
    let hooks = PluginRegistry::new(root.clone(), root.clone())
        .initialize(&config)
        .await?;
    log!("plugin"; "loaded {}", hooks.plugins.join(", "));

    let service = Arc::new(ReportService::new(
        root.clone(),
        Arc::new(HandlebarsEngine::new()),
        Arc::new(hooks),
        config.inline.clone(),
    ));
    let port = cli.port.unwrap_or(config.serve.port);
    let server = ReportServer::start(config.serve.interface, port, service)?;
    log!("serve"; "reports under {}", root.display());

    shutdown.notified().await;
    log!("serve"; "shutting down");
    server.stop().await;
    Ok(())
}

/// Ctrl+C wakes the returned notifier.
fn shutdown_signal() -> Result<Arc<Notify>> {
    let notify = Arc::new(Notify::new());
    let handler = Arc::clone(&notify);
    ctrlc::set_handler(move || handler.notify_one())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(notify)
}
