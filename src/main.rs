//! Quire - renders templated documents to PDF through a headless browser.

#![allow(dead_code)]

mod browser;
mod build;
mod cli;
mod config;
mod html;
mod logger;
mod plugin;
mod render;
mod serve;
mod template;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    if !rt.block_on(cli::run(&cli))? {
        std::process::exit(1);
    }
    Ok(())
}
