//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{ColorChoice, Parser};

use crate::log;

/// Render templated documents to PDF through a headless browser
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[command(override_usage = "quire <INPUT> [OUTPUT] [OPTIONS]")]
pub struct Cli {
    /// Master document, or a directory holding exactly one (.hbs or .html)
    #[arg(value_hint = clap::ValueHint::AnyPath, default_value = ".")]
    pub input: PathBuf,

    /// Output PDF (default: <input-dir>/<stem>.pdf)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Additional locations to watch
    #[arg(short, long = "watch", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub watch: Vec<PathBuf>,

    /// Directory for the intermediate HTML file (must exist)
    #[arg(short, long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub temp: Option<PathBuf>,

    /// Build once, then exit without watching
    #[arg(long, visible_alias = "bo")]
    pub build_once: bool,

    /// JSON object of template locals
    #[arg(short, long, value_name = "JSON")]
    pub locals: Option<String>,

    /// Only build the HTML, not the PDF
    #[arg(long)]
    pub html_only: bool,

    /// Base directory for absolute paths in templates, e.g. /
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub basedir: Option<PathBuf>,

    /// Serve every report directory under INPUT (or --basedir) over HTTP
    #[arg(long, conflicts_with_all = ["output", "watch", "build_once", "html_only"])]
    pub serve: bool,

    /// Port for --serve (default: `[serve].port`)
    #[arg(long, value_name = "PORT", requires = "serve")]
    pub port: Option<u16>,

    /// Launch the browser without its sandbox
    #[arg(long)]
    pub no_sandbox: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}

impl Cli {
    /// Parsed `--locals`; unparsable JSON is reported and ignored.
    pub fn locals(&self) -> serde_json::Value {
        let Some(raw) = &self.locals else {
            return serde_json::Value::Null;
        };
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                log!("error"; "could not parse --locals JSON, ignoring it: {}", e);
                serde_json::Value::Null
            }
        }
    }
}
