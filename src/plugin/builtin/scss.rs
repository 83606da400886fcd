//! SCSS through the external `sass` compiler.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::plugin::{Capability, FilterOptions, HookBundle, Plugin, PluginParams};
use crate::utils::exec::Cmd;
use crate::utils::path::resolve_path;

pub const NAME: &str = "scss";

pub struct ScssPlugin;

#[async_trait]
impl Plugin for ScssPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn construct(&self, _params: &PluginParams) -> Result<HookBundle> {
        Ok(HookBundle::new().with(Capability::filter(NAME, compile)))
    }
}

/// `{{#scss}}...{{/scss}}` compiles the block, `{{#scss file="x.scss"}}{{/scss}}` a file.
fn compile(text: &str, options: &FilterOptions<'_>) -> Result<String> {
    let sass = which::which("sass").context("`sass` not found on PATH")?;
    let dir = options.filename.parent().unwrap_or(Path::new("."));

    let output = match options.param_str("file") {
        Some(file) => {
            let path = resolve_path(Path::new(file), dir);
            Cmd::new(sass)
                .arg("--no-source-map")
                .arg(path)
                .cwd(dir)
                .run()?
        }
        None => Cmd::new(sass)
            .args(["--stdin", "--no-source-map", "--load-path"])
            .arg(dir)
            .cwd(dir)
            .stdin(text)
            .run()?,
    };

    String::from_utf8(output.stdout).context("sass output is not UTF-8")
}
