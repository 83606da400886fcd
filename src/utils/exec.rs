//! External converters: `sass`, and the commands declared by plugin
//! manifests for filters and watchers.
//!
//! ```ignore
//! let css = Cmd::new("sass").args(["--stdin", "--no-source-map"]).stdin(scss).run()?;
//! ```

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;

/// One converter invocation.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    input: Option<Vec<u8>>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Program and arguments from a manifest `command = [..]` list.
    pub fn from_slice<S: AsRef<OsStr>>(command: &[S]) -> Self {
        let Some((program, args)) = command.split_first() else {
            return Self::default();
        };
        Self::new(program).args(args)
    }

    /// Append an argument; empty strings left over from substitution are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, Self::arg)
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Text piped to the converter's stdin.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.input = Some(data.as_ref().to_vec());
        self
    }

    /// Run to completion.
    ///
    /// A non-zero exit is an error carrying the converter's stderr, which is
    /// what ends up in the build failure message.
    pub fn run(self) -> Result<Output> {
        let name = Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned();
        if name.is_empty() {
            bail!("empty command");
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start `{name}`"))?;

        // Write stdin on its own thread: a converter that streams output
        // while reading would otherwise block on a full stdout pipe.
        let feeder = match (child.stdin.take(), self.input) {
            (Some(mut pipe), Some(data)) => Some(std::thread::spawn(move || pipe.write_all(&data))),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{name}`"))?;
        if let Some(feeder) = feeder {
            feeder
                .join()
                .map_err(|_| anyhow::anyhow!("stdin writer for `{name}` panicked"))?
                .with_context(|| format!("failed to write stdin of `{name}`"))?;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{name}` failed ({}): {}", output.status, stderr.trim());
        }
        Ok(output)
    }
}

/// Replace `$NAME` placeholders with values from `vars`.
///
/// Longer names go first, so `$SOURCE_DIR` survives a `$SOURCE` binding.
pub fn substitute_vars(args: &[String], vars: &FxHashMap<&str, String>) -> Vec<String> {
    let mut names: Vec<&str> = vars.keys().copied().collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    args.iter()
        .map(|arg| {
            names.iter().fold(arg.clone(), |acc, name| {
                acc.replace(&format!("${name}"), &vars[name])
            })
        })
        .collect()
}
