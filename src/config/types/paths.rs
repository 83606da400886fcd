//! Resolved project paths.
//!
//! Every path here is absolute and normalized, so the rest of the build can
//! compare and join them without consulting the working directory again.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::utils::path::normalize_path;

/// Master document extensions recognized when the input is a directory.
const MASTER_EXTENSIONS: &[&str] = &["hbs", "html"];

/// Where the master document lives and where its artifacts go.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Master document.
    pub master: PathBuf,
    /// Directory containing the master (config, plugins and the watch root).
    pub input_dir: PathBuf,
    /// Final PDF.
    pub output: PathBuf,
    /// Intermediate HTML the browser navigates to.
    pub temp_html: PathBuf,
    /// Base for `/absolute` references in templates and inlined resources.
    pub basedir: PathBuf,
    /// Additional watch locations.
    pub extra_watch: Vec<PathBuf>,
}

impl ProjectPaths {
    /// Resolve paths from command-line values.
    ///
    /// `input` may be a file or a directory holding exactly one master document.
    pub fn resolve(
        input: &Path,
        output: Option<&Path>,
        temp_dir: Option<&Path>,
        basedir: Option<&Path>,
        extra_watch: &[PathBuf],
    ) -> Result<Self> {
        let input = normalize_path(input);
        let master = if input.is_dir() {
            detect_master(&input)?
        } else if input.is_file() {
            input
        } else {
            bail!("input `{}` does not exist", input.display());
        };

        let input_dir = master
            .parent()
            .map(Path::to_path_buf)
            .context("master document has no parent directory")?;
        let stem = master
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("master document has no file name")?;

        let output = match output {
            Some(path) => normalize_path(path),
            None => input_dir.join(format!("{stem}.pdf")),
        };

        let temp_base = match temp_dir {
            Some(dir) => {
                let dir = normalize_path(dir);
                if !dir.is_dir() {
                    bail!("temp directory `{}` does not exist", dir.display());
                }
                dir
            }
            None => input_dir.clone(),
        };
        let temp_html = temp_base.join(format!("{stem}_temp.htm"));

        let basedir = basedir.map_or_else(|| input_dir.clone(), normalize_path);
        let extra_watch = extra_watch.iter().map(|p| normalize_path(p)).collect();

        Ok(Self {
            master,
            input_dir,
            output,
            temp_html,
            basedir,
            extra_watch,
        })
    }

    /// Whether the master is literal HTML (no template assembly).
    pub fn master_is_html(&self) -> bool {
        self.master
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
    }

    /// Input directory followed by any extra watch locations.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.input_dir.clone())
            .chain(self.extra_watch.iter().cloned())
            .collect()
    }
}

/// Find the single master document in a directory.
pub fn detect_master(dir: &Path) -> Result<PathBuf> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read `{}`", dir.display()))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| {
                    MASTER_EXTENSIONS
                        .iter()
                        .any(|m| ext.eq_ignore_ascii_case(m))
                })
        })
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => bail!("no master document (.hbs or .html) in `{}`", dir.display()),
        1 => Ok(candidates.remove(0)),
        _ => bail!(
            "several master documents in `{}`, pass one explicitly",
            dir.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_defaults() {
        let dir = TempDir::new().unwrap();
        let master = dir.path().join("report.hbs");
        fs::write(&master, "").unwrap();

        let paths = ProjectPaths::resolve(&master, None, None, None, &[]).unwrap();
        assert_eq!(paths.output.file_name().unwrap(), "report.pdf");
        assert_eq!(paths.temp_html.file_name().unwrap(), "report_temp.htm");
        assert_eq!(paths.basedir, paths.input_dir);
        assert!(!paths.master_is_html());
    }

    #[test]
    fn test_resolve_directory_detects_master() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.html"), "").unwrap();
        fs::write(dir.path().join("style.css"), "").unwrap();

        let paths = ProjectPaths::resolve(dir.path(), None, None, None, &[]).unwrap();
        assert_eq!(paths.master.file_name().unwrap(), "doc.html");
        assert!(paths.master_is_html());
    }

    #[test]
    fn test_resolve_directory_ambiguous() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.hbs"), "").unwrap();
        fs::write(dir.path().join("b.hbs"), "").unwrap();
        assert!(ProjectPaths::resolve(dir.path(), None, None, None, &[]).is_err());
    }

    #[test]
    fn test_resolve_missing_temp_dir() {
        let dir = TempDir::new().unwrap();
        let master = dir.path().join("a.hbs");
        fs::write(&master, "").unwrap();
        let missing = dir.path().join("nope");
        assert!(ProjectPaths::resolve(&master, None, Some(&missing), None, &[]).is_err());
    }

    #[test]
    fn test_watch_roots_order() {
        let dir = TempDir::new().unwrap();
        let master = dir.path().join("a.hbs");
        fs::write(&master, "").unwrap();
        let extra = dir.path().join("assets");

        let paths = ProjectPaths::resolve(&master, None, None, None, &[extra.clone()]).unwrap();
        let roots = paths.watch_roots();
        assert_eq!(roots[0], paths.input_dir);
        assert_eq!(roots[1], normalize_path(&extra));
    }
}
