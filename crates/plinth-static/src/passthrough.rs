//! Passthrough copies: files the build ships untouched, byte for byte.
//!
//! A mirror rule copies `<input>/<source>` to `<output>/<source>`. A mapped
//! rule copies `<root>/<source>` to `<output>/<dest>`, which is how vendored
//! assets outside the input directory reach the output tree.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A single passthrough copy rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughRule {
    /// Source path. Mirror rules resolve it against the input directory,
    /// mapped rules against the site root.
    pub source: PathBuf,
    /// Destination relative to the output directory. `None` mirrors the
    /// source path.
    pub dest: Option<PathBuf>,
}

impl PassthroughRule {
    /// Rule that keeps the source path under the output directory.
    pub fn mirror(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: None,
        }
    }

    /// Rule that copies the source to an explicit destination.
    pub fn mapped(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: Some(dest.into()),
        }
    }

    /// Built-in rule set for the stock site layout.
    pub fn defaults() -> Vec<Self> {
        [
            "robots.txt",
            "site.webmanifest",
            "assets/favicons",
            "assets/images",
            "assets/fonts",
            "assets/styles/bootstrap-examples",
            "assets/scripts",
            "assets/svgs",
            "assets/docs",
        ]
        .into_iter()
        .map(Self::mirror)
        .collect()
    }
}

/// Errors from executing passthrough rules.
#[derive(Debug, thiserror::Error)]
pub enum PassthroughError {
    #[error("Passthrough source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to copy {path}: {message}")]
    Copy { path: String, message: String },
}

/// Execute every rule, returning the number of files copied.
///
/// A missing source aborts the build rather than silently shipping an
/// incomplete site.
pub fn copy_rules(
    rules: &[PassthroughRule],
    root: &Path,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<usize, PassthroughError> {
    let mut copied = 0;

    for rule in rules {
        let relative_source = strip_leading_slash(&rule.source);
        let (from, to) = match &rule.dest {
            Some(dest) => (
                root.join(relative_source),
                output_dir.join(strip_leading_slash(dest)),
            ),
            None => (
                input_dir.join(relative_source),
                output_dir.join(relative_source),
            ),
        };

        if from.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else if from.is_file() {
            copy_file(&from, &to)?;
            copied += 1;
        } else {
            return Err(PassthroughError::MissingSource(from));
        }

        tracing::debug!("Passthrough: {} -> {}", from.display(), to.display());
    }

    Ok(copied)
}

fn strip_leading_slash(path: &Path) -> &Path {
    path.strip_prefix("/").unwrap_or(path)
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize, PassthroughError> {
    let mut copied = 0;

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| PassthroughError::Copy {
            path: from.display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        copy_file(entry.path(), &to.join(relative))?;
        copied += 1;
    }

    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), PassthroughError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| PassthroughError::Copy {
            path: parent.display().to_string(),
            message: e.to_string(),
        })?;
    }
    fs::copy(from, to).map_err(|e| PassthroughError::Copy {
        path: from.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}
