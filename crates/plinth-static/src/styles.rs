//! Stylesheet pipeline: Sass entry in, prefixed and minified CSS out.

use std::fs;
use std::path::PathBuf;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::SiteConfig;

/// Errors from the stylesheet pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Sass compilation failed: {0}")]
    Compile(String),

    #[error("CSS transform failed: {0}")]
    Transform(String),

    #[error("Failed to write stylesheet: {0}")]
    Write(String),
}

/// A written stylesheet.
#[derive(Debug, Clone)]
pub struct StylesheetArtifact {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Compile the configured Sass entry, add vendor prefixes, minify, and write
/// the result under the output directory. Any failure aborts the build.
pub fn build_stylesheet(config: &SiteConfig) -> Result<StylesheetArtifact, StyleError> {
    let entry = config.styles_entry_path();
    let compiled = grass::from_path(
        &entry,
        &grass::Options::default().style(grass::OutputStyle::Compressed),
    )
    .map_err(|e| StyleError::Compile(e.to_string()))?;

    let css = prefix_and_minify(&compiled)?;

    let output = config.styles_output_path();
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| StyleError::Write(e.to_string()))?;
    }
    fs::write(&output, &css).map_err(|e| StyleError::Write(e.to_string()))?;
    tracing::debug!("Wrote {} ({} bytes)", output.display(), css.len());

    Ok(StylesheetArtifact {
        path: output,
        bytes: css.len(),
    })
}

/// Browser floor for vendor prefixing, Bootstrap 5's support matrix.
// Version numbers are encoded as major << 16 | minor << 8.
fn browser_targets() -> Targets {
    Targets {
        browsers: Some(Browsers {
            chrome: Some(60 << 16),
            edge: Some(79 << 16),
            firefox: Some(60 << 16),
            safari: Some(12 << 16),
            ios_saf: Some(12 << 16),
            ..Browsers::default()
        }),
        ..Targets::default()
    }
}

fn prefix_and_minify(css: &str) -> Result<String, StyleError> {
    let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| StyleError::Transform(format!("CSS parse error: {e}")))?;

    stylesheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Transform(e.to_string()))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Transform(e.to_string()))?;

    Ok(minified.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn config_at(root: &Path) -> SiteConfig {
        SiteConfig::load(&root.join("site.toml")).unwrap()
    }

    #[test]
    fn compiles_prefixes_and_minifies() {
        let temp = tempdir().unwrap();
        let config = config_at(temp.path());
        let styles_dir = temp.path().join("src/assets/styles");
        fs::create_dir_all(&styles_dir).unwrap();
        fs::write(
            styles_dir.join("main.scss"),
            ".toolbar {\n  user-select: none;\n  .item { color: #ff0000; }\n}\n",
        )
        .unwrap();

        let artifact = build_stylesheet(&config).unwrap();

        assert_eq!(artifact.path, temp.path().join("_site/assets/styles/main.css"));
        let css = fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(artifact.bytes, css.len());
        assert!(css.contains("-webkit-user-select"));
        assert!(css.contains(".toolbar .item"));
        assert!(!css.contains('\n'));
    }

    #[test]
    fn broken_sass_is_a_compile_error() {
        let temp = tempdir().unwrap();
        let config = config_at(temp.path());
        let styles_dir = temp.path().join("src/assets/styles");
        fs::create_dir_all(&styles_dir).unwrap();
        fs::write(styles_dir.join("main.scss"), ".broken {\n  color: red;\n").unwrap();

        let err = build_stylesheet(&config).unwrap_err();
        assert!(matches!(err, StyleError::Compile(_)));
    }

    #[test]
    fn missing_entry_is_a_compile_error() {
        let temp = tempdir().unwrap();
        let config = config_at(temp.path());

        let err = build_stylesheet(&config).unwrap_err();
        assert!(matches!(err, StyleError::Compile(_)));
    }

    #[test]
    fn minifies_declarations() {
        let css = ".button {\n    background-color: blue;\n    padding: 10px;\n}\n";

        let minified = prefix_and_minify(css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));
    }
}
