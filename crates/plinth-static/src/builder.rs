//! Static site builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::config::SiteConfig;
use crate::i18n::{I18nError, Translations};
use crate::passthrough::{self, PassthroughError};
use crate::styles::{self, StyleError};
use crate::templates::{PageContext, TemplateEngine};

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages rendered
    pub pages: usize,

    /// Number of files copied by passthrough rules
    pub copied: usize,

    /// Size of the written stylesheet
    pub stylesheet_bytes: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read input: {0}")]
    Read(String),

    #[error("Stylesheet build failed: {0}")]
    Stylesheet(#[from] StyleError),

    #[error("Passthrough copy failed: {0}")]
    Passthrough(#[from] PassthroughError),

    #[error("Translation table failed to load: {0}")]
    Translations(#[from] I18nError),

    #[error("Failed to render {path}: {message}")]
    Template { path: String, message: String },

    #[error("Failed to write output: {0}")]
    Write(String),
}

/// A page to be rendered.
#[derive(Debug)]
struct PageInfo {
    source_path: PathBuf,
    output_path: PathBuf,
    context: PageContext,
}

/// Static site builder.
pub struct SiteBuilder {
    config: SiteConfig,
}

impl SiteBuilder {
    /// Create a new builder for a site.
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    /// Build the site.
    ///
    /// The stylesheet is compiled and written before anything else runs, so
    /// a failing stylesheet aborts the build instead of shipping pages that
    /// reference a missing or stale one. Passthrough copies come next, then
    /// pages render in parallel.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::Write(e.to_string()))?;

        let stylesheet = styles::build_stylesheet(&self.config)?;

        let copied = passthrough::copy_rules(
            &self.config.passthrough,
            &self.config.root,
            &self.config.input_dir,
            &self.config.output_dir,
        )?;

        let translations = Arc::new(Translations::load(&self.config.data_dir)?);
        let engine = TemplateEngine::new(&self.config, translations);

        let pages = self.discover_pages()?;

        let results: Vec<Result<(), BuildError>> = pages
            .par_iter()
            .map(|page| self.build_page(page, &engine))
            .collect();
        for result in results {
            result?;
        }

        Ok(BuildResult {
            pages: pages.len(),
            copied,
            stylesheet_bytes: stylesheet.bytes,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Discover all pages in the input directory.
    ///
    /// Directories whose name starts with `_` hold templates and data, and
    /// the assets root is handled by the stylesheet pipeline and passthrough
    /// rules; neither is walked for pages.
    fn discover_pages(&self) -> Result<Vec<PageInfo>, BuildError> {
        if !self.config.input_dir.exists() {
            return Err(BuildError::Read(format!(
                "Input directory not found: {}",
                self.config.input_dir.display()
            )));
        }

        let assets_root = self.assets_root();
        let mut pages = Vec::new();

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_skipped(e, &assets_root))
        {
            let entry = entry.map_err(|e| BuildError::Read(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self.config.template_formats.iter().any(|f| f == ext) {
                continue;
            }

            let relative = path
                .strip_prefix(&self.config.input_dir)
                .unwrap_or(path)
                .to_path_buf();
            let output_path = self.output_path_for(&relative);
            let url = self.url_for(&output_path);
            let locale = self.locale_for(&relative);

            pages.push(PageInfo {
                source_path: path.to_path_buf(),
                output_path,
                context: PageContext { locale, url },
            });
        }

        pages.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(pages)
    }

    /// First component of the styles entry, resolved under the input
    /// directory.
    fn assets_root(&self) -> PathBuf {
        let first = self.config.styles_entry.iter().next().unwrap_or_default();
        self.config.input_dir.join(first)
    }

    /// Calculate the output path for a page, giving every page a pretty URL.
    fn output_path_for(&self, relative: &Path) -> PathBuf {
        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index");
        let parent = relative.parent().unwrap_or(Path::new(""));

        if stem == "index" {
            // en-gb/index.html -> _site/en-gb/index.html
            self.config.output_dir.join(parent).join("index.html")
        } else {
            // en-gb/examples.html -> _site/en-gb/examples/index.html
            self.config
                .output_dir
                .join(parent)
                .join(stem)
                .join("index.html")
        }
    }

    /// Convert an output path to its URL.
    fn url_for(&self, output_path: &Path) -> String {
        let relative = output_path
            .strip_prefix(&self.config.output_dir)
            .unwrap_or(output_path);

        let dir = relative
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        if dir.is_empty() {
            "/".to_string()
        } else {
            format!("/{dir}/")
        }
    }

    /// Locale of a page, taken from its first path segment when that segment
    /// looks like a locale.
    fn locale_for(&self, relative: &Path) -> String {
        static LOCALE_SEGMENT: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]{2})?$").unwrap());

        let first = relative.iter().next().and_then(|s| s.to_str()).unwrap_or("");
        if LOCALE_SEGMENT.is_match(first) {
            first.to_string()
        } else {
            self.config.default_locale.to_lowercase()
        }
    }

    /// Render a single page and write it to its output path.
    fn build_page(&self, page: &PageInfo, engine: &TemplateEngine) -> Result<(), BuildError> {
        let source = fs::read_to_string(&page.source_path)
            .map_err(|e| BuildError::Read(format!("{}: {}", page.source_path.display(), e)))?;

        let html = engine
            .render_page(&source, &page.context)
            .map_err(|e| BuildError::Template {
                path: page.source_path.display().to_string(),
                message: e.to_string(),
            })?;

        if let Some(parent) = page.output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::Write(e.to_string()))?;
        }
        fs::write(&page.output_path, html).map_err(|e| BuildError::Write(e.to_string()))?;

        tracing::debug!("Rendered {}", page.output_path.display());
        Ok(())
    }
}

fn is_skipped(entry: &DirEntry, assets_root: &Path) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('_') {
        return true;
    }
    entry.depth() == 1 && entry.path() == assets_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(root: &Path, config_toml: &str) -> SiteBuilder {
        write(&root.join("site.toml"), config_toml);
        let config = SiteConfig::load(&root.join("site.toml")).unwrap();
        SiteBuilder::new(config)
    }

    #[tokio::test]
    async fn builds_simple_site() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(&temp.path().join("src/index.html"), "<h1>{{ site_title }}</h1>");

        let builder = site(temp.path(), "passthrough = []\n");
        let result = builder.build().await.unwrap();

        assert_eq!(result.pages, 1);
        assert!(result.stylesheet_bytes > 0);
        let out = temp.path().join("_site");
        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "<h1>Documentation</h1>"
        );
        assert!(out.join("assets/styles/main.css").is_file());
    }

    #[tokio::test]
    async fn broken_stylesheet_aborts_before_pages_render() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            ".broken {\n  color: red;\n",
        );
        write(&temp.path().join("src/index.html"), "<h1>hi</h1>");

        let builder = site(temp.path(), "passthrough = []\n");
        let err = builder.build().await.unwrap_err();

        assert!(matches!(err, BuildError::Stylesheet(_)));
        assert!(!temp.path().join("_site/index.html").exists());
    }

    #[tokio::test]
    async fn locale_pages_get_their_translations() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(
            &temp.path().join("src/_data/i18n.json"),
            r#"{ "greeting": { "en-GB": "Hello", "de-DE": "Hallo" } }"#,
        );
        write(&temp.path().join("src/en-gb/index.html"), "{{ 'greeting' | i18n }}");
        write(&temp.path().join("src/de-de/index.html"), "{{ 'greeting' | i18n }}");

        let builder = site(temp.path(), "passthrough = []\n");
        let result = builder.build().await.unwrap();

        assert_eq!(result.pages, 2);
        let out = temp.path().join("_site");
        assert_eq!(fs::read_to_string(out.join("en-gb/index.html")).unwrap(), "Hello");
        assert_eq!(fs::read_to_string(out.join("de-de/index.html")).unwrap(), "Hallo");
    }

    #[tokio::test]
    async fn named_pages_get_pretty_urls() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(
            &temp.path().join("src/en-gb/examples.html"),
            "{{ locale }} {{ page.url }}",
        );

        let builder = site(temp.path(), "passthrough = []\n");
        builder.build().await.unwrap();

        let rendered = fs::read_to_string(
            temp.path().join("_site/en-gb/examples/index.html"),
        )
        .unwrap();
        assert_eq!(rendered, "en-gb /en-gb/examples/");
    }

    #[tokio::test]
    async fn pages_render_through_layouts() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(
            &temp.path().join("src/_layouts/base.html"),
            "<body>{% block content %}{% endblock %}</body>",
        );
        write(
            &temp.path().join("src/index.html"),
            "{% extends \"base.html\" %}{% block content %}<p>{{ page.url }}</p>{% endblock %}",
        );

        let builder = site(temp.path(), "passthrough = []\n");
        builder.build().await.unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("_site/index.html")).unwrap(),
            "<body><p>/</p></body>"
        );
    }

    #[tokio::test]
    async fn passthrough_files_ship_byte_for_byte() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(&temp.path().join("src/robots.txt"), "User-agent: *\n");
        write(&temp.path().join("src/index.html"), "ok");

        let builder = site(
            temp.path(),
            "[[passthrough]]\nsource = \"robots.txt\"\n",
        );
        let result = builder.build().await.unwrap();

        assert_eq!(result.copied, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("_site/robots.txt")).unwrap(),
            "User-agent: *\n"
        );
    }

    #[tokio::test]
    async fn underscore_and_asset_dirs_are_not_rendered() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(&temp.path().join("src/assets/demo.html"), "not a page");
        write(&temp.path().join("src/_includes/nav.html"), "not a page");
        write(&temp.path().join("src/index.html"), "ok");

        let builder = site(temp.path(), "passthrough = []\n");
        let result = builder.build().await.unwrap();

        assert_eq!(result.pages, 1);
        let out = temp.path().join("_site");
        assert!(!out.join("assets/demo/index.html").exists());
        assert!(!out.join("_includes").exists());
    }

    #[tokio::test]
    async fn missing_passthrough_source_fails_the_build() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(&temp.path().join("src/index.html"), "ok");

        let builder = site(
            temp.path(),
            "[[passthrough]]\nsource = \"assets/fonts\"\n",
        );
        let err = builder.build().await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::Passthrough(PassthroughError::MissingSource(_))
        ));
    }

    #[tokio::test]
    async fn template_errors_name_the_page() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("src/assets/styles/main.scss"),
            "body { margin: 0; }\n",
        );
        write(
            &temp.path().join("src/index.html"),
            "{% extends \"missing.html\" %}",
        );

        let builder = site(temp.path(), "passthrough = []\n");
        let err = builder.build().await.unwrap_err();

        match err {
            BuildError::Template { path, .. } => assert!(path.contains("index.html")),
            other => panic!("expected template error, got {other:?}"),
        }
    }
}
