//! Site configuration: built-in defaults, `site.toml`, environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::passthrough::PassthroughRule;

/// Environment variable selecting the production flag when set to
/// `"production"`.
pub const ENV_VAR: &str = "PLINTH_ENV";

/// Environment variable supplying the URL path prefix for subdirectory
/// deployments (e.g. project pages served under `user.github.io/<prefix>/`).
pub const PATH_PREFIX_VAR: &str = "PLINTH_PATH_PREFIX";

/// Resolved site configuration.
///
/// Constructed once at startup and passed by reference; nothing re-reads the
/// process environment after resolution.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Site root, the directory containing `site.toml`.
    pub root: PathBuf,

    /// Site title injected into every template context.
    pub title: String,

    /// Default locale in BCP-47 form. Drives the i18n fallback and the
    /// preview server's root redirect.
    pub default_locale: String,

    /// Input directory holding templates, data and assets.
    pub input_dir: PathBuf,

    /// Output directory for the generated site.
    pub output_dir: PathBuf,

    /// Directory searched for `{% include %}` templates.
    pub includes_dir: PathBuf,

    /// Directory searched for `{% extends %}` layouts.
    pub layouts_dir: PathBuf,

    /// Data directory, home of the translation table.
    pub data_dir: PathBuf,

    /// File extensions rendered as pages.
    pub template_formats: Vec<String>,

    /// Stylesheet entry, relative to the input directory.
    pub styles_entry: PathBuf,

    /// Stylesheet destination, relative to the output directory.
    pub styles_output: PathBuf,

    /// Passthrough copy rules.
    pub passthrough: Vec<PassthroughRule>,

    /// URL path prefix, empty when the site is served from the domain root.
    pub path_prefix: String,

    /// Whether this is a production run.
    pub production: bool,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl SiteConfig {
    /// Load configuration from `site.toml` if it exists, falling back to
    /// built-in defaults. Directory names resolve against the config file's
    /// parent directory.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let root = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let file = if config_path.exists() {
            let raw = fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
                path: config_path.display().to_string(),
                message: e.to_string(),
            })?;
            let parsed: ConfigFile = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: config_path.display().to_string(),
                message: e.to_string(),
            })?;
            tracing::info!("Loaded config from {}", config_path.display());
            parsed
        } else {
            ConfigFile::default()
        };

        Ok(Self::from_file(file, root))
    }

    /// Apply environment overrides through an injected lookup, so callers
    /// and tests control the environment the same way.
    ///
    /// An unset path prefix keeps the default empty string; a set one is
    /// taken verbatim.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(prefix) = lookup(PATH_PREFIX_VAR) {
            self.path_prefix = prefix;
        }
        self.production = lookup(ENV_VAR).as_deref() == Some("production");
        self
    }

    /// Stylesheet entry resolved against the input directory.
    pub fn styles_entry_path(&self) -> PathBuf {
        self.input_dir.join(&self.styles_entry)
    }

    /// Stylesheet destination resolved against the output directory.
    pub fn styles_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.styles_output)
    }

    /// Landing path of the default locale, e.g. `/en-gb/`.
    pub fn locale_home(&self) -> String {
        format!("/{}/", self.default_locale.to_lowercase())
    }

    fn from_file(file: ConfigFile, root: PathBuf) -> Self {
        let input_dir = root.join(&file.dir.input);
        Self {
            title: file.site.title,
            default_locale: file.site.default_locale,
            output_dir: root.join(&file.dir.output),
            includes_dir: input_dir.join(&file.dir.includes),
            layouts_dir: input_dir.join(&file.dir.layouts),
            data_dir: input_dir.join(&file.dir.data),
            template_formats: file.build.formats,
            styles_entry: PathBuf::from(file.styles.entry),
            styles_output: PathBuf::from(file.styles.output),
            passthrough: file
                .passthrough
                .map(|entries| entries.into_iter().map(Into::into).collect())
                .unwrap_or_else(PassthroughRule::defaults),
            path_prefix: String::new(),
            production: false,
            input_dir,
            root,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default(), PathBuf::from("."))
    }
}

/// `site.toml` structure.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    site: SiteSection,
    #[serde(default)]
    dir: DirSection,
    #[serde(default)]
    build: BuildSection,
    #[serde(default)]
    styles: StylesSection,
    passthrough: Option<Vec<PassthroughEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SiteSection {
    title: String,
    default_locale: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Documentation".to_string(),
            default_locale: "en-GB".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DirSection {
    input: String,
    output: String,
    /// Relative to the input directory.
    includes: String,
    /// Relative to the input directory.
    layouts: String,
    /// Relative to the input directory.
    data: String,
}

impl Default for DirSection {
    fn default() -> Self {
        Self {
            input: "src".to_string(),
            output: "_site".to_string(),
            includes: "_includes".to_string(),
            layouts: "_layouts".to_string(),
            data: "_data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BuildSection {
    formats: Vec<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            formats: vec!["html".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct StylesSection {
    entry: String,
    output: String,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry: "assets/styles/main.scss".to_string(),
            output: "assets/styles/main.css".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PassthroughEntry {
    source: String,
    dest: Option<String>,
}

impl From<PassthroughEntry> for PassthroughRule {
    fn from(entry: PassthroughEntry) -> Self {
        match entry.dest {
            Some(dest) => PassthroughRule::mapped(entry.source, dest),
            None => PassthroughRule::mirror(entry.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_config_file() {
        let config = SiteConfig::load(Path::new("does-not-exist/site.toml")).unwrap();

        assert_eq!(config.title, "Documentation");
        assert_eq!(config.default_locale, "en-GB");
        assert_eq!(config.input_dir, PathBuf::from("does-not-exist/src"));
        assert_eq!(config.output_dir, PathBuf::from("does-not-exist/_site"));
        assert_eq!(config.template_formats, vec!["html".to_string()]);
        assert_eq!(config.path_prefix, "");
        assert!(!config.production);
    }

    #[test]
    fn reads_site_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("site.toml");
        fs::write(
            &path,
            r#"
[site]
title = "Demo"
default_locale = "de-DE"

[dir]
input = "content"
output = "public"

[styles]
entry = "styles/app.scss"
output = "styles/app.css"

[[passthrough]]
source = "robots.txt"

[[passthrough]]
source = "vendor/bootstrap/dist/js"
dest = "assets/scripts/bootstrap"
"#,
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();

        assert_eq!(config.title, "Demo");
        assert_eq!(config.default_locale, "de-DE");
        assert_eq!(config.input_dir, temp.path().join("content"));
        assert_eq!(config.output_dir, temp.path().join("public"));
        assert_eq!(config.includes_dir, temp.path().join("content/_includes"));
        assert_eq!(config.styles_entry, PathBuf::from("styles/app.scss"));
        assert_eq!(config.passthrough.len(), 2);
        assert_eq!(config.passthrough[0], PassthroughRule::mirror("robots.txt"));
        assert_eq!(
            config.passthrough[1],
            PassthroughRule::mapped("vendor/bootstrap/dist/js", "assets/scripts/bootstrap")
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("site.toml");
        fs::write(&path, "[site\ntitle=").unwrap();

        let err = SiteConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unset_prefix_stays_empty() {
        let config = SiteConfig::default().apply_env(|_| None);
        assert_eq!(config.path_prefix, "");
    }

    #[test]
    fn set_prefix_is_taken_verbatim() {
        let config = SiteConfig::default().apply_env(|key| {
            (key == PATH_PREFIX_VAR).then(|| "/demo".to_string())
        });
        assert_eq!(config.path_prefix, "/demo");
    }

    #[test]
    fn production_flag_requires_exact_value() {
        let prod = SiteConfig::default()
            .apply_env(|key| (key == ENV_VAR).then(|| "production".to_string()));
        assert!(prod.production);

        let dev = SiteConfig::default()
            .apply_env(|key| (key == ENV_VAR).then(|| "development".to_string()));
        assert!(!dev.production);
    }

    #[test]
    fn locale_home_is_lowercased() {
        let config = SiteConfig::default();
        assert_eq!(config.locale_home(), "/en-gb/");
    }

    #[test]
    fn default_passthrough_set_is_applied() {
        let config = SiteConfig::load(Path::new("missing/site.toml")).unwrap();
        assert_eq!(config.passthrough, PassthroughRule::defaults());
        assert!(!config.passthrough.is_empty());
    }
}
