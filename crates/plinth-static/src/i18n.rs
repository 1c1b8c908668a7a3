//! Locale translation table and the `i18n` template filter.
//!
//! Translations live in `<data>/i18n.json`, keyed by translation key and then
//! by locale. Lookups fall back to the default locale, and a key with no
//! translation at all renders as itself so a gap never fails a build.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use minijinja::{Environment, State};
use serde::Deserialize;

/// Name of the translation data file.
pub const DATA_FILE: &str = "i18n.json";

/// Errors from loading the translation table.
#[derive(Debug, thiserror::Error)]
pub enum I18nError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Translation table: key to locale to text.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct Translations(HashMap<String, HashMap<String, String>>);

impl Translations {
    /// Load the table from the data directory. A missing file is an empty
    /// table, not an error.
    pub fn load(data_dir: &Path) -> Result<Self, I18nError> {
        let path = data_dir.join(DATA_FILE);
        if !path.exists() {
            tracing::debug!("No {} under {}", DATA_FILE, data_dir.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| I18nError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let table: Self = serde_json::from_str(&raw).map_err(|e| I18nError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::info!("Loaded {} translation keys", table.len());
        Ok(table)
    }

    /// Resolve a key for a locale, trying the fallback locale next and
    /// finally returning the key itself. Locale comparison ignores case.
    pub fn resolve(&self, key: &str, locale: &str, fallback: &str) -> String {
        let Some(entry) = self.0.get(key) else {
            tracing::warn!("No translations for key {key:?}");
            return key.to_string();
        };

        if let Some(text) = lookup_locale(entry, locale) {
            return text.clone();
        }
        if let Some(text) = lookup_locale(entry, fallback) {
            tracing::debug!("Key {key:?} missing for {locale}, using {fallback}");
            return text.clone();
        }

        tracing::warn!("Key {key:?} has no translation for {locale} or {fallback}");
        key.to_string()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn lookup_locale<'a>(entry: &'a HashMap<String, String>, locale: &str) -> Option<&'a String> {
    if let Some(text) = entry.get(locale) {
        return Some(text);
    }
    entry
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(locale))
        .map(|(_, text)| text)
}

/// Register the `i18n` filter. The filter reads the page's `locale` context
/// variable, falling back to the default locale when a template has none.
pub fn register(env: &mut Environment<'static>, table: Arc<Translations>, fallback: &str) {
    let fallback = fallback.to_string();
    env.add_filter("i18n", move |state: &State, key: String| {
        let locale = state
            .lookup("locale")
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_else(|| fallback.clone());
        table.resolve(&key, &locale, &fallback)
    });
}
