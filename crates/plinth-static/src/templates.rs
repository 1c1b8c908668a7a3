//! Template engine for rendering localized pages.

use std::sync::Arc;

use minijinja::{context, Environment, ErrorKind};

use crate::config::SiteConfig;
use crate::i18n::Translations;
use crate::{filters, i18n};

/// Per-page render context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PageContext {
    /// Page locale, lowercased, e.g. `de-de`.
    pub locale: String,
    /// Output URL of the page, e.g. `/en-gb/examples/`.
    pub url: String,
}

/// Template engine using minijinja.
///
/// Named templates referenced by `{% include %}` and `{% extends %}` are
/// loaded from the includes directory first, then the layouts directory.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create an engine wired with the site's filters, globals and
    /// translation table.
    pub fn new(config: &SiteConfig, translations: Arc<Translations>) -> Self {
        let mut env = Environment::new();

        let includes = config.includes_dir.clone();
        let layouts = config.layouts_dir.clone();
        env.set_loader(move |name| {
            for dir in [&includes, &layouts] {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return match std::fs::read_to_string(&candidate) {
                        Ok(source) => Ok(Some(source)),
                        Err(e) => Err(minijinja::Error::new(
                            ErrorKind::InvalidOperation,
                            format!("Failed to read template {}: {e}", candidate.display()),
                        )),
                    };
                }
            }
            Ok(None)
        });

        filters::register(&mut env, &config.path_prefix);
        i18n::register(&mut env, translations, &config.default_locale);
        env.add_global("site_title", config.title.clone());
        env.add_global("path_prefix", config.path_prefix.clone());

        Self { env }
    }

    /// Render one page source in its page context.
    pub fn render_page(
        &self,
        source: &str,
        page: &PageContext,
    ) -> Result<String, minijinja::Error> {
        self.env.render_str(
            source,
            context! {
                locale => &page.locale,
                page => page,
            },
        )
    }
}
