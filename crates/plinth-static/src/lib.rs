//! Static site builder for a localized documentation site.
//!
//! Compiles the entry stylesheet (Sass to vendor-prefixed, minified CSS),
//! executes declarative passthrough copies, and renders minijinja templates
//! with the site's filter set and locale translation table.

pub mod builder;
pub mod config;
pub mod filters;
pub mod i18n;
pub mod passthrough;
pub mod styles;
pub mod templates;

pub use builder::{BuildError, BuildResult, SiteBuilder};
pub use config::SiteConfig;
