//! Static site build command.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plinth_static::{SiteBuilder, SiteConfig};

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building site...");

    let mut config = SiteConfig::load(config_path)?.apply_env(|key| env::var(key).ok());
    if let Some(output) = output {
        config.output_dir = output;
    }
    if config.production {
        tracing::info!("Production build");
    }
    if !config.path_prefix.is_empty() {
        tracing::info!("Using path prefix {}", config.path_prefix);
    }

    let result = SiteBuilder::new(config).build().await?;

    tracing::info!(
        "Built {} pages and copied {} files in {}ms",
        result.pages,
        result.copied,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
