//! Preview server command.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use plinth_server::{PreviewConfig, PreviewServer};
use plinth_static::{SiteBuilder, SiteConfig};

/// Run the serve command: build once, then serve with live reload.
pub async fn run(config_path: &Path, port: u16, open: bool, watch: bool) -> Result<()> {
    let config = SiteConfig::load(config_path)?.apply_env(|key| env::var(key).ok());

    let result = SiteBuilder::new(config.clone())
        .build()
        .await
        .context("Initial build failed")?;
    tracing::info!("Built {} pages in {}ms", result.pages, result.duration_ms);

    let preview = PreviewConfig {
        port,
        open,
        watch,
        ..PreviewConfig::default()
    };

    PreviewServer::new(config, preview).start().await?;

    Ok(())
}
