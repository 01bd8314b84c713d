//! Static site build command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use folio_static::{CommandBundler, StaticSiteBuilder};

use super::config::load_config;

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = load_config(config_path)?;
    if file_config.bundler.command.is_empty() {
        anyhow::bail!(
            "No bundler configured. Set [bundler] command in {}.",
            config_path.display()
        );
    }

    let bundler = CommandBundler::new(&file_config.bundler.command)?;
    let config = file_config.build_config(output)?;

    let report = StaticSiteBuilder::new(config, Arc::new(bundler))
        .build()
        .await?;

    tracing::info!(
        "Built {} routes from {} pages in {}ms",
        report.routes.len(),
        report.pages,
        report.duration_ms
    );
    if report.used_404_fallback {
        tracing::info!("Copied 404 page to the site root");
    }

    tracing::info!("Output: {}", report.output_dir.display());

    Ok(())
}
