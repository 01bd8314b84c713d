//! Page discovery command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use folio_pages::{collect_pages_data, TokioFs};

use super::config::load_config;

/// Run the pages command.
pub async fn run(config_path: &Path, dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let pages_dir = config.pages_dir(dir);

    let pages = collect_pages_data(&pages_dir, None, Arc::new(TokioFs)).await?;
    tracing::info!("Found {} pages in {}", pages.len(), pages_dir.display());

    let json = serde_json::to_string_pretty(&pages).context("Failed to serialize pages")?;
    println!("{}", json);

    Ok(())
}
