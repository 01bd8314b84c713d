//! Virtual module generation command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use folio_pages::{collect_pages_data, TokioFs, VirtualModules};

use super::config::load_config;

/// Run the codegen command.
pub async fn run(config_path: &Path, dir: Option<PathBuf>, out: PathBuf) -> Result<()> {
    let config = load_config(config_path)?;
    let pages_dir = config.pages_dir(dir);

    let pages = collect_pages_data(&pages_dir, None, Arc::new(TokioFs)).await?;
    let written = VirtualModules::new(&pages).write_to(&TokioFs, &out).await?;

    for path in &written {
        tracing::debug!("Wrote {}", path.display());
    }
    tracing::info!(
        "Generated {} modules for {} pages in {}",
        written.len(),
        pages.len(),
        out.display()
    );

    Ok(())
}
