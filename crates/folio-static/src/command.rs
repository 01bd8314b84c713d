//! Bundler driven by an external command.
//!
//! The command runs once per build mode. It reads its options from the
//! environment and leaves its output in `FOLIO_OUT_DIR`:
//!
//! - server mode writes `ssr-render.json`, a `{ routeId: html }` map produced
//!   by calling the server entry's `renderToString` for every route
//! - client mode writes `index.html` (the shell) and its assets under
//!   `FOLIO_ASSETS_DIR`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::bundler::{Bundler, BundlerError, BundlerOptions, ClientBuildResult, ServerBundle};

/// File the server build leaves its prerendered routes in.
pub const SSR_RENDER_FILE: &str = "ssr-render.json";

/// [`Bundler`] that shells out to a user-provided build command.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandBundler {
    /// Create a bundler from a command line, program first.
    pub fn new(command: &[String]) -> Result<Self, BundlerError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| BundlerError::Other("bundler command is empty".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    /// Run the command from `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    async fn run(&self, options: &BundlerOptions) -> Result<(), BundlerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("FOLIO_MODE", options.mode.to_string())
            .env("FOLIO_ENTRY", &options.entry)
            .env("FOLIO_OUT_DIR", &options.out_dir)
            .env("FOLIO_ASSETS_DIR", &options.assets_dir)
            .env("FOLIO_BASE", &options.base)
            .env("FOLIO_HASH_ROUTER", options.hash_router.to_string())
            .env("FOLIO_OPTIONS", options.extra.to_string());
        if let Some(dir) = &options.virtual_modules_dir {
            command.env("FOLIO_VIRTUAL_MODULES_DIR", dir);
        }
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::info!("Running {} build: {}", options.mode, self.program);

        let output = command.output().await.map_err(|source| BundlerError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("[{}] {}", self.program, line);
        }

        if !output.status.success() {
            return Err(BundlerError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build_server(
        &self,
        options: &BundlerOptions,
    ) -> Result<Arc<dyn ServerBundle>, BundlerError> {
        self.run(options).await?;

        let path = options.out_dir.join(SSR_RENDER_FILE);
        let json = read_output(&path).await?;
        let rendered: BTreeMap<String, String> = serde_json::from_str(&json)
            .map_err(|e| BundlerError::Output(format!("{}: {}", path.display(), e)))?;

        Ok(Arc::new(PrerenderedBundle { rendered }))
    }

    async fn build_client(
        &self,
        options: &BundlerOptions,
    ) -> Result<Vec<ClientBuildResult>, BundlerError> {
        self.run(options).await?;

        let html = read_output(&options.out_dir.join("index.html")).await?;
        let assets = list_assets(&options.out_dir, &options.assets_dir);

        Ok(vec![ClientBuildResult { html, assets }])
    }
}

/// Server bundle whose routes were rendered ahead of time.
#[derive(Debug)]
struct PrerenderedBundle {
    rendered: BTreeMap<String, String>,
}

impl ServerBundle for PrerenderedBundle {
    fn route_ids(&self) -> Vec<String> {
        self.rendered.keys().cloned().collect()
    }

    fn render_to_string(&self, route_id: &str) -> Result<String, BundlerError> {
        self.rendered
            .get(route_id)
            .cloned()
            .ok_or_else(|| BundlerError::MissingRoute(route_id.to_string()))
    }
}

async fn read_output(path: &Path) -> Result<String, BundlerError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BundlerError::Output(format!("{}: {}", path.display(), e)))
}

/// Asset files under `<out_dir>/<assets_dir>`, relative to `out_dir`.
fn list_assets(out_dir: &Path, assets_dir: &str) -> Vec<String> {
    let mut assets: Vec<String> = WalkDir::new(out_dir.join(assets_dir))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(out_dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    assets.sort();
    assets
}
