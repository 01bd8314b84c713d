//! Bundler collaborator contract.
//!
//! folio does not bundle anything itself. A [`Bundler`] builds the server
//! entry into something that can render routes to HTML, and the client entry
//! into browser assets plus an HTML shell.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

/// Which of the two builds is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Server,
    Client,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Options passed to the bundler for one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BundlerOptions {
    pub mode: BuildMode,

    /// Entry module
    pub entry: PathBuf,

    /// Directory the build writes to
    pub out_dir: PathBuf,

    /// Assets subdirectory of `out_dir`
    pub assets_dir: String,

    /// Hash-based routing toggle (always off for static builds)
    pub hash_router: bool,

    /// Public base path, without trailing slash
    pub base: String,

    /// Directory holding the generated page modules, if written to disk
    pub virtual_modules_dir: Option<PathBuf>,

    /// Pass-through options, opaque to folio
    pub extra: serde_json::Value,
}

/// One result of a client build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientBuildResult {
    /// HTML shell emitted for the client entry
    pub html: String,

    /// Emitted asset file names
    pub assets: Vec<String>,
}

/// Output of the server build: renders routes to HTML fragments.
pub trait ServerBundle: Send + Sync {
    /// Route ids the server bundle has data for.
    fn route_ids(&self) -> Vec<String>;

    /// Render one route to the markup that goes inside the mount element.
    fn render_to_string(&self, route_id: &str) -> Result<String, BundlerError>;
}

/// External module bundler.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Build the server-render entry.
    async fn build_server(
        &self,
        options: &BundlerOptions,
    ) -> Result<Arc<dyn ServerBundle>, BundlerError>;

    /// Build the client entry. Bundlers with several outputs return several
    /// results; the static builder accepts exactly one.
    async fn build_client(
        &self,
        options: &BundlerOptions,
    ) -> Result<Vec<ClientBuildResult>, BundlerError>;
}

/// Errors reported by a bundler.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    #[error("Failed to start bundler `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bundler `{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid bundler output: {0}")]
    Output(String),

    #[error("Server bundle has no render for route \"{0}\"")]
    MissingRoute(String),

    #[error("{0}")]
    Other(String),
}
