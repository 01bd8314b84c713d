//! folio.toml loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_static::BuildConfig;
use serde::Deserialize;

/// Configuration file structure (folio.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub pages: PagesConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub bundler: BundlerConfig,
}

#[derive(Debug, Deserialize)]
pub struct PagesConfig {
    #[serde(default = "default_pages_dir")]
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_server_entry")]
    pub server_entry: String,
    #[serde(default = "default_client_entry")]
    pub client_entry: String,
    #[serde(default)]
    pub hash_router: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct BundlerConfig {
    /// Bundler command line, program first
    #[serde(default)]
    pub command: Vec<String>,
    /// Passed to the bundler as JSON
    pub options: Option<toml::Table>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: default_pages_dir(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output: default_output(),
            base: default_base(),
            server_entry: default_server_entry(),
            client_entry: default_client_entry(),
            hash_router: false,
        }
    }
}

fn default_pages_dir() -> String {
    "pages".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_base() -> String {
    "/".to_string()
}
fn default_server_entry() -> String {
    "src/entry-server.js".to_string()
}
fn default_client_entry() -> String {
    "src/entry-client.js".to_string()
}

impl ConfigFile {
    /// Pages directory, preferring the command line over the config file.
    pub fn pages_dir(&self, dir: Option<PathBuf>) -> PathBuf {
        dir.unwrap_or_else(|| PathBuf::from(&self.pages.dir))
    }

    /// Builder configuration, preferring `output` over the config file.
    pub fn build_config(&self, output: Option<PathBuf>) -> Result<BuildConfig> {
        let bundler_options = match &self.bundler.options {
            Some(options) => serde_json::to_value(options)
                .context("Failed to convert [bundler.options] to JSON")?,
            None => serde_json::Value::Null,
        };

        Ok(BuildConfig {
            pages_dir: PathBuf::from(&self.pages.dir),
            output_dir: output.unwrap_or_else(|| PathBuf::from(&self.build.output)),
            base: self.build.base.clone(),
            server_entry: PathBuf::from(&self.build.server_entry),
            client_entry: PathBuf::from(&self.build.client_entry),
            hash_router: self.build.hash_router,
            bundler_options,
        })
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}
