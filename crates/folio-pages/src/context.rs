//! Discovery context handed to page-finding strategies.
//!
//! A [`DiscoveryContext`] lives for exactly one discovery pass. It owns the
//! [`PageRegistry`] being built and a read cache that collapses concurrent
//! reads of the same file into one physical read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use folio_meta::{extract_static_data, MetaError, SourceKind, StaticData};

use crate::fs::{FileSystem, FsError};
use crate::glob::{glob_find, GlobError, GlobMatch};
use crate::registry::{FindPagesResult, PageRegistration, PageRegistry, RegistryError};
use crate::strategy;

type SharedRead = Shared<BoxFuture<'static, Result<Arc<str>, FsError>>>;

/// Errors that abort a discovery pass.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to extract static data from {}: {source}", .path.display())]
    StaticData {
        path: PathBuf,
        #[source]
        source: MetaError,
    },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Glob(#[from] GlobError),
}

/// A page-finding strategy.
///
/// Implementations register every page they want recorded through
/// [`DiscoveryContext::register_page`]. [`DefaultFindPages`] is the
/// filesystem-convention strategy used when none is configured.
#[async_trait]
pub trait FindPages: Send + Sync {
    async fn find_pages(&self, ctx: &DiscoveryContext) -> Result<(), DiscoveryError>;
}

/// Filesystem-convention strategy: registers every page found by
/// [`DiscoveryContext::default_find_pages`] under the pages directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFindPages;

#[async_trait]
impl FindPages for DefaultFindPages {
    async fn find_pages(&self, ctx: &DiscoveryContext) -> Result<(), DiscoveryError> {
        let found = ctx.default_find_pages(ctx.pages_dir()).await?;
        for page in found {
            ctx.register_page(page)?;
        }
        Ok(())
    }
}

/// Helper surface for one discovery pass.
pub struct DiscoveryContext {
    pages_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    registry: Mutex<PageRegistry>,
    read_cache: Mutex<HashMap<PathBuf, SharedRead>>,
}

impl DiscoveryContext {
    /// Create a context with an empty registry and an empty read cache.
    pub fn new(pages_dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            fs,
            registry: Mutex::new(PageRegistry::new()),
            read_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Base directory of this discovery pass.
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Read a text file, at most once per path for the lifetime of the context.
    ///
    /// A read that is still in flight is shared with later callers, and a
    /// failed read keeps failing with the same error.
    pub async fn read_file(&self, path: &Path) -> Result<Arc<str>, FsError> {
        let read = {
            let mut cache = self.read_cache.lock();
            cache
                .entry(path.to_path_buf())
                .or_insert_with(|| {
                    let fs = Arc::clone(&self.fs);
                    let path = path.to_path_buf();
                    async move { fs.read_to_string(&path).await.map(Arc::<str>::from) }
                        .boxed()
                        .shared()
                })
                .clone()
        };

        read.await
    }

    /// Extract static data from a page file, reading it through the cache.
    pub async fn extract_static_data(&self, path: &Path) -> Result<StaticData, DiscoveryError> {
        let meta_error = |source: MetaError| DiscoveryError::StaticData {
            path: path.to_path_buf(),
            source,
        };

        let kind = SourceKind::from_path(path).map_err(meta_error)?;
        let content = self.read_file(path).await?;
        extract_static_data(&content, kind).map_err(meta_error)
    }

    /// Glob search relative to `base_dir`.
    pub async fn glob_find(&self, base_dir: &Path, pattern: &str) -> Result<Vec<GlobMatch>, GlobError> {
        let base_dir = base_dir.to_path_buf();
        let pattern = pattern.to_string();

        tokio::task::spawn_blocking(move || glob_find(&base_dir, &pattern))
            .await
            .map_err(|e| GlobError::Task(e.to_string()))?
    }

    /// Find pages under `base_dir` using the filesystem convention.
    ///
    /// The pages are returned, not registered.
    pub async fn default_find_pages(
        &self,
        base_dir: &Path,
    ) -> Result<Vec<PageRegistration>, DiscoveryError> {
        strategy::find_convention_pages(self, base_dir).await
    }

    /// Register page data for this pass.
    pub fn register_page(&self, request: PageRegistration) -> Result<(), RegistryError> {
        self.registry.lock().register(request)
    }

    /// End the pass and freeze the registry.
    pub fn into_result(self) -> FindPagesResult {
        self.registry.into_inner().finish()
    }
}

/// Run one discovery pass over `pages_dir`.
///
/// With a custom strategy, only what it registers is recorded. Without one,
/// [`DefaultFindPages`] runs.
pub async fn collect_pages_data(
    pages_dir: &Path,
    find_pages: Option<&dyn FindPages>,
    fs: Arc<dyn FileSystem>,
) -> Result<FindPagesResult, DiscoveryError> {
    let ctx = DiscoveryContext::new(pages_dir, fs);

    match find_pages {
        Some(strategy) => strategy.find_pages(&ctx).await?,
        None => DefaultFindPages.find_pages(&ctx).await?,
    }

    let result = ctx.into_result();
    tracing::info!(
        "Discovered {} pages in {}",
        result.len(),
        pages_dir.display()
    );

    Ok(result)
}
