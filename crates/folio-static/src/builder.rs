//! Static site builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;

use folio_pages::{
    collect_pages_data, DiscoveryError, FileSystem, FindPages, FsError, TokioFs, VirtualModules,
};

use crate::bundler::{BuildMode, Bundler, BundlerError, BundlerOptions, ServerBundle};
use crate::shell::{has_mount_point, render_route_html, route_output_file, MOUNT_PLACEHOLDER};

const SSR_TMP_DIR: &str = "ssr-tmp";
const CLIENT_TMP_DIR: &str = "client-tmp";
const MODULES_TMP_DIR: &str = "modules-tmp";
const ASSETS_DIR: &str = "_assets";
const NOT_FOUND_ROUTE: &str = "/404";

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Pages directory searched by discovery
    pub pages_dir: PathBuf,

    /// Output directory, relative to the current directory unless absolute
    pub output_dir: PathBuf,

    /// Public base path of the site
    pub base: String,

    /// Server-render entry module
    pub server_entry: PathBuf,

    /// Client entry module
    pub client_entry: PathBuf,

    /// Hash routing as configured by the user; static builds turn it off
    pub hash_router: bool,

    /// Options passed through to the bundler untouched
    pub bundler_options: serde_json::Value,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("pages"),
            output_dir: PathBuf::from("dist"),
            base: "/".to_string(),
            server_entry: PathBuf::from("src/entry-server.js"),
            client_entry: PathBuf::from("src/entry-client.js"),
            hash_router: false,
            bundler_options: serde_json::Value::Null,
        }
    }
}

/// Progress of a build. `Failed` is entered from whichever phase errored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    ServerBuilding,
    ServerBuilt,
    ClientBuilding,
    ClientBuilt,
    Rendering,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ServerBuilding => "server build",
            Self::ServerBuilt => "server built",
            Self::ClientBuilding => "client build",
            Self::ClientBuilt => "client built",
            Self::Rendering => "rendering",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildReport {
    /// Rendered route ids
    pub routes: Vec<String>,

    /// Number of pages found by discovery
    pub pages: usize,

    /// Whether `404/index.html` was copied to the site root
    pub used_404_fallback: bool,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Page discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Bundler failed during {mode} build: {source}")]
    Bundler {
        mode: BuildMode,
        #[source]
        source: BundlerError,
    },

    #[error("Failed to render route \"{route_id}\": {source}")]
    Render {
        route_id: String,
        #[source]
        source: BundlerError,
    },

    #[error("Expected exactly one client build result, got {0}")]
    UnexpectedBuildOutput(usize),

    #[error("Client HTML shell must contain {}", MOUNT_PLACEHOLDER)]
    MissingMountPoint,

    #[error(transparent)]
    Filesystem(#[from] FsError),
}

/// Static site builder.
pub struct StaticSiteBuilder {
    config: BuildConfig,
    bundler: Arc<dyn Bundler>,
    fs: Arc<dyn FileSystem>,
    find_pages: Option<Arc<dyn FindPages>>,
}

/// Working directories of one build.
struct BuildDirs {
    output: PathBuf,
    ssr: PathBuf,
    client: PathBuf,
    modules: PathBuf,
}

impl BuildDirs {
    fn new(output: PathBuf) -> Self {
        Self {
            ssr: output.join(SSR_TMP_DIR),
            client: output.join(CLIENT_TMP_DIR),
            modules: output.join(MODULES_TMP_DIR),
            output,
        }
    }
}

impl StaticSiteBuilder {
    /// Create a builder using the real filesystem and default page discovery.
    pub fn new(config: BuildConfig, bundler: Arc<dyn Bundler>) -> Self {
        Self {
            config,
            bundler,
            fs: Arc::new(TokioFs),
            find_pages: None,
        }
    }

    /// Replace the filesystem collaborator.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Use a custom page discovery strategy.
    pub fn with_find_pages(mut self, find_pages: Arc<dyn FindPages>) -> Self {
        self.find_pages = Some(find_pages);
        self
    }

    /// Build the static site.
    ///
    /// On failure the temporary build directories are left in place.
    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        let mut phase = BuildPhase::Idle;

        match self.run(&mut phase).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Build failed during {}: {}", phase, e);
                enter(&mut phase, BuildPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, phase: &mut BuildPhase) -> Result<BuildReport, BuildError> {
        let start = Instant::now();

        // Discovery errors abort before any bundler work.
        let pages = collect_pages_data(
            &self.config.pages_dir,
            self.find_pages.as_deref(),
            Arc::clone(&self.fs),
        )
        .await?;

        enter(phase, BuildPhase::ServerBuilding);
        let dirs = BuildDirs::new(resolve_output_dir(&self.config.output_dir)?);
        self.fs.empty_dir(&dirs.output).await?;

        VirtualModules::new(&pages)
            .write_to(self.fs.as_ref(), &dirs.modules)
            .await?;

        if self.config.hash_router {
            tracing::info!("Hash routing is disabled for static builds");
        }

        let server = self
            .bundler
            .build_server(&self.bundler_options(BuildMode::Server, &dirs))
            .await
            .map_err(|source| BuildError::Bundler {
                mode: BuildMode::Server,
                source,
            })?;
        let routes = server.route_ids();
        enter(phase, BuildPhase::ServerBuilt);

        enter(phase, BuildPhase::ClientBuilding);
        let mut client_results = self
            .bundler
            .build_client(&self.bundler_options(BuildMode::Client, &dirs))
            .await
            .map_err(|source| BuildError::Bundler {
                mode: BuildMode::Client,
                source,
            })?;
        if client_results.len() != 1 {
            return Err(BuildError::UnexpectedBuildOutput(client_results.len()));
        }
        let client = client_results.remove(0);
        tracing::debug!("Client build emitted {} assets", client.assets.len());

        // Only the per-route shells written below are kept.
        self.fs.remove(&dirs.client.join("index.html")).await?;
        enter(phase, BuildPhase::ClientBuilt);

        enter(phase, BuildPhase::Rendering);
        if !routes.is_empty() && !has_mount_point(&client.html) {
            return Err(BuildError::MissingMountPoint);
        }
        try_join_all(routes.iter().map(|route_id| {
            self.render_route(server.as_ref(), &client.html, route_id, &dirs.client)
        }))
        .await?;
        tracing::info!("Rendered {} routes", routes.len());

        enter(phase, BuildPhase::Assembling);
        let used_404_fallback = self.apply_not_found_fallback(&routes, &dirs.client).await?;

        self.fs.copy(&dirs.client, &dirs.output).await?;
        for temp in [&dirs.client, &dirs.ssr, &dirs.modules] {
            if let Err(e) = self.fs.remove(temp).await {
                tracing::warn!("Failed to clean up {}: {}", temp.display(), e);
            }
        }
        enter(phase, BuildPhase::Done);

        Ok(BuildReport {
            routes,
            pages: pages.len(),
            used_404_fallback,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: dirs.output,
        })
    }

    fn bundler_options(&self, mode: BuildMode, dirs: &BuildDirs) -> BundlerOptions {
        let (entry, out_dir) = match mode {
            BuildMode::Server => (&self.config.server_entry, &dirs.ssr),
            BuildMode::Client => (&self.config.client_entry, &dirs.client),
        };

        BundlerOptions {
            mode,
            entry: entry.clone(),
            out_dir: out_dir.clone(),
            assets_dir: ASSETS_DIR.to_string(),
            hash_router: false,
            base: normalize_base(&self.config.base),
            virtual_modules_dir: Some(dirs.modules.clone()),
            extra: self.config.bundler_options.clone(),
        }
    }

    /// Render one route into `<client_dir>/<route>/index.html`.
    async fn render_route(
        &self,
        server: &dyn ServerBundle,
        shell: &str,
        route_id: &str,
        client_dir: &Path,
    ) -> Result<(), BuildError> {
        let fragment = server
            .render_to_string(route_id)
            .map_err(|source| BuildError::Render {
                route_id: route_id.to_string(),
                source,
            })?;
        let html =
            render_route_html(shell, route_id, &fragment).ok_or(BuildError::MissingMountPoint)?;

        let path = client_dir.join(route_output_file(route_id));
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        self.fs.write(&path, &html).await?;

        tracing::debug!("Rendered {} -> {}", route_id, path.display());
        Ok(())
    }

    /// Serve the not-found page at the root when no page claims `/`.
    async fn apply_not_found_fallback(
        &self,
        routes: &[String],
        client_dir: &Path,
    ) -> Result<bool, BuildError> {
        if routes.iter().any(|r| r == "/") {
            return Ok(false);
        }

        let not_found = client_dir.join(route_output_file(NOT_FOUND_ROUTE));
        if !self.fs.exists(&not_found).await {
            return Ok(false);
        }

        self.fs
            .copy(&not_found, &client_dir.join(route_output_file("/")))
            .await?;
        tracing::info!("No root page, serving 404 page at /");
        Ok(true)
    }
}

fn enter(phase: &mut BuildPhase, next: BuildPhase) {
    tracing::debug!("Build phase: {} -> {}", phase, next);
    *phase = next;
}

fn resolve_output_dir(output_dir: &Path) -> Result<PathBuf, FsError> {
    std::path::absolute(output_dir).map_err(|e| FsError::new("resolve", output_dir, e))
}

/// Strip the trailing slash of a base path: `/docs/` -> `/docs`, `/` -> ``.
fn normalize_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::ClientBuildResult;
    use async_trait::async_trait;
    use folio_pages::{DiscoveryContext, PageRegistration, RegistryError};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const SHELL: &str = r#"<!doctype html><html><body><div id="root"></div><script type="module" src="/_assets/app.js"></script></body></html>"#;

    /// Registers a fixed set of route ids.
    struct StaticPages(Vec<&'static str>);

    #[async_trait]
    impl FindPages for StaticPages {
        async fn find_pages(&self, ctx: &DiscoveryContext) -> Result<(), DiscoveryError> {
            for id in &self.0 {
                ctx.register_page(PageRegistration::new(*id).data_path(format!("{}.js", id)))?;
            }
            Ok(())
        }
    }

    struct FakeServer {
        routes: Vec<String>,
        fail_on: Option<String>,
    }

    impl ServerBundle for FakeServer {
        fn route_ids(&self) -> Vec<String> {
            self.routes.clone()
        }

        fn render_to_string(&self, route_id: &str) -> Result<String, BundlerError> {
            if self.fail_on.as_deref() == Some(route_id) {
                return Err(BundlerError::Other("render exploded".to_string()));
            }
            Ok(format!("<h1>{}</h1>", route_id))
        }
    }

    /// Registers the home page by data module and the about page by static
    /// data only.
    struct HomeAndAbout;

    #[async_trait]
    impl FindPages for HomeAndAbout {
        async fn find_pages(&self, ctx: &DiscoveryContext) -> Result<(), DiscoveryError> {
            ctx.register_page(PageRegistration::new("/").data_path("a.js"))?;
            ctx.register_page(
                PageRegistration::new("/about")
                    .static_data(serde_json::json!({ "title": "About" })),
            )?;
            Ok(())
        }
    }

    /// Writes a default shell and one asset, like a real client build would.
    struct FakeBundler {
        shell: String,
        client_results: usize,
        fail_on: Option<String>,
        calls: Mutex<Vec<BundlerOptions>>,
        /// Client page list seen by the server build
        page_list: Mutex<Option<String>>,
    }

    impl FakeBundler {
        fn new() -> Self {
            Self {
                shell: SHELL.to_string(),
                client_results: 1,
                fail_on: None,
                calls: Mutex::new(Vec::new()),
                page_list: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Bundler for FakeBundler {
        async fn build_server(
            &self,
            options: &BundlerOptions,
        ) -> Result<Arc<dyn ServerBundle>, BundlerError> {
            self.calls.lock().unwrap().push(options.clone());

            // The fake server bundle exposes whatever discovery wrote.
            let modules_dir = options.virtual_modules_dir.as_ref().unwrap();
            let list = fs::read_to_string(modules_dir.join("pages-ssr.js"))
                .map_err(|e| BundlerError::Other(e.to_string()))?;
            *self.page_list.lock().unwrap() = fs::read_to_string(modules_dir.join("pages.js")).ok();
            let routes = list
                .lines()
                .filter_map(|l| l.strip_prefix("pages[\""))
                .filter_map(|l| l.split_once("\"] = page"))
                .map(|(id, _)| id.to_string())
                .collect();

            fs::create_dir_all(&options.out_dir).unwrap();
            Ok(Arc::new(FakeServer {
                routes,
                fail_on: self.fail_on.clone(),
            }))
        }

        async fn build_client(
            &self,
            options: &BundlerOptions,
        ) -> Result<Vec<ClientBuildResult>, BundlerError> {
            self.calls.lock().unwrap().push(options.clone());

            let assets = options.out_dir.join(&options.assets_dir);
            fs::create_dir_all(&assets).unwrap();
            fs::write(assets.join("app.js"), "console.log('hi')").unwrap();
            fs::write(options.out_dir.join("index.html"), &self.shell).unwrap();

            let result = ClientBuildResult {
                html: self.shell.clone(),
                assets: vec!["_assets/app.js".to_string()],
            };
            Ok(vec![result; self.client_results])
        }
    }

    fn builder(out: &Path, pages: Vec<&'static str>, bundler: Arc<FakeBundler>) -> StaticSiteBuilder {
        let config = BuildConfig {
            pages_dir: PathBuf::from("unused"),
            output_dir: out.to_path_buf(),
            base: "/docs/".to_string(),
            hash_router: true,
            ..Default::default()
        };
        StaticSiteBuilder::new(config, bundler).with_find_pages(Arc::new(StaticPages(pages)))
    }

    #[tokio::test]
    async fn renders_every_route_into_the_shell() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");

        let report = builder(&out, vec!["/", "/about"], Arc::new(FakeBundler::new()))
            .build()
            .await
            .unwrap();

        assert_eq!(report.routes, vec!["/", "/about"]);
        assert!(!report.used_404_fallback);

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        let about = fs::read_to_string(out.join("about/index.html")).unwrap();

        assert_ne!(index, SHELL);
        assert!(index.contains(r#"<div id="root"><h1>/</h1></div>"#));
        assert!(index.contains(r#"window.__folioSSR={"routePath":"/"};"#));
        assert!(about.contains(r#"<div id="root"><h1>/about</h1></div>"#));
        assert!(about.contains(r#"window.__folioSSR={"routePath":"/about"};"#));
        assert!(!about.contains(MOUNT_PLACEHOLDER));

        assert!(out.join("_assets/app.js").exists());
        assert!(!out.join(SSR_TMP_DIR).exists());
        assert!(!out.join(CLIENT_TMP_DIR).exists());
        assert!(!out.join(MODULES_TMP_DIR).exists());
    }

    #[tokio::test]
    async fn builds_data_and_static_data_pages() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = Arc::new(FakeBundler::new());
        let config = BuildConfig {
            output_dir: out.clone(),
            ..Default::default()
        };

        let report = StaticSiteBuilder::new(config, bundler.clone())
            .with_find_pages(Arc::new(HomeAndAbout))
            .build()
            .await
            .unwrap();

        assert_eq!(report.routes, vec!["/", "/about"]);
        assert_eq!(report.pages, 2);

        let page_list = bundler.page_list.lock().unwrap().clone().unwrap();
        assert!(page_list.contains(r#"pages["/"].staticData = {};"#));
        assert!(page_list.contains(r#"pages["/about"].staticData = {"main":{"title":"About"}};"#));

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        let about = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert!(index.contains(
            "<script>window.__folioSSR={\"routePath\":\"/\"};</script>\n<div id=\"root\"><h1>/</h1></div>"
        ));
        assert!(about.contains(
            "<script>window.__folioSSR={\"routePath\":\"/about\"};</script>\n<div id=\"root\"><h1>/about</h1></div>"
        ));
        assert!(!index.contains(MOUNT_PLACEHOLDER));
        assert!(!about.contains(MOUNT_PLACEHOLDER));
    }

    #[tokio::test]
    async fn empty_site_skips_mount_point_check() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = FakeBundler {
            shell: "<html><body><main></main></body></html>".to_string(),
            ..FakeBundler::new()
        };

        let report = builder(&out, vec![], Arc::new(bundler))
            .build()
            .await
            .unwrap();

        assert!(report.routes.is_empty());
        assert!(!report.used_404_fallback);
        assert!(!out.join("index.html").exists());
        assert!(out.join("_assets/app.js").exists());
    }

    #[tokio::test]
    async fn falls_back_to_not_found_page_at_root() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");

        let report = builder(&out, vec!["/404", "/blog"], Arc::new(FakeBundler::new()))
            .build()
            .await
            .unwrap();

        assert!(report.used_404_fallback);
        assert_eq!(
            fs::read(out.join("index.html")).unwrap(),
            fs::read(out.join("404/index.html")).unwrap()
        );
        assert!(out.join("blog/index.html").exists());
    }

    #[tokio::test]
    async fn no_root_page_without_not_found_page() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");

        let report = builder(&out, vec!["/blog"], Arc::new(FakeBundler::new()))
            .build()
            .await
            .unwrap();

        assert!(!report.used_404_fallback);
        assert!(!out.join("index.html").exists());
    }

    #[tokio::test]
    async fn clears_stale_output() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.html"), "old").unwrap();

        builder(&out, vec!["/"], Arc::new(FakeBundler::new()))
            .build()
            .await
            .unwrap();

        assert!(!out.join("stale.html").exists());
    }

    #[tokio::test]
    async fn forces_path_routing_and_passes_options() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = Arc::new(FakeBundler::new());

        builder(&out, vec!["/"], bundler.clone()).build().await.unwrap();

        let calls = bundler.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].mode, BuildMode::Server);
        assert_eq!(calls[1].mode, BuildMode::Client);
        assert!(calls.iter().all(|c| !c.hash_router));
        assert!(calls.iter().all(|c| c.base == "/docs"));
        assert!(calls[0].out_dir.ends_with(SSR_TMP_DIR));
        assert!(calls[1].out_dir.ends_with(CLIENT_TMP_DIR));
        assert_eq!(calls[1].assets_dir, ASSETS_DIR);
    }

    #[tokio::test]
    async fn rejects_multiple_client_results_before_rendering() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = FakeBundler {
            client_results: 2,
            ..FakeBundler::new()
        };

        let err = builder(&out, vec!["/", "/blog"], Arc::new(bundler))
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::UnexpectedBuildOutput(2)));
        // Nothing rendered, temp dirs kept for inspection.
        assert!(!out.join(CLIENT_TMP_DIR).join("blog/index.html").exists());
        assert!(out.join(CLIENT_TMP_DIR).join("index.html").exists());
    }

    #[tokio::test]
    async fn requires_mount_point_in_shell() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = FakeBundler {
            shell: "<html><body><main></main></body></html>".to_string(),
            ..FakeBundler::new()
        };

        let err = builder(&out, vec!["/"], Arc::new(bundler))
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::MissingMountPoint));
    }

    #[tokio::test]
    async fn one_failed_route_fails_the_build() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = FakeBundler {
            fail_on: Some("/blog".to_string()),
            ..FakeBundler::new()
        };

        let err = builder(&out, vec!["/", "/blog", "/about"], Arc::new(bundler))
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Render { ref route_id, .. } if route_id == "/blog"));
        assert!(err.to_string().contains("/blog"));
        assert!(!out.join("index.html").exists());
    }

    #[tokio::test]
    async fn discovery_errors_abort_before_bundling() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        let bundler = Arc::new(FakeBundler::new());

        let err = builder(&out, vec!["/", "about"], bundler.clone())
            .build()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::Discovery(DiscoveryError::Registry(RegistryError::InvalidPageId(_)))
        ));
        assert!(bundler.calls.lock().unwrap().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn normalizes_base() {
        assert_eq!(normalize_base("/"), "");
        assert_eq!(normalize_base("/docs/"), "/docs");
        assert_eq!(normalize_base("/docs"), "/docs");
    }
}
