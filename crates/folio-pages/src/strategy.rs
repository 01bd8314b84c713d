//! Filesystem routing convention.
//!
//! A page is any file named `<name>$.<ext>` with a page extension:
//!
//! ```text
//! pages/index$.md          -> /
//! pages/about$.tsx         -> /about
//! pages/posts/index$.mdx   -> /posts
//! pages/posts/[slug]$.tsx  -> /posts/:slug
//! ```

use std::path::Path;
use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;

use crate::context::{DiscoveryContext, DiscoveryError};
use crate::registry::PageRegistration;

/// Glob matched against paths relative to the pages directory.
pub const PAGE_GLOB: &str = "**/*$.{md,mdx,js,jsx,ts,tsx}";

static PAGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\.(md|mdx|js|jsx|ts|tsx)$").expect("valid regex"));

static INDEX_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|/)index$").expect("valid regex"));

static DYNAMIC_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]/]+)\]").expect("valid regex"));

/// Convert a `/`-separated page file path, relative to the pages directory,
/// into its route id.
pub fn page_id_from_relative(relative: &str) -> String {
    let path = PAGE_SUFFIX.replace(relative, "");
    let path = INDEX_SEGMENT.replace(&path, "$1");
    let path = path.trim_end_matches('/');
    let path = DYNAMIC_SEGMENT.replace_all(path, ":$1");

    format!("/{}", path)
}

/// Find every page under `base_dir` and build its registration.
///
/// Each page registers its own file as the `main` data module, plus the
/// static data extracted from it.
pub(crate) async fn find_convention_pages(
    ctx: &DiscoveryContext,
    base_dir: &Path,
) -> Result<Vec<PageRegistration>, DiscoveryError> {
    let files = ctx.glob_find(base_dir, PAGE_GLOB).await?;

    try_join_all(files.into_iter().map(|file| async move {
        let page_id = page_id_from_relative(&file.relative);
        let static_data = ctx.extract_static_data(&file.absolute).await?;

        tracing::debug!("Found page {} at {}", page_id, file.relative);

        Ok::<_, DiscoveryError>(
            PageRegistration::new(page_id)
                .data_path(file.absolute.to_string_lossy())
                .extracted(static_data),
        )
    }))
    .await
}
