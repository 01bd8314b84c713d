//! Page registry built during one discovery pass.
//!
//! [`PageRegistry`] is the mutable builder owned by discovery. Once discovery
//! is done it is consumed into a [`FindPagesResult`], which has no mutation API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use folio_meta::StaticData;

use crate::codegen::INDEX_TOKEN;

/// Data key used when a registration does not name one.
pub const DEFAULT_DATA_KEY: &str = "main";

/// Everything registered for one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Data key -> runtime data module path
    pub data: BTreeMap<String, String>,

    /// Data key -> static metadata record
    #[serde(rename = "staticData")]
    pub static_data: BTreeMap<String, Value>,
}

/// A request to attach data to a page.
///
/// Requests for the same `page_id` are merged into one [`PageEntry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRegistration {
    /// Route id, e.g. `/posts/hello-world`
    pub page_id: String,

    /// Data key, [`DEFAULT_DATA_KEY`] when absent
    pub key: Option<String>,

    /// Path to the runtime data module
    pub data_path: Option<String>,

    /// Static metadata for this key
    pub static_data: Option<Value>,
}

impl PageRegistration {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            ..Default::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn static_data(mut self, data: impl Into<Value>) -> Self {
        self.static_data = Some(data.into());
        self
    }

    /// Attach an extracted metadata record as static data.
    pub fn extracted(self, data: StaticData) -> Self {
        self.static_data(Value::Object(data))
    }
}

/// Which namespace of a page entry a conflict happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Data,
    StaticData,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::StaticData => f.write_str("staticData"),
        }
    }
}

/// Errors raised while registering pages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid page id \"{0}\": page ids must start with \"/\"")]
    InvalidPageId(String),

    #[error("Page id \"{0}\" is reserved for the root page's generated module")]
    ReservedPageId(String),

    #[error(
        "Conflicting {kind} for page \"{page_id}\": key \"{key}\" already exists, give this {kind} another key"
    )]
    DuplicateDataKey {
        page_id: String,
        key: String,
        kind: DataKind,
    },
}

/// Mutable page store for a single discovery pass.
#[derive(Debug, Default)]
pub struct PageRegistry {
    pages: BTreeMap<String, PageEntry>,
}

impl PageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a registration into the entry for its page id.
    ///
    /// Both namespaces are checked before anything is written, so a rejected
    /// request leaves the registry unchanged.
    pub fn register(&mut self, request: PageRegistration) -> Result<(), RegistryError> {
        let PageRegistration {
            page_id,
            key,
            data_path,
            static_data,
        } = request;

        if !page_id.starts_with('/') {
            return Err(RegistryError::InvalidPageId(page_id));
        }
        // `/` is generated under this sub path, so the two would share a module.
        if page_id.strip_prefix('/') == Some(INDEX_TOKEN) {
            return Err(RegistryError::ReservedPageId(page_id));
        }

        let key = key.unwrap_or_else(|| DEFAULT_DATA_KEY.to_string());

        if let Some(existing) = self.pages.get(&page_id) {
            let conflict = if data_path.is_some() && existing.data.contains_key(&key) {
                Some(DataKind::Data)
            } else if static_data.is_some() && existing.static_data.contains_key(&key) {
                Some(DataKind::StaticData)
            } else {
                None
            };

            if let Some(kind) = conflict {
                return Err(RegistryError::DuplicateDataKey { page_id, key, kind });
            }
        }

        tracing::debug!("Registering page {} (key {})", page_id, key);

        let entry = self.pages.entry(page_id).or_default();
        if let Some(path) = data_path {
            entry.data.insert(key.clone(), path);
        }
        if let Some(data) = static_data {
            entry.static_data.insert(key, data);
        }

        Ok(())
    }

    /// Number of pages registered so far.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Freeze the registry into its final, read-only form.
    pub fn finish(self) -> FindPagesResult {
        FindPagesResult { pages: self.pages }
    }
}

/// Finalized result of a discovery pass: route id -> page entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindPagesResult {
    pages: BTreeMap<String, PageEntry>,
}

impl FindPagesResult {
    /// Look up one page.
    pub fn get(&self, page_id: &str) -> Option<&PageEntry> {
        self.pages.get(page_id)
    }

    pub fn contains(&self, page_id: &str) -> bool {
        self.pages.contains_key(page_id)
    }

    /// Route ids in sorted order.
    pub fn page_ids(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Pages in route id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PageEntry)> {
        self.pages.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merges_registrations_for_same_page() {
        let mut registry = PageRegistry::new();
        registry
            .register(PageRegistration::new("/blog").data_path("blog.js"))
            .unwrap();
        registry
            .register(
                PageRegistration::new("/blog")
                    .key("posts")
                    .data_path("posts.js"),
            )
            .unwrap();
        registry
            .register(PageRegistration::new("/blog").static_data(json!({ "title": "Blog" })))
            .unwrap();

        let result = registry.finish();
        let entry = result.get("/blog").unwrap();

        assert_eq!(entry.data["main"], "blog.js");
        assert_eq!(entry.data["posts"], "posts.js");
        assert_eq!(entry.static_data["main"], json!({ "title": "Blog" }));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn same_key_may_carry_data_and_static_data() {
        let mut registry = PageRegistry::new();
        registry
            .register(
                PageRegistration::new("/")
                    .data_path("index.js")
                    .static_data(json!({ "title": "Home" })),
            )
            .unwrap();

        let result = registry.finish();

        assert_eq!(result.get("/").unwrap().data["main"], "index.js");
        assert_eq!(
            result.get("/").unwrap().static_data["main"],
            json!({ "title": "Home" })
        );
    }

    #[test]
    fn rejects_duplicate_data_key() {
        let mut registry = PageRegistry::new();
        registry
            .register(PageRegistration::new("/a").data_path("one.js"))
            .unwrap();

        let err = registry
            .register(PageRegistration::new("/a").key("main").data_path("two.js"))
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::DuplicateDataKey { ref page_id, ref key, kind: DataKind::Data }
                if page_id == "/a" && key == "main"
        ));
        assert!(err.to_string().contains("\"main\""));
    }

    #[test]
    fn rejects_duplicate_static_data_key_independently() {
        let mut registry = PageRegistry::new();
        registry
            .register(PageRegistration::new("/a").static_data(json!({ "n": 1 })))
            .unwrap();
        // The data namespace is still free for "main".
        registry
            .register(PageRegistration::new("/a").data_path("a.js"))
            .unwrap();

        let err = registry
            .register(PageRegistration::new("/a").static_data(json!({ "n": 2 })))
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::DuplicateDataKey { kind: DataKind::StaticData, .. }
        ));
    }

    #[test]
    fn rejected_request_leaves_registry_unchanged() {
        let mut registry = PageRegistry::new();
        registry
            .register(PageRegistration::new("/a").static_data(json!(1)))
            .unwrap();

        let result = registry.register(
            PageRegistration::new("/a")
                .data_path("a.js")
                .static_data(json!(2)),
        );

        assert!(result.is_err());
        let result = registry.finish();
        assert!(result.get("/a").unwrap().data.is_empty());
        assert_eq!(result.get("/a").unwrap().static_data["main"], json!(1));
    }

    #[test]
    fn rejects_page_ids_without_leading_slash() {
        for id in ["", "about", "about/", " /about", "./about", "\\about"] {
            let mut registry = PageRegistry::new();
            let err = registry
                .register(PageRegistration::new(id).data_path("x.js"))
                .unwrap_err();

            assert!(matches!(err, RegistryError::InvalidPageId(ref got) if got == id));
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn rejects_root_module_token_as_page_id() {
        let mut registry = PageRegistry::new();
        registry
            .register(PageRegistration::new("/").data_path("index.js"))
            .unwrap();

        let err = registry
            .register(PageRegistration::new("/__index").data_path("other.js"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::ReservedPageId(ref id) if id == "/__index"));
        // Nested paths under the token do not collide.
        registry
            .register(PageRegistration::new("/__index/child").data_path("child.js"))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registration_without_payload_creates_empty_entry() {
        let mut registry = PageRegistry::new();
        registry.register(PageRegistration::new("/empty")).unwrap();

        let result = registry.finish();

        assert_eq!(result.get("/empty"), Some(&PageEntry::default()));
    }

    #[test]
    fn serializes_as_route_map() {
        let mut registry = PageRegistry::new();
        registry
            .register(
                PageRegistration::new("/about")
                    .data_path("about.md")
                    .static_data(json!({ "title": "About" })),
            )
            .unwrap();

        let value = serde_json::to_value(registry.finish()).unwrap();

        assert_eq!(
            value,
            json!({
                "/about": {
                    "data": { "main": "about.md" },
                    "staticData": { "main": { "title": "About" } }
                }
            })
        );
    }
}
