//! JavaScript module generation for discovered pages.
//!
//! The bundler resolves these as virtual modules:
//!
//! - `@!virtual-modules/pages`: every route with a lazy data loader
//! - `@!virtual-modules/pages-ssr`: every route with its data imported eagerly
//! - `@!virtual-modules/pages/<routeId>`: the data modules of one route

use std::collections::BTreeMap;

use serde_json::Value;

use crate::registry::FindPagesResult;

/// Module id of the client page list.
pub const PAGE_LIST_MODULE: &str = "@!virtual-modules/pages";

/// Module id of the server-render page list.
pub const PAGE_LIST_SSR_MODULE: &str = "@!virtual-modules/pages-ssr";

/// Sub-path standing in for the root route in per-page module ids.
///
/// `import("@!virtual-modules/pages/")` is ambiguous to bundlers, so `/`
/// becomes `/__index`.
pub const INDEX_TOKEN: &str = "__index";

/// Module id of the per-page data module for `page_id`.
pub fn virtual_module_path(page_id: &str) -> String {
    if page_id == "/" {
        format!("{}/{}", PAGE_LIST_MODULE, INDEX_TOKEN)
    } else {
        format!("{}{}", PAGE_LIST_MODULE, page_id)
    }
}

/// Inverse of [`virtual_module_path`].
///
/// Returns `None` for ids outside the per-page scheme, including the page
/// list modules themselves.
pub fn page_id_from_virtual_path(module_id: &str) -> Option<String> {
    let sub_path = module_id.strip_prefix(PAGE_LIST_MODULE)?;
    if !sub_path.starts_with('/') || sub_path == "/" {
        return None;
    }

    if sub_path.strip_prefix('/') == Some(INDEX_TOKEN) {
        Some("/".to_string())
    } else {
        Some(sub_path.to_string())
    }
}

/// Normalize a module path to forward slashes.
///
/// Windows extended-length paths (`\\?\`) are kept as they are.
pub fn normalize_module_path(path: &str) -> String {
    if path.starts_with(r"\\?\") {
        path.to_string()
    } else {
        path.replace('\\', "/")
    }
}

/// Client page list: route id -> lazy data loader and static data.
pub fn render_page_list(pages: &FindPagesResult) -> String {
    let entries: String = pages
        .iter()
        .map(|(page_id, entry)| {
            let id = js_string(page_id);
            let static_data = Value::Object(entry.static_data.clone().into_iter().collect());
            format!(
                r#"
pages[{id}] = {{}};
pages[{id}].data = () => import({module});
pages[{id}].staticData = {static_data};
"#,
                module = js_string(&virtual_module_path(page_id)),
            )
        })
        .collect();

    format!("const pages = {{}};\n{entries}\nexport default pages;\n")
}

/// Server-render page list: every route's data module imported statically.
pub fn render_page_list_in_ssr(pages: &FindPagesResult) -> String {
    let entries: String = pages
        .page_ids()
        .enumerate()
        .map(|(index, page_id)| {
            format!(
                r#"
import page{index} from {module};
pages[{id}] = page{index};
"#,
                id = js_string(page_id),
                module = js_string(&virtual_module_path(page_id)),
            )
        })
        .collect();

    format!("const pages = {{}};\n{entries}\nexport default pages;\n")
}

/// Per-page data module: every data key of one route, keyed by data key.
pub fn render_one_page_data(data: &BTreeMap<String, String>) -> String {
    let imports: String = data
        .iter()
        .enumerate()
        .map(|(index, (key, path))| {
            format!(
                r#"
import * as m{index} from {path};
modules[{key}] = m{index};
"#,
                path = js_string(&normalize_module_path(path)),
                key = js_string(key),
            )
        })
        .collect();

    format!("const modules = {{}};\n{imports}\nexport default modules;\n")
}

/// Quote a string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    Value::from(s).to_string()
}
