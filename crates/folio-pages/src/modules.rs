//! Virtual module table over a discovery result.

use std::path::{Path, PathBuf};

use crate::codegen::{
    page_id_from_virtual_path, render_one_page_data, render_page_list, render_page_list_in_ssr,
    virtual_module_path, PAGE_LIST_MODULE, PAGE_LIST_SSR_MODULE,
};
use crate::fs::{FileSystem, FsError};
use crate::registry::FindPagesResult;

/// Resolves virtual module ids to generated source.
#[derive(Debug, Clone, Copy)]
pub struct VirtualModules<'a> {
    pages: &'a FindPagesResult,
}

impl<'a> VirtualModules<'a> {
    pub fn new(pages: &'a FindPagesResult) -> Self {
        Self { pages }
    }

    /// Generated source for `module_id`, or `None` if it is not one of ours
    /// or names an unknown route.
    pub fn load(&self, module_id: &str) -> Option<String> {
        match module_id {
            PAGE_LIST_MODULE => Some(render_page_list(self.pages)),
            PAGE_LIST_SSR_MODULE => Some(render_page_list_in_ssr(self.pages)),
            _ => {
                let page_id = page_id_from_virtual_path(module_id)?;
                let entry = self.pages.get(&page_id)?;
                Some(render_one_page_data(&entry.data))
            }
        }
    }

    /// Every module id this table can load.
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids = vec![PAGE_LIST_MODULE.to_string(), PAGE_LIST_SSR_MODULE.to_string()];
        ids.extend(self.pages.page_ids().map(virtual_module_path));
        ids
    }

    /// Write every module under `dir` and return the written paths.
    ///
    /// Layout: `pages.js`, `pages-ssr.js` and `pages/<sub path>.js`, where the
    /// sub path is the one used in the module id (`__index` for `/`).
    pub async fn write_to(&self, fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        let mut written = Vec::new();

        for module_id in self.module_ids() {
            let (Some(relative), Some(code)) = (module_file(&module_id), self.load(&module_id))
            else {
                continue;
            };

            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                fs.create_dir_all(parent).await?;
            }
            fs.write(&path, &code).await?;
            written.push(path);
        }

        tracing::debug!("Wrote {} virtual modules to {}", written.len(), dir.display());

        Ok(written)
    }
}

/// Relative file a module is written to by [`VirtualModules::write_to`].
// TODO: percent-encode `:` in dynamic segments so the layout works on Windows.
pub fn module_file(module_id: &str) -> Option<PathBuf> {
    match module_id {
        PAGE_LIST_MODULE => Some(PathBuf::from("pages.js")),
        PAGE_LIST_SSR_MODULE => Some(PathBuf::from("pages-ssr.js")),
        _ => {
            page_id_from_virtual_path(module_id)?;
            let sub_path = module_id.strip_prefix(PAGE_LIST_MODULE)?.trim_start_matches('/');
            Some(PathBuf::from(format!("pages/{}.js", sub_path)))
        }
    }
}
