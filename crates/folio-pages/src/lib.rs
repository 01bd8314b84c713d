//! Page discovery and data registration.
//!
//! A discovery pass walks a pages directory (or runs a custom [`FindPages`]
//! strategy), registers data modules and static data per route, and freezes
//! the result into a [`FindPagesResult`]. The result is rendered into the
//! virtual modules the bundler consumes.

pub mod codegen;
pub mod context;
pub mod fs;
pub mod glob;
pub mod modules;
pub mod registry;
pub mod strategy;

pub use codegen::{
    page_id_from_virtual_path, render_one_page_data, render_page_list, render_page_list_in_ssr,
    virtual_module_path,
};
pub use context::{collect_pages_data, DefaultFindPages, DiscoveryContext, DiscoveryError, FindPages};
pub use fs::{FileSystem, FsError, TokioFs};
pub use glob::{glob_find, GlobError, GlobMatch};
pub use modules::VirtualModules;
pub use registry::{
    DataKind, FindPagesResult, PageEntry, PageRegistration, PageRegistry, RegistryError,
    DEFAULT_DATA_KEY,
};
