//! Static site builder for folio.
//!
//! Runs page discovery, a server-render build and a client build through a
//! [`Bundler`], then writes one HTML file per route.

pub mod builder;
pub mod bundler;
pub mod command;
pub mod shell;

pub use builder::{BuildConfig, BuildError, BuildPhase, BuildReport, StaticSiteBuilder};
pub use bundler::{BuildMode, Bundler, BundlerError, BundlerOptions, ClientBuildResult, ServerBundle};
pub use command::CommandBundler;
