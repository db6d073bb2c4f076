//! Build orchestration for remotedocs.
//!
//! Ties the registry, fetcher and markdown pipeline together and lands the
//! results in the site tree (`build_site`).

pub mod build;
pub mod writer;

pub use build::{
    BuildConfig, BuildReport, ProgressReporter, SilentProgress, WrittenFile, build_site,
};
pub use writer::{SiteWriter, sha256_hex};
