//! Shared types, error model, and configuration for remotedocs.
//!
//! This crate is the foundation depended on by all other remotedocs crates.
//! It provides:
//! - [`RemoteDocsError`], the unified error type
//! - Domain types ([`ContentSource`], [`LinkRule`], [`Document`], [`ContentHook`])
//! - The validated [`SourceRegistry`] and [`HookRegistry`]
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, DEFAULT_USER_AGENT, FetchConfig, SiteConfig,
    default_config_path, init_config, load_config, load_config_from,
};
pub use error::{RemoteDocsError, Result};
pub use registry::{HookRegistry, RegisteredSource, SourceRegistry};
pub use types::{
    ContentHook, ContentKind, ContentSource, Document, FetchOptions, HookOutput, LinkRule,
    ResponseType, is_safe_relative_path,
};
