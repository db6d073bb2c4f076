//! Application configuration for remotedocs.
//!
//! The site build reads `remotedocs.toml` from the working directory
//! (or the path given with `--config`). CLI flags override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RemoteDocsError, Result};
use crate::types::ContentSource;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "remotedocs.toml";

/// Default User-Agent for fetch requests.
pub const DEFAULT_USER_AGENT: &str = concat!("remotedocs/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching remotedocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site layout.
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP client settings shared by all sources.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Declared content sources, in declaration order.
    #[serde(default)]
    pub sources: Vec<ContentSource>,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory every source `out_dir` is resolved against.
    #[serde(default = "default_content_root")]
    pub content_root: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
        }
    }
}

fn default_content_root() -> String {
    ".".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests across all sources.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Override for the User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> u32 {
    8
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file in the current working directory.
pub fn default_config_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| RemoteDocsError::config(format!("cannot determine working directory: {e}")))?;
    Ok(cwd.join(CONFIG_FILE_NAME))
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RemoteDocsError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        RemoteDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    tracing::debug!(
        path = %path.display(),
        sources = config.sources.len(),
        link_rewrites = config.sources.iter().map(|s| s.link_rewrites.len()).sum::<usize>(),
        "loaded config"
    );
    Ok(config)
}

/// Load the config from `path`, or from `remotedocs.toml` in the working directory.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => load_config_from(p),
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                return Err(RemoteDocsError::config(format!(
                    "no {CONFIG_FILE_NAME} found in the working directory \
                     (run `remotedocs config init` or pass --config)"
                )));
            }
            load_config_from(&p)
        }
    }
}

/// Write a starter config file. Refuses to overwrite unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(RemoteDocsError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RemoteDocsError::io(parent, e))?;
    }
    std::fs::write(path, STARTER_CONFIG).map_err(|e| RemoteDocsError::io(path, e))?;
    tracing::info!(path = %path.display(), "created starter config file");

    Ok(())
}

const STARTER_CONFIG: &str = r#"# remotedocs configuration.
#
# Every [[sources]] entry is fetched, made renderer-compatible (markdown
# only) and written to <content_root>/<out_dir>/<document>.

[site]
content_root = "."

[fetch]
timeout_secs = 30
concurrency = 8

[[sources]]
name = "ros-racer"
source_base_url = "https://raw.githubusercontent.com/eclipse-sdv-blueprints/ros-racer/main"
out_dir = "docs/ros-racer"
documents = ["README.md"]
fetch_options = { response_type = "binary" }

# Repository-relative links rewritten in this source's markdown.
# Anything not listed here is left untouched.
[[sources.link_rewrites]]
kind = "doc-sibling"
path = "docs/quickstart.md"

[[sources.link_rewrites]]
kind = "subtree-index"
path = "../demo/README.md"

[[sources.link_rewrites]]
kind = "license"
repository = "https://github.com/eclipse-sdv-blueprints/ros-racer"

[[sources]]
name = "ros-racer-img"
source_base_url = "https://raw.githubusercontent.com/eclipse-sdv-blueprints/ros-racer/main/docs/assets"
out_dir = "docs/ros-racer/docs/assets"
documents = ["introduction.png"]
fetch_options = { response_type = "binary" }
"#;
