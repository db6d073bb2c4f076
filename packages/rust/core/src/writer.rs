//! Site tree writer.
//!
//! Lands final document bytes at `<content_root>/<out_dir>/<relative_path>`.
//! Each write goes to a temp file in the target directory and is renamed
//! into place, so readers of the tree never see a partial file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use remotedocs_shared::{RemoteDocsError, Result, is_safe_relative_path};

/// Writes documents under a site content root.
#[derive(Debug, Clone)]
pub struct SiteWriter {
    content_root: PathBuf,
}

impl SiteWriter {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Write `bytes` to `out_dir/relative_path`, replacing any existing file.
    ///
    /// Returns the final path.
    pub fn write(&self, out_dir: &str, relative_path: &str, bytes: &[u8]) -> Result<PathBuf> {
        for part in [out_dir, relative_path] {
            if !is_safe_relative_path(part) {
                return Err(RemoteDocsError::io(
                    self.content_root.join(part),
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path escapes the content root",
                    ),
                ));
            }
        }

        let target = self.content_root.join(out_dir).join(relative_path);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.content_root.clone());
        std::fs::create_dir_all(&parent).map_err(|e| RemoteDocsError::io(&parent, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

        if let Err(e) = std::fs::write(&temp, bytes) {
            let _ = std::fs::remove_file(&temp);
            return Err(RemoteDocsError::io(&temp, e));
        }
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(RemoteDocsError::io(&target, e));
        }

        debug!(path = %target.display(), size = bytes.len(), "wrote file");
        Ok(target)
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
