//! On-disk storage for uploaded bytes
//!
//! Layout: `<root>/YYYY/MM/DD/<uuid>-<filename>`.

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload under today's directory and return its path
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.root.join(Utc::now().format("%Y/%m/%d").to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}-{}", Uuid::new_v4(), sanitize(filename)));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(path)
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "stored file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Final path component only, with separators neutralised
fn sanitize(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    base.replace(['/', '\\'], "_")
}
