//! Backup store on a local directory (backup volume or mounted bucket)

use super::BackupStore;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Backups stored as files below `root`
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path below the root, refusing anything that could escape it
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && key
                .split('/')
                .all(|segment| !matches!(segment, "" | "." | ".."))
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !clean {
            return Err(AppError::Storage(format!("refusing unsafe key {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    /// Remove directories left empty by a deletion, stopping at the root
    async fn prune_empty_parents(&self, file: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // remove_dir fails on non-empty directories, which ends the walk
            if tokio::fs::remove_dir(current).await.is_err() {
                break;
            }
            debug!(dir = %current.display(), "Removed empty backup directory");
            dir = current.parent();
        }
    }
}

/// Collect every regular file below `root` as a `/`-joined relative key.
///
/// Only an unreadable root fails the listing. Entries that cannot be read, and
/// names that are not valid UTF-8, are logged and left out.
fn walk_keys(root: &Path) -> Result<Vec<String>> {
    std::fs::read_dir(root)?;

    let mut keys = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).display().to_string();
                warn!(path = %path, error = %err, "Skipping unreadable backup entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect();
        match segments {
            Some(segments) => keys.push(segments.join("/")),
            None => warn!(
                path = %entry.path().display(),
                "Skipping backup entry with a non UTF-8 name"
            ),
        }
    }

    keys.sort();
    Ok(keys)
}

#[async_trait]
impl BackupStore for FsStore {
    async fn list(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk_keys(&root))
            .await
            .map_err(|e| AppError::Storage(format!("Listing task failed: {}", e)))?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {}: {}", key, e)))?;
        self.prune_empty_parents(&path).await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("fs:{}", self.root.display())
    }
}
