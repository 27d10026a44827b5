use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use walkdir::WalkDir;

use super::Backend;
use crate::error::{Error, Result};
use crate::join::{SEPARATOR, join};

pub struct LocalBackend {
    root: String,
}

impl LocalBackend {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, name: &str) -> PathBuf {
        PathBuf::from(join(&self.root, name))
    }

    fn root_dir(&self) -> PathBuf {
        if self.root.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.root)
        }
    }
}

fn io_error(op: &'static str, path: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::backend(op, path.display().to_string(), err)
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(Error::ParentNotDirectory(dir.to_path_buf())),
    }
}

fn walk_files(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let missing_root = e.depth() == 0
                && e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound);
            if missing_root {
                Error::NotFound(root.display().to_string())
            } else {
                Error::backend("list", root.display().to_string(), e)
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl Backend for LocalBackend {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let full = self.full_path(name);
        debug!(path = %full.display(), "read");
        tokio::fs::read(&full)
            .await
            .map_err(|e| io_error("read", &full, e))
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let full = self.full_path(name);
        debug!(path = %full.display(), bytes = data.len(), "write");
        ensure_parent_dir(&full).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o640);

        let mut file = options
            .open(&full)
            .await
            .map_err(|e| Error::backend("write", full.display().to_string(), e))?;
        file.write_all(data)
            .await
            .map_err(|e| Error::backend("write", full.display().to_string(), e))?;
        file.flush()
            .await
            .map_err(|e| Error::backend("write", full.display().to_string(), e))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full = self.full_path(name);
        debug!(path = %full.display(), "delete");
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| io_error("delete", &full, e))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let root = self.root_dir();
        debug!(path = %root.display(), "list");
        tokio::task::spawn_blocking(move || walk_files(&root))
            .await
            .map_err(|e| Error::backend("list", self.root.clone(), e))?
    }
}
