use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use objectstore::StoreConfig;

const CONFIG_FILE: &str = "objectstore.toml";

pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("objectstore")
        .join(CONFIG_FILE)
}

/// An explicit path must exist; the default one is optional.
pub fn load(explicit: Option<&Path>) -> Result<StoreConfig> {
    match explicit {
        Some(path) => read(path),
        None => {
            let path = default_path();
            if path.is_file() {
                read(&path)
            } else {
                Ok(StoreConfig::default())
            }
        }
    }
}

fn read(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("config not found at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loading config");
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(
            &path,
            "[s3]\nregion = \"eu-central-1\"\npath_style = true\n\n[http]\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.s3.region.as_deref(), Some("eu-central-1"));
        assert!(config.s3.path_style);
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.blob.account_key.is_none());
    }

    #[test]
    fn missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config not found"));
    }

    #[test]
    fn malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[s3\nregion = ").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn default_path_location() {
        let path = default_path();
        assert!(path.ends_with("objectstore/objectstore.toml"));
    }
}
