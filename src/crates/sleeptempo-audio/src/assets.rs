//! Asset providers: where encoded sound bytes come from
//!
//! The engine never cares how bytes are obtained. Hosts hand the bank any
//! [`AssetSource`]; this module ships a directory-backed one for the CLI and an
//! in-memory one for tests and embedded assets.

use crate::{AudioError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Supplies raw encoded bytes by relative path (e.g. `"sounds/snap.ogg"`)
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch an asset. A missing asset is [`AudioError::AssetNotFound`].
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "assets".to_string()
    }
}

/// Assets read from a directory on disk
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirAssets { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` under the root, refusing absolute paths and `..`
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AudioError::AssetError(format!(
                "asset path must stay inside {}: {}",
                self.root.display(),
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSource for DirAssets {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AudioError::AssetNotFound(path.to_string()))
            }
            Err(e) => Err(AudioError::AssetError(format!("{}: {}", full.display(), e))),
        }
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Assets held in memory
#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, builder style
    pub fn with(self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl AssetSource for MemoryAssets {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| AudioError::AssetNotFound(path.to_string()))
    }

    fn describe(&self) -> String {
        format!("{} in-memory assets", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_assets() {
        let assets = MemoryAssets::new().with("sounds/snap.wav", vec![1u8, 2, 3]);
        assert_eq!(assets.fetch("sounds/snap.wav").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            assets.fetch("sounds/missing.wav").await,
            Err(AudioError::AssetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dir_assets_reads_files() {
        let root = std::env::temp_dir().join(format!("sleeptempo-assets-{}", std::process::id()));
        std::fs::create_dir_all(root.join("voice")).unwrap();
        std::fs::write(root.join("voice/counts.json"), b"{}").unwrap();

        let assets = DirAssets::new(&root);
        assert_eq!(assets.fetch("voice/counts.json").await.unwrap(), b"{}".to_vec());
        assert!(matches!(
            assets.fetch("voice/counts.ogg").await,
            Err(AudioError::AssetNotFound(_))
        ));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_dir_assets_refuses_escapes() {
        let assets = DirAssets::new("/tmp");
        assert!(matches!(
            assets.fetch("../etc/passwd").await,
            Err(AudioError::AssetError(_))
        ));
        assert!(matches!(
            assets.fetch("/etc/passwd").await,
            Err(AudioError::AssetError(_))
        ));
    }
}
