//! Backing stores for the routine catalog.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CatalogError;

/// Trait for anything that can hand out the raw catalog JSON.
///
/// The catalog is re-read on every call; implementations must not cache.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Read the full catalog document.
    async fn read(&self) -> Result<Bytes, CatalogError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Catalog stored as a JSON file on the local filesystem.
///
/// # Example
///
/// ```ignore
/// use routine_portal::catalog::{Catalog, FileCatalogSource};
///
/// let source = FileCatalogSource::new("storage/routines/routine_db.json");
/// let catalog = Catalog::load(&source).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn read(&self) -> Result<Bytes, CatalogError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CatalogError::Read(format!("{}: {}", self.path.display(), e)))?;
        Ok(Bytes::from(data))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
