//! Storage-root-scoped file resolution.

use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tracing::{debug, warn};

use super::{content_type_for, FileKind};
use crate::codec::decode_token;
use crate::error::ResolveError;

/// A routine file that passed every resolution check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Canonical absolute path, guaranteed to lie under the storage root
    pub path: PathBuf,

    /// The relative path the token decoded to
    pub relative: String,

    /// Requested kind
    pub kind: FileKind,

    /// File size in bytes at resolution time
    pub size: u64,
}

impl ResolvedFile {
    /// Base name of the requested file, used for download dispositions.
    pub fn file_name(&self) -> &str {
        Path::new(&self.relative)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
    }

    /// Content type derived from the requested file's extension.
    pub fn content_type(&self) -> &'static str {
        content_type_for(Path::new(&self.relative))
    }

    /// Open the file for streaming.
    pub async fn open(&self) -> Result<File, ResolveError> {
        File::open(&self.path).await.map_err(|e| {
            ResolveError::Io(format!("failed to open {}: {}", self.relative, e))
        })
    }
}

/// Read-only view of the routine file tree.
///
/// Every path handed out by the store is checked to lie inside `root`:
///
/// 1. The decoded path must not be absolute, and its `..` segments must never
///    climb above the root (checked lexically, before touching the disk).
/// 2. Something must exist at `root/relative`, and it must be a regular file.
/// 3. The canonical form of that file must start with the canonical form of
///    `root`. This catches symlinks pointing out of the tree.
#[derive(Debug, Clone)]
pub struct RoutineStore {
    root: PathBuf,
}

impl RoutineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the storage root as configured.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a requested kind and token to a validated file.
    ///
    /// The token is decoded first, then the kind is checked, then the decoded
    /// path goes through [`resolve_path`](Self::resolve_path).
    pub async fn resolve(&self, kind: &str, token: &str) -> Result<ResolvedFile, ResolveError> {
        let relative = decode_token(token).ok_or(ResolveError::InvalidReference)?;
        let kind: FileKind = kind.parse()?;

        self.resolve_path(kind, &relative).await
    }

    /// Resolve a raw relative path against the storage root.
    pub async fn resolve_path(
        &self,
        kind: FileKind,
        relative: &str,
    ) -> Result<ResolvedFile, ResolveError> {
        if !is_lexically_contained(Path::new(relative)) {
            warn!(path = relative, "Rejected path escaping the storage root");
            return Err(ResolveError::AccessDenied);
        }

        let candidate = self.root.join(relative);

        let metadata = match tokio::fs::metadata(&candidate).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = relative, error = %e, "File lookup failed");
                return Err(ResolveError::NotFound(relative.to_string()));
            }
        };
        if !metadata.is_file() {
            return Err(ResolveError::NotFound(relative.to_string()));
        }

        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            ResolveError::Io(format!(
                "storage root {} is unavailable: {}",
                self.root.display(),
                e
            ))
        })?;
        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|e| ResolveError::Io(format!("failed to resolve {}: {}", relative, e)))?;

        if !canonical.starts_with(&root) {
            warn!(
                path = relative,
                resolved = %canonical.display(),
                "Rejected path resolving outside the storage root"
            );
            return Err(ResolveError::AccessDenied);
        }

        Ok(ResolvedFile {
            path: canonical,
            relative: relative.to_string(),
            kind,
            size: metadata.len(),
        })
    }
}

/// Check that a relative path never leaves its base directory.
fn is_lexically_contained(path: &Path) -> bool {
    let mut depth: usize = 0;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return false,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
        }
    }

    true
}

// =============================================================================
// Tests
// =============================================================================
