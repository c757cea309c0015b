//! File-backed credential persistence
//!
//! [`FileTokenStorage`] keeps the current [`Credential`] as a JSON document
//! so a restarted process can resume without a new authorization. The file
//! holds live secrets; callers choose a location only the user can read.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stellar_common::auth::{Credential, TokenStorage};
use tracing::debug;

/// Stores one credential in a JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Storage backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<Option<Credential>, String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("Failed to read {}: {e}", self.path.display())),
        };

        let credential = serde_json::from_slice(&bytes)
            .map_err(|e| format!("Corrupt credential file {}: {e}", self.path.display()))?;
        debug!(path = %self.path.display(), "Loaded stored credential");
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| format!("Failed to serialize credential: {e}"))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", self.path.display()))?;
        debug!(path = %self.path.display(), "Stored credential");
        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove {}: {e}", self.path.display())),
        }
    }
}
