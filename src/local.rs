//! Local payload store: one JSON blob at a fixed path.
//!
//! Used only as the fallback data source when the remote load fails and as
//! the input to the migration engine. No schema is imposed here.

use std::path::PathBuf;

use serde_json::Value;

#[derive(Debug)]
pub enum LocalStoreError {
    ReadError(PathBuf, std::io::Error),
    WriteError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for LocalStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalStoreError::ReadError(path, e) => {
                write!(f, "Failed to read local store '{}': {}", path.display(), e)
            }
            LocalStoreError::WriteError(path, e) => {
                write!(f, "Failed to write local store '{}': {}", path.display(), e)
            }
            LocalStoreError::ParseError(path, e) => {
                write!(f, "Failed to parse local store '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for LocalStoreError {}

/// Get/set of one JSON payload on disk.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Last-known payload, or `None` if nothing was ever saved.
    pub fn load(&self) -> Result<Option<Value>, LocalStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| LocalStoreError::ReadError(self.path.clone(), e))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| LocalStoreError::ParseError(self.path.clone(), e))
    }

    /// Replace the stored payload, creating parent directories as needed.
    pub fn save(&self, payload: &Value) -> Result<(), LocalStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LocalStoreError::WriteError(self.path.clone(), e))?;
        }
        let contents = serde_json::to_string_pretty(payload)
            .map_err(|e| LocalStoreError::ParseError(self.path.clone(), e))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| LocalStoreError::WriteError(self.path.clone(), e))
    }
}
