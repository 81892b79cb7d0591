//! Session record store
//!
//! Writes each session's [`SessionRecord`] as pretty JSON to
//! `<dir>/session_<name>_metadata.json`. Saving again overwrites the previous file.

use crate::error::StorageError;
use crate::record::SessionRecord;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct SessionRecordStore {
    dir: PathBuf,
}

impl SessionRecordStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic location for a session name.
    pub fn record_path(&self, session_name: &str) -> PathBuf {
        self.dir
            .join(format!("session_{}_metadata.json", file_safe(session_name)))
    }

    /// Persist `record`, returning where it was written.
    ///
    /// Writes to a temporary sibling first and renames it into place. The sibling is
    /// removed whenever either step fails.
    pub async fn save(&self, record: &SessionRecord) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Write {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.record_path(&record.session_name);
        let temp_path = path.with_extension("json.tmp");
        let serialized = serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::InvalidData(format!("Failed to serialize record: {}", e)))?;

        if let Err(source) = fs::write(&temp_path, &serialized).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Write {
                path: temp_path,
                source,
            });
        }
        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Write { path, source });
        }

        info!(
            session = %record.session_name,
            path = %path.display(),
            generated = record.generated.len(),
            failed = record.failed.len(),
            "Session record saved"
        );
        Ok(path)
    }

    pub fn load(&self, session_name: &str) -> Result<SessionRecord, StorageError> {
        Self::load_from(&self.record_path(session_name))
    }

    pub fn load_from(path: &Path) -> Result<SessionRecord, StorageError> {
        let raw = std::fs::read(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::InvalidData(format!("{}: {}", path.display(), e)))
    }
}

/// Replace characters that would escape or break a file name.
fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
