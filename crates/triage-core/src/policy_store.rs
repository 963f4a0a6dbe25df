use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::scheduler::QTable;
use crate::traits::PolicyStore;

/// Stores the Q-table as pretty-printed JSON on the local filesystem.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-save never leaves a truncated table behind.
#[derive(Debug, Clone)]
pub struct JsonFilePolicyStore {
    path: PathBuf,
}

impl JsonFilePolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "q_table.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PolicyStore for JsonFilePolicyStore {
    fn load(&self) -> Result<Option<QTable>, AppError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::PolicyStoreError(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str::<QTable>(&raw) {
            Ok(table) => {
                tracing::info!(path = %self.path.display(), states = table.len(), "Loaded policy");
                Ok(Some(table))
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable policy file"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, table: &QTable) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::PolicyStoreError(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(table)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| {
            AppError::PolicyStoreError(format!("failed to write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::PolicyStoreError(format!(
                "failed to move policy into {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), states = table.len(), "Saved policy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulingAction;

    fn sample_table() -> QTable {
        let mut table = QTable::new();
        table
            .entry("low_9_1_0_morning".to_string())
            .or_default()
            .insert(SchedulingAction::Delay30, 1.25);
        table
            .entry("low_5_3_1_evening".to_string())
            .or_default()
            .insert(SchedulingAction::Immediate, -0.5);
        table
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePolicyStore::new(dir.path().join("q_table.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePolicyStore::new(dir.path().join("nested/q_table.json"));

        store.save(&sample_table()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_table()));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFilePolicyStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_saved_file_is_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.json");
        JsonFilePolicyStore::new(&path).save(&sample_table()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["low_9_1_0_morning"]["delay_30"], 1.25);
    }
}
