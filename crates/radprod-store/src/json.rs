//! JSON-file-backed store used by the CLI.
//!
//! The whole store state is one serde snapshot in `state.json` under a data
//! directory. Writes go to a temp file first and are renamed into place, so
//! an interrupted flush never leaves a torn state file.

use std::path::{Path, PathBuf};

use tracing::debug;

use radprod_model::{
    ConsolidatedStat, EntityCategory, NameMapping, NewSlaRule, ProductionEvent, SlaRule, StatKey,
    StatMeasures, Upload, UploadStatus,
};

use crate::error::{Result, StoreError};
use crate::memory::{MemoryStore, StoreState};
use crate::store::Store;

const STATE_FILE: &str = "state.json";

/// File-backed store: a `MemoryStore` working copy plus an explicit
/// `flush()` that persists the snapshot.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// Open (or initialize) a store under the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::StateIo {
            path: data_dir.to_path_buf(),
            source: e,
        })?;
        let path = data_dir.join(STATE_FILE);
        let inner = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| StoreError::StateIo {
                path: path.clone(),
                source: e,
            })?;
            let state: StoreState =
                serde_json::from_str(&contents).map_err(|e| StoreError::StateParse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            debug!(path = %path.display(), "loaded store state");
            MemoryStore::from_state(state)
        } else {
            MemoryStore::new()
        };
        Ok(Self { path, inner })
    }

    /// Persist the current snapshot. Write-to-temp then rename.
    pub fn flush(&self) -> Result<()> {
        let state = self.inner.snapshot();
        let contents =
            serde_json::to_string_pretty(&state).map_err(|e| StoreError::StateParse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| StoreError::StateIo {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::StateIo {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(path = %self.path.display(), "flushed store state");
        Ok(())
    }

    pub fn state_path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonStore {
    fn insert_production_events(&self, upload_id: u64, batch: &[ProductionEvent]) -> Result<()> {
        self.inner.insert_production_events(upload_id, batch)
    }

    fn upsert_name_mapping_if_absent(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<NameMapping> {
        self.inner.upsert_name_mapping_if_absent(category, raw_name)
    }

    fn get_name_mapping(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<Option<NameMapping>> {
        self.inner.get_name_mapping(category, raw_name)
    }

    fn set_formal_name(
        &self,
        category: EntityCategory,
        raw_name: &str,
        formal_name: &str,
    ) -> Result<NameMapping> {
        self.inner.set_formal_name(category, raw_name, formal_name)
    }

    fn list_name_mappings(&self, category: EntityCategory) -> Result<Vec<NameMapping>> {
        self.inner.list_name_mappings(category)
    }

    fn list_sla_rules(&self, institution: Option<&str>) -> Result<Vec<SlaRule>> {
        self.inner.list_sla_rules(institution)
    }

    fn upsert_sla_rule(&self, rule: NewSlaRule) -> Result<SlaRule> {
        self.inner.upsert_sla_rule(rule)
    }

    fn delete_sla_rule(&self, id: u64) -> Result<()> {
        self.inner.delete_sla_rule(id)
    }

    fn upsert_consolidated_stat(&self, key: &StatKey, measures: &StatMeasures) -> Result<()> {
        self.inner.upsert_consolidated_stat(key, measures)
    }

    fn list_consolidated_stats(&self) -> Result<Vec<ConsolidatedStat>> {
        self.inner.list_consolidated_stats()
    }

    fn create_upload(&self, filename: &str, total_rows: u64) -> Result<Upload> {
        self.inner.create_upload(filename, total_rows)
    }

    fn set_upload_status(
        &self,
        id: u64,
        status: UploadStatus,
        message: Option<String>,
    ) -> Result<()> {
        self.inner.set_upload_status(id, status, message)
    }

    fn get_upload(&self, id: u64) -> Result<Option<Upload>> {
        self.inner.get_upload(id)
    }

    fn list_uploads(&self) -> Result<Vec<Upload>> {
        self.inner.list_uploads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn state_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();

        let store = JsonStore::open(dir.path()).unwrap();
        store
            .upsert_name_mapping_if_absent(EntityCategory::Institution, "HOSP_A")
            .unwrap();
        store
            .upsert_sla_rule(NewSlaRule::global("CT", "U", 120))
            .unwrap();
        let upload = store.create_upload("export", 1).unwrap();
        store
            .set_upload_status(upload.id, UploadStatus::Completed, None)
            .unwrap();
        store.flush().unwrap();

        let reopened = JsonStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened
                .list_name_mappings(EntityCategory::Institution)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(reopened.list_sla_rules(None).unwrap().len(), 1);
        let stored = reopened.get_upload(upload.id).unwrap().unwrap();
        assert_eq!(stored.status, UploadStatus::Completed);

        // Id sequences continue after reload instead of reusing ids.
        let next = reopened.create_upload("second", 0).unwrap();
        assert_eq!(next.id, upload.id + 1);
    }

    #[test]
    fn corrupt_state_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("state.json"), "{ not json").unwrap();
        let result = JsonStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::StateParse { .. })));
    }
}
