//! In-memory store backend.
//!
//! Uniqueness constraints are modeled by keyed maps mutated under a single
//! write lock, so upsert-if-absent is atomic and concurrent first-sight of
//! the same raw name cannot duplicate rows.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use radprod_model::{
    ConsolidatedStat, EntityCategory, NameMapping, NewSlaRule, ProductionEvent, SlaRule, StatKey,
    StatMeasures, Upload, UploadStatus,
};

use crate::error::{Result, StoreError};
use crate::store::Store;

type MappingKey = (EntityCategory, String);
type RuleKey = (Option<String>, String, String);

/// Serializable snapshot of the whole store, shared with `JsonStore`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreState {
    pub mappings: Vec<NameMapping>,
    pub rules: Vec<SlaRule>,
    pub stats: Vec<ConsolidatedStat>,
    pub uploads: Vec<Upload>,
    pub events: BTreeMap<u64, Vec<ProductionEvent>>,
    pub next_rule_id: u64,
    pub next_upload_id: u64,
}

#[derive(Debug, Default)]
struct Inner {
    mappings: BTreeMap<MappingKey, NameMapping>,
    rules: BTreeMap<RuleKey, SlaRule>,
    stats: BTreeMap<StatKey, StatMeasures>,
    uploads: BTreeMap<u64, Upload>,
    events: BTreeMap<u64, Vec<ProductionEvent>>,
    next_rule_id: u64,
    next_upload_id: u64,
}

/// In-memory reference backend, also the working state of `JsonStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot.
    pub fn from_state(state: StoreState) -> Self {
        let mut inner = Inner {
            next_rule_id: state.next_rule_id,
            next_upload_id: state.next_upload_id,
            events: state.events,
            ..Inner::default()
        };
        for mapping in state.mappings {
            inner
                .mappings
                .insert((mapping.category, mapping.raw_name.clone()), mapping);
        }
        for rule in state.rules {
            inner.rules.insert(
                (
                    rule.institution.clone(),
                    rule.modality.clone(),
                    rule.patient_type.clone(),
                ),
                rule,
            );
        }
        for stat in state.stats {
            inner.stats.insert(stat.key, stat.measures);
        }
        for upload in state.uploads {
            inner.uploads.insert(upload.id, upload);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Capture a snapshot for serialization.
    pub fn snapshot(&self) -> StoreState {
        let inner = self.read();
        StoreState {
            mappings: inner.mappings.values().cloned().collect(),
            rules: inner.rules.values().cloned().collect(),
            stats: inner
                .stats
                .iter()
                .map(|(key, measures)| ConsolidatedStat {
                    key: key.clone(),
                    measures: measures.clone(),
                })
                .collect(),
            uploads: inner.uploads.values().cloned().collect(),
            events: inner.events.clone(),
            next_rule_id: inner.next_rule_id,
            next_upload_id: inner.next_upload_id,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for MemoryStore {
    fn insert_production_events(&self, upload_id: u64, batch: &[ProductionEvent]) -> Result<()> {
        let mut inner = self.write();
        if !inner.uploads.contains_key(&upload_id) {
            return Err(StoreError::UploadNotFound { id: upload_id });
        }
        inner
            .events
            .entry(upload_id)
            .or_default()
            .extend_from_slice(batch);
        Ok(())
    }

    fn upsert_name_mapping_if_absent(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<NameMapping> {
        let mut inner = self.write();
        let key = (category, raw_name.to_string());
        let mapping = inner.mappings.entry(key).or_insert_with(|| {
            NameMapping::discovered(category, raw_name, Utc::now().naive_utc())
        });
        Ok(mapping.clone())
    }

    fn get_name_mapping(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<Option<NameMapping>> {
        let inner = self.read();
        Ok(inner
            .mappings
            .get(&(category, raw_name.to_string()))
            .cloned())
    }

    fn set_formal_name(
        &self,
        category: EntityCategory,
        raw_name: &str,
        formal_name: &str,
    ) -> Result<NameMapping> {
        let mut inner = self.write();
        let key = (category, raw_name.to_string());
        let mapping = inner.mappings.entry(key).or_insert_with(|| {
            NameMapping::discovered(category, raw_name, Utc::now().naive_utc())
        });
        mapping.formal_name = formal_name.to_string();
        mapping.operator_edited = true;
        Ok(mapping.clone())
    }

    fn list_name_mappings(&self, category: EntityCategory) -> Result<Vec<NameMapping>> {
        let inner = self.read();
        Ok(inner
            .mappings
            .values()
            .filter(|mapping| mapping.category == category)
            .cloned()
            .collect())
    }

    fn list_sla_rules(&self, institution: Option<&str>) -> Result<Vec<SlaRule>> {
        let inner = self.read();
        Ok(inner
            .rules
            .values()
            .filter(|rule| match institution {
                Some(name) => rule.institution.as_deref() == Some(name),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn upsert_sla_rule(&self, rule: NewSlaRule) -> Result<SlaRule> {
        let mut inner = self.write();
        let key = (
            rule.institution.clone(),
            rule.modality.clone(),
            rule.patient_type.clone(),
        );
        if let Some(existing) = inner.rules.get_mut(&key) {
            existing.target_minutes = rule.target_minutes;
            return Ok(existing.clone());
        }
        inner.next_rule_id += 1;
        let stored = SlaRule {
            id: inner.next_rule_id,
            institution: rule.institution,
            modality: rule.modality,
            patient_type: rule.patient_type,
            target_minutes: rule.target_minutes,
        };
        inner.rules.insert(key, stored.clone());
        Ok(stored)
    }

    fn delete_sla_rule(&self, id: u64) -> Result<()> {
        let mut inner = self.write();
        let key = inner
            .rules
            .iter()
            .find(|(_, rule)| rule.id == id)
            .map(|(key, _)| key.clone());
        match key {
            Some(key) => {
                inner.rules.remove(&key);
                Ok(())
            }
            None => Err(StoreError::RuleNotFound { id }),
        }
    }

    fn upsert_consolidated_stat(&self, key: &StatKey, measures: &StatMeasures) -> Result<()> {
        let mut inner = self.write();
        inner.stats.insert(key.clone(), measures.clone());
        Ok(())
    }

    fn list_consolidated_stats(&self) -> Result<Vec<ConsolidatedStat>> {
        let inner = self.read();
        Ok(inner
            .stats
            .iter()
            .map(|(key, measures)| ConsolidatedStat {
                key: key.clone(),
                measures: measures.clone(),
            })
            .collect())
    }

    fn create_upload(&self, filename: &str, total_rows: u64) -> Result<Upload> {
        let mut inner = self.write();
        inner.next_upload_id += 1;
        let upload = Upload {
            id: inner.next_upload_id,
            filename: filename.to_string(),
            total_rows,
            status: UploadStatus::Processing,
            message: None,
            started_at: Utc::now().naive_utc(),
            finished_at: None,
        };
        inner.uploads.insert(upload.id, upload.clone());
        Ok(upload)
    }

    fn set_upload_status(
        &self,
        id: u64,
        status: UploadStatus,
        message: Option<String>,
    ) -> Result<()> {
        let mut inner = self.write();
        let upload = inner
            .uploads
            .get_mut(&id)
            .ok_or(StoreError::UploadNotFound { id })?;
        if upload.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id,
                status: upload.status.as_str().to_string(),
            });
        }
        upload.status = status;
        upload.message = message;
        if status.is_terminal() {
            upload.finished_at = Some(Utc::now().naive_utc());
        }
        Ok(())
    }

    fn get_upload(&self, id: u64) -> Result<Option<Upload>> {
        let inner = self.read();
        Ok(inner.uploads.get(&id).cloned())
    }

    fn list_uploads(&self) -> Result<Vec<Upload>> {
        let inner = self.read();
        Ok(inner.uploads.values().rev().cloned().collect())
    }
}
