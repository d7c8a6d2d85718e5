//! Partial-failure policy: raw batches are best-effort, the summary is
//! fail-loud, and the upload always lands in a terminal state.

use std::sync::Mutex;

use radprod_core::{IngestPipeline, PipelineOptions};
use radprod_ingest::{Sheet, Workbook};
use radprod_model::{
    ConsolidatedStat, EntityCategory, NameMapping, NewSlaRule, ProductionEvent, SlaRule, StatKey,
    StatMeasures, Upload, UploadStatus,
};
use radprod_store::{MemoryStore, Result, Store, StoreError};

/// Store double that fails selected raw-row batches and, optionally, every
/// consolidated-stat upsert. Everything else delegates to a MemoryStore.
struct FlakyStore {
    inner: MemoryStore,
    fail_batches: Mutex<Vec<usize>>,
    batch_counter: Mutex<usize>,
    fail_stat_upserts: bool,
}

impl FlakyStore {
    fn failing_batches(batches: &[usize]) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_batches: Mutex::new(batches.to_vec()),
            batch_counter: Mutex::new(0),
            fail_stat_upserts: false,
        }
    }

    fn failing_stats() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_batches: Mutex::new(Vec::new()),
            batch_counter: Mutex::new(0),
            fail_stat_upserts: true,
        }
    }
}

impl Store for FlakyStore {
    fn insert_production_events(&self, upload_id: u64, batch: &[ProductionEvent]) -> Result<()> {
        let index = {
            let mut counter = self.batch_counter.lock().unwrap();
            let current = *counter;
            *counter += 1;
            current
        };
        if self.fail_batches.lock().unwrap().contains(&index) {
            return Err(StoreError::Backend(format!("injected batch {index} failure")));
        }
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
        if self.fail_stat_upserts {
            return Err(StoreError::Backend("injected stat failure".to_string()));
        }
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

fn three_row_workbook() -> Workbook {
    let headers = [
        "ACCESSION",
        "MODALITY",
        "PATIENT TYPE",
        "INSTITUTION",
        "VALIDATED BY",
        "ASSIGNED AT",
        "VALIDATED AT",
    ];
    let mut sheet = Sheet::new(
        "PRODUCTION",
        headers.iter().map(|h| (*h).to_string()).collect(),
    );
    for row_number in 1..=3 {
        sheet.rows.push(vec![
            format!("ACC-{row_number}"),
            "CT".to_string(),
            "U".to_string(),
            "HOSP_A".to_string(),
            "DR SMITH".to_string(),
            "2026-03-14 08:00:00".to_string(),
            "2026-03-14 09:30:00".to_string(),
        ]);
    }
    Workbook::new("flaky-test").with_sheet(sheet)
}

fn one_row_per_batch() -> PipelineOptions {
    PipelineOptions {
        batch_size: 1,
        cancel: None,
    }
}

#[test]
fn failed_middle_batch_keeps_earlier_batches_and_marks_error() {
    let store = FlakyStore::failing_batches(&[1]);
    let report = IngestPipeline::new(&store)
        .with_options(one_row_per_batch())
        .run(&three_row_workbook(), "export.xlsx")
        .unwrap();

    assert_eq!(report.status, UploadStatus::Error);
    assert_eq!(report.failed_batches, 1);
    // Batches 0 and 2 committed; the run continued past the failure.
    assert_eq!(report.persisted_rows, 2);
    // Summary is not published for an incomplete upload.
    assert_eq!(report.stat_groups_written, 0);
    assert!(store.list_consolidated_stats().unwrap().is_empty());

    let upload = store.get_upload(report.upload_id).unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Error);
    assert!(upload.message.unwrap().contains("batches failed"));
}

#[test]
fn aggregation_failure_marks_error_after_raw_rows_persisted() {
    let store = FlakyStore::failing_stats();
    let report = IngestPipeline::new(&store)
        .with_options(one_row_per_batch())
        .run(&three_row_workbook(), "export.xlsx")
        .unwrap();

    assert_eq!(report.status, UploadStatus::Error);
    // Raw rows and discovery are durable even though the summary failed.
    assert_eq!(report.persisted_rows, 3);
    assert_eq!(report.institutions_discovered, 1);
    assert!(
        store
            .get_upload(report.upload_id)
            .unwrap()
            .unwrap()
            .message
            .unwrap()
            .contains("summary upsert failed")
    );
}

#[test]
fn entity_and_sla_discovery_survive_a_failed_run() {
    let store = FlakyStore::failing_batches(&[0, 1, 2]);
    let report = IngestPipeline::new(&store)
        .with_options(one_row_per_batch())
        .run(&three_row_workbook(), "export.xlsx")
        .unwrap();

    assert_eq!(report.status, UploadStatus::Error);
    assert_eq!(report.persisted_rows, 0);
    // Discovery ran before the batches and is intentionally retained.
    assert_eq!(
        store
            .list_name_mappings(EntityCategory::Institution)
            .unwrap()
            .len(),
        1
    );
    assert!(!store.list_sla_rules(Some("HOSP_A")).unwrap().is_empty());
}
