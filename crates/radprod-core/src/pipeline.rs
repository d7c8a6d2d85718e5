//! The upload coordinator: one ingestion run from workbook to summary.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{error, info, info_span, warn};

use radprod_ingest::{
    IngestError, NormalizedBatch, SheetSelection, Workbook, load_workbook_dir, normalize,
};
use radprod_model::{EntityCategory, UploadStatus};
use radprod_store::{Store, StoreError};

use crate::aggregate::{aggregate, persist_stats};
use crate::resolve::EntityResolver;
use crate::sla::SlaResolver;

/// Default raw-row batch size.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors fatal to an ingestion run.
///
/// Parsing errors abort before any persistence. Store errors during the run
/// are recorded on the upload's terminal status instead of being returned,
/// except when the upload row itself cannot be created or finalized.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tuning knobs for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Raw-row batch size; 0 falls back to `DEFAULT_BATCH_SIZE`.
    pub batch_size: usize,
    /// Cooperative cancellation, checked between batches (never mid-batch,
    /// so partial-commit semantics stay predictable).
    pub cancel: Option<Arc<AtomicBool>>,
}

impl PipelineOptions {
    fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            self.batch_size
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Outcome summary of one run, for logs and the CLI.
#[derive(Debug)]
pub struct IngestReport {
    pub upload_id: u64,
    pub status: UploadStatus,
    pub message: Option<String>,
    pub total_rows: usize,
    pub normalized: usize,
    pub persisted_rows: usize,
    pub failed_batches: usize,
    pub skipped_unvalidated: usize,
    pub missing_identifiers: usize,
    pub institutions_discovered: usize,
    pub physicians_discovered: usize,
    pub sla_rules_seeded: usize,
    pub stat_groups_written: usize,
    pub sheet_fallback: bool,
}

/// Orchestrates normalize, discovery, raw persistence, and aggregation for
/// one upload, tracking lifecycle state and the partial-failure policy.
pub struct IngestPipeline<'a, S: Store + ?Sized> {
    store: &'a S,
    options: PipelineOptions,
}

impl<'a, S: Store + ?Sized> IngestPipeline<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one ingestion. Best-effort on raw rows, fail-loud on the
    /// summary: raw batches committed before a failure stay committed, but
    /// any batch or aggregation failure marks the whole upload `Error` so
    /// downstream consumers never assume completeness.
    pub fn run(&self, workbook: &Workbook, filename: &str) -> Result<IngestReport, PipelineError> {
        // Stage 1: normalize. Pure; a malformed workbook would have failed
        // during loading, before any persistence.
        let batch = normalize(workbook);
        let missing_identifiers = batch.missing_identifiers();
        if missing_identifiers > 0 {
            warn!(
                count = missing_identifiers,
                "records without accession or report id; aggregated but low-confidence"
            );
        }

        // Stage 2: the upload row, visible to readers immediately.
        let upload = self
            .store
            .create_upload(filename, batch.events.len() as u64)?;
        let span = info_span!("upload", id = upload.id, filename = %filename);
        let _guard = span.enter();
        info!(
            rows = batch.events.len(),
            fallback = batch.selection == SheetSelection::FallbackAll,
            "ingestion started"
        );

        // Stages 3-6 record failures on the upload instead of bubbling out.
        let report = self.run_stages(&batch, upload.id, missing_identifiers);

        // Stage 7: single terminal transition.
        self.store
            .set_upload_status(upload.id, report.status, report.message.clone())?;
        info!(status = %report.status, groups = report.stat_groups_written, "ingestion finished");
        Ok(report)
    }

    /// Load a workbook directory and run it through [`Self::run`].
    pub fn run_dir(&self, dir: &Path, filename: &str) -> Result<IngestReport, PipelineError> {
        let workbook = load_workbook_dir(dir)?;
        info!(
            sheets = workbook.sheets.len(),
            rows = workbook.total_rows(),
            source = %workbook.source_id,
            "workbook loaded"
        );
        self.run(&workbook, filename)
    }

    fn run_stages(
        &self,
        batch: &NormalizedBatch,
        upload_id: u64,
        missing_identifiers: usize,
    ) -> IngestReport {
        let mut report = IngestReport {
            upload_id,
            status: UploadStatus::Completed,
            message: None,
            total_rows: batch.events.len(),
            normalized: batch.events.len(),
            persisted_rows: 0,
            failed_batches: 0,
            skipped_unvalidated: 0,
            missing_identifiers,
            institutions_discovered: 0,
            physicians_discovered: 0,
            sla_rules_seeded: 0,
            stat_groups_written: 0,
            sheet_fallback: batch.selection == SheetSelection::FallbackAll,
        };

        // Stage 3: entity discovery, explicit and idempotent.
        let institutions: BTreeSet<String> = batch
            .events
            .iter()
            .map(|event| event.institution_raw.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let physicians: BTreeSet<String> = batch
            .events
            .iter()
            .flat_map(|event| {
                [
                    event.physician_assigned_raw.trim(),
                    event.physician_reported_raw.trim(),
                    event.physician_validated_raw.trim(),
                ]
            })
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let resolver = EntityResolver::new(self.store);
        match resolver.resolve(EntityCategory::Institution, &institutions) {
            Ok(count) => report.institutions_discovered = count,
            Err(e) => return self.fail(report, format!("entity discovery failed: {e}")),
        }
        match resolver.resolve(EntityCategory::Physician, &physicians) {
            Ok(count) => report.physicians_discovered = count,
            Err(e) => return self.fail(report, format!("entity discovery failed: {e}")),
        }

        // Stage 4: SLA baseline for institutions without any rule.
        let sla = SlaResolver::new(self.store);
        for institution in &institutions {
            match sla.seed_institution_defaults(institution) {
                Ok(count) => report.sla_rules_seeded += count,
                Err(e) => return self.fail(report, format!("SLA seeding failed: {e}")),
            }
        }

        // Stage 5: raw rows, batched, source order. Not transactional
        // across batches: a failed batch is recorded and the run moves on,
        // keeping whatever committed for the audit trail.
        let batch_size = self.options.effective_batch_size();
        for (index, chunk) in batch.events.chunks(batch_size).enumerate() {
            if self.options.cancelled() {
                return self.fail(report, "cancelled between batches".to_string());
            }
            match self.store.insert_production_events(upload_id, chunk) {
                Ok(()) => report.persisted_rows += chunk.len(),
                Err(e) => {
                    report.failed_batches += 1;
                    error!(batch = index, error = %e, "raw-row batch failed");
                }
            }
        }
        if report.failed_batches > 0 {
            return self.fail(
                report,
                "one or more raw-row batches failed; partial data retained".to_string(),
            );
        }
        if self.options.cancelled() {
            return self.fail(report, "cancelled between batches".to_string());
        }

        // Stage 6: aggregate and upsert the summary.
        let outcome = match aggregate(&batch.events, &sla) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(report, format!("aggregation failed: {e}")),
        };
        report.skipped_unvalidated = outcome.skipped_unvalidated;
        match persist_stats(&outcome, self.store) {
            Ok(written) => report.stat_groups_written = written,
            Err(e) => return self.fail(report, format!("summary upsert failed: {e}")),
        }

        report
    }

    fn fail(&self, mut report: IngestReport, message: String) -> IngestReport {
        warn!(upload = report.upload_id, %message, "upload marked error");
        report.status = UploadStatus::Error;
        report.message = Some(message);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radprod_ingest::Sheet;
    use radprod_model::NewSlaRule;
    use radprod_store::MemoryStore;

    fn workbook(rows: &[&[&str]]) -> Workbook {
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
        for row in rows {
            sheet
                .rows
                .push(row.iter().map(|c| (*c).to_string()).collect());
        }
        Workbook::new("test-export").with_sheet(sheet)
    }

    #[test]
    fn happy_path_completes_and_writes_stats() {
        let store = MemoryStore::new();
        store
            .upsert_sla_rule(NewSlaRule::global("CT", "U", 120))
            .unwrap();

        let workbook = workbook(&[&[
            "ACC-1",
            "CT",
            "U",
            "HOSP_A",
            "DR SMITH",
            "2026-03-14 08:00:00",
            "2026-03-14 09:30:00",
        ]]);
        let report = IngestPipeline::new(&store)
            .run(&workbook, "export.xlsx")
            .unwrap();

        assert_eq!(report.status, UploadStatus::Completed);
        assert_eq!(report.persisted_rows, 1);
        assert_eq!(report.institutions_discovered, 1);
        assert_eq!(report.physicians_discovered, 1);
        assert_eq!(report.stat_groups_written, 1);
        // HOSP_A had no rules, so the baseline matrix was seeded.
        assert!(report.sla_rules_seeded > 0);

        let upload = store.get_upload(report.upload_id).unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Completed);

        let stats = store.list_consolidated_stats().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].measures.mean_turnaround_minutes, 90.0);
        // The seeded HOSP_A CT/U rule (1440) outranks the global 120.
        assert_eq!(stats[0].measures.sla_compliant_count, 1);
    }

    #[test]
    fn reingesting_the_same_workbook_is_observably_idempotent() {
        let store = MemoryStore::new();
        let workbook = workbook(&[&[
            "ACC-1",
            "CT",
            "U",
            "HOSP_A",
            "DR SMITH",
            "2026-03-14 08:00:00",
            "2026-03-14 09:30:00",
        ]]);

        let pipeline = IngestPipeline::new(&store);
        pipeline.run(&workbook, "export.xlsx").unwrap();
        let first = store.list_consolidated_stats().unwrap();
        pipeline.run(&workbook, "export.xlsx").unwrap();
        let second = store.list_consolidated_stats().unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].key, second[0].key);
        assert_eq!(first[0].measures, second[0].measures);
        // Discovery found nothing new the second time.
        assert_eq!(
            store
                .list_name_mappings(EntityCategory::Institution)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn unvalidated_rows_are_persisted_but_not_aggregated() {
        let store = MemoryStore::new();
        let workbook = workbook(&[&[
            "ACC-1",
            "CT",
            "U",
            "HOSP_A",
            "DR SMITH",
            "2026-03-14 08:00:00",
            "",
        ]]);
        let report = IngestPipeline::new(&store)
            .run(&workbook, "export.xlsx")
            .unwrap();

        assert_eq!(report.status, UploadStatus::Completed);
        assert_eq!(report.persisted_rows, 1);
        assert_eq!(report.skipped_unvalidated, 1);
        assert_eq!(report.stat_groups_written, 0);
        assert!(store.list_consolidated_stats().unwrap().is_empty());
    }

    #[test]
    fn cancellation_between_batches_marks_error() {
        let store = MemoryStore::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let workbook = workbook(&[
            &["ACC-1", "CT", "U", "HOSP_A", "DR SMITH", "", ""],
            &["ACC-2", "CT", "U", "HOSP_A", "DR SMITH", "", ""],
        ]);

        let report = IngestPipeline::new(&store)
            .with_options(PipelineOptions {
                batch_size: 1,
                cancel: Some(cancel),
            })
            .run(&workbook, "export.xlsx")
            .unwrap();

        assert_eq!(report.status, UploadStatus::Error);
        assert_eq!(report.persisted_rows, 0);
        let upload = store.get_upload(report.upload_id).unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Error);
        assert!(upload.message.unwrap().contains("cancelled"));
    }
}
