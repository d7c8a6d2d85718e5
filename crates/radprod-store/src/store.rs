//! The persistence boundary consumed by the pipeline.

use radprod_model::{
    ConsolidatedStat, EntityCategory, NameMapping, NewSlaRule, ProductionEvent, SlaRule, StatKey,
    StatMeasures, Upload, UploadStatus,
};

use crate::error::Result;

/// Logical persistence operations for the consolidation pipeline.
///
/// Storage technology is an implementation detail behind this trait; the
/// pipeline only relies on the uniqueness and upsert semantics documented
/// per method. Implementations must be safe to share across threads, since
/// concurrent ingestion runs hit the same mapping and rule namespaces.
pub trait Store: Send + Sync {
    /// Persist one batch of raw production events for an upload, in source
    /// order. Batches are not transactional with each other: a later batch
    /// failing leaves earlier batches committed.
    fn insert_production_events(&self, upload_id: u64, batch: &[ProductionEvent]) -> Result<()>;

    /// Insert a mapping for (category, raw name) unless one already exists,
    /// returning the surviving row. Atomic: two concurrent calls for the
    /// same name leave exactly one row, and an operator-edited formal name
    /// is never overwritten.
    fn upsert_name_mapping_if_absent(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<NameMapping>;

    fn get_name_mapping(
        &self,
        category: EntityCategory,
        raw_name: &str,
    ) -> Result<Option<NameMapping>>;

    /// Operator edit of a formal name. Marks the row operator-edited so
    /// later auto-discovery leaves it alone. Creates the row if the raw
    /// name was never discovered.
    fn set_formal_name(
        &self,
        category: EntityCategory,
        raw_name: &str,
        formal_name: &str,
    ) -> Result<NameMapping>;

    fn list_name_mappings(&self, category: EntityCategory) -> Result<Vec<NameMapping>>;

    /// List rules. `Some(institution)` filters to that institution's rules
    /// only (not the globals); `None` lists everything.
    fn list_sla_rules(&self, institution: Option<&str>) -> Result<Vec<SlaRule>>;

    /// Insert or replace the rule occupying (institution, modality, patient
    /// type). A key conflict replaces the target minutes, keeping the
    /// existing id.
    fn upsert_sla_rule(&self, rule: NewSlaRule) -> Result<SlaRule>;

    fn delete_sla_rule(&self, id: u64) -> Result<()>;

    /// Replace-on-conflict write of one consolidated row. Last writer wins
    /// per key; measures are never merged.
    fn upsert_consolidated_stat(&self, key: &StatKey, measures: &StatMeasures) -> Result<()>;

    fn list_consolidated_stats(&self) -> Result<Vec<ConsolidatedStat>>;

    /// Create an upload in `Processing`, immediately visible to readers.
    fn create_upload(&self, filename: &str, total_rows: u64) -> Result<Upload>;

    /// Transition an upload's status. A terminal status can be set exactly
    /// once; further transitions fail with `AlreadyTerminal`.
    fn set_upload_status(
        &self,
        id: u64,
        status: UploadStatus,
        message: Option<String>,
    ) -> Result<()>;

    fn get_upload(&self, id: u64) -> Result<Option<Upload>>;

    /// All uploads, most recent first, so in-progress runs are visible.
    fn list_uploads(&self) -> Result<Vec<Upload>>;
}
