use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Composite grouping key for the daily consolidated summary.
///
/// `Ord` so aggregated output iterates deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatKey {
    /// Validation timestamp truncated to the calendar day.
    pub report_date: NaiveDate,
    pub institution_raw: String,
    /// Raw name of the validating physician.
    pub physician_raw: String,
    pub modality: String,
    /// Canonical patient-type code (see `PatientType::code`).
    pub patient_type: String,
}

/// Measures accumulated per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatMeasures {
    pub exam_count: u64,
    pub mean_turnaround_minutes: f64,
    pub addendum_count: u64,
    pub sla_compliant_count: u64,
}

/// One persisted row of the consolidated summary.
///
/// Writing the same key again replaces the measures (last writer wins);
/// measures are never summed across writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedStat {
    pub key: StatKey,
    pub measures: StatMeasures,
}
