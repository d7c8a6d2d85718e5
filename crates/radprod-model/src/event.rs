use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::Digest;

/// Urgency classification of an imaging study.
///
/// Export vendors spell these inconsistently; parsing is lenient and unknown
/// values are preserved verbatim rather than rejected, so a new vendor code
/// never aborts an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatientType {
    /// Emergency / urgent studies ("U").
    Urgent,
    /// Outpatient / ambulatory studies ("A").
    Ambulatory,
    /// Inpatient / ward studies ("H").
    Hospitalized,
    /// Unrecognized vendor code, kept as-is.
    Other(String),
}

impl PatientType {
    /// Parse a vendor cell value. Never fails; unknown codes map to `Other`.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_uppercase();
        match normalized.as_str() {
            "U" | "URG" | "URGENT" | "EMERGENCY" | "ER" => PatientType::Urgent,
            "A" | "AMB" | "AMBULATORY" | "OUTPATIENT" => PatientType::Ambulatory,
            "H" | "HOSP" | "HOSPITALIZED" | "INPATIENT" | "WARD" => PatientType::Hospitalized,
            _ => PatientType::Other(normalized),
        }
    }

    /// Canonical single-letter code used in grouping keys and SLA rules.
    pub fn code(&self) -> &str {
        match self {
            PatientType::Urgent => "U",
            PatientType::Ambulatory => "A",
            PatientType::Hospitalized => "H",
            PatientType::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for PatientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Derive a stable event identifier from the originating cell coordinates.
///
/// Deterministic: sha256("<source_id>\0<sheet>\0<row_number>"), first 16
/// bytes hex-encoded. Re-ingesting the same workbook yields the same ids.
pub fn derive_event_id(source_id: &str, sheet: &str, row_number: usize) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(sheet.as_bytes());
    hasher.update([0u8]);
    hasher.update(row_number.to_string().as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    hex::encode(&digest[..16])
}

/// One imaging study's lifecycle record, normalized from a spreadsheet row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionEvent {
    /// Deterministic id derived from source coordinates (see [`derive_event_id`]).
    pub event_id: String,
    /// Imaging technique code (CT, MR, DX, US, MG, ...).
    pub modality: String,
    pub patient_type: PatientType,
    pub exam_date: Option<NaiveDate>,
    /// When the study was assigned to a reporting physician.
    pub assigned_at: Option<NaiveDateTime>,
    /// When the report was validated (signed). Absent = study not yet complete.
    pub validated_at: Option<NaiveDateTime>,
    pub institution_raw: String,
    pub physician_assigned_raw: String,
    pub physician_reported_raw: String,
    pub physician_validated_raw: String,
    pub addendum_text: Option<String>,
    pub accession_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub exam_name: String,
    pub report_id: String,
    /// Normalized name of the sheet the row came from.
    pub source_sheet: String,
    /// 1-based data row number within the sheet.
    pub source_row: usize,
    /// Columns the normalizer did not recognize, preserved verbatim for audit.
    pub raw_fields: BTreeMap<String, String>,
}

impl ProductionEvent {
    /// True when at least one identifying field is present.
    ///
    /// Records without identifiers are still ingested and aggregated; they
    /// are only flagged low-confidence for audit.
    pub fn has_identifiers(&self) -> bool {
        !self.accession_number.trim().is_empty() || !self.report_id.trim().is_empty()
    }

    /// Elapsed whole minutes between assignment and validation.
    ///
    /// `None` when either timestamp is missing. Negative durations (clock
    /// skew or data errors) clamp to 0 so averages stay usable.
    pub fn turnaround_minutes(&self) -> Option<i64> {
        let assigned = self.assigned_at?;
        let validated = self.validated_at?;
        Some((validated - assigned).num_minutes().max(0))
    }

    /// True when the record carries a non-empty addendum.
    pub fn has_addendum(&self) -> bool {
        self.addendum_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}
