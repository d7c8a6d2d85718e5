//! Canonical field table for the production-event schema.
//!
//! Export vendors name the same columns differently. Each canonical field
//! carries a fixed, priority-ordered list of accepted header spellings; the
//! first non-empty cell wins. This is an explicit lookup table, not a fuzzy
//! scan, so the mapping is auditable and stable across runs.

use chrono::{NaiveDate, NaiveDateTime};

/// Canonical fields of a production-event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Modality,
    PatientType,
    ExamDate,
    AssignedAt,
    ValidatedAt,
    Institution,
    PhysicianAssigned,
    PhysicianReported,
    PhysicianValidated,
    AddendumText,
    AccessionNumber,
    PatientId,
    PatientName,
    ExamName,
    ReportId,
}

/// Accepted header spellings per canonical field, in priority order.
/// Matching is on trimmed, uppercased header names.
pub const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Modality, &["MODALITY", "MOD", "EXAM MODALITY"]),
    (
        CanonicalField::PatientType,
        &["PATIENT TYPE", "PAT TYPE", "URGENCY", "PRIORITY"],
    ),
    (
        CanonicalField::ExamDate,
        &["EXAM DATE", "STUDY DATE", "DATE"],
    ),
    (
        CanonicalField::AssignedAt,
        &["ASSIGNED AT", "ASSIGNED", "ASSIGNMENT DATE", "DISTRIBUTED AT"],
    ),
    (
        CanonicalField::ValidatedAt,
        &["VALIDATED AT", "VALIDATED", "VALIDATION DATE", "SIGNED AT"],
    ),
    (
        CanonicalField::Institution,
        &["INSTITUTION", "CLIENT", "FACILITY", "UNIT"],
    ),
    (
        CanonicalField::PhysicianAssigned,
        &["ASSIGNED PHYSICIAN", "RADIOLOGIST ASSIGNED", "ASSIGNED TO"],
    ),
    (
        CanonicalField::PhysicianReported,
        &["REPORTING PHYSICIAN", "REPORTED BY", "RADIOLOGIST"],
    ),
    (
        CanonicalField::PhysicianValidated,
        &["VALIDATING PHYSICIAN", "VALIDATED BY", "SIGNING PHYSICIAN", "SIGNED BY"],
    ),
    (
        CanonicalField::AddendumText,
        &["ADDENDUM", "ADDENDUM TEXT", "AMENDMENT"],
    ),
    (
        CanonicalField::AccessionNumber,
        &["ACCESSION", "ACCESSION NUMBER", "ACC NO"],
    ),
    (
        CanonicalField::PatientId,
        &["PATIENT ID", "PAT ID", "MRN"],
    ),
    (
        CanonicalField::PatientName,
        &["PATIENT NAME", "PATIENT"],
    ),
    (
        CanonicalField::ExamName,
        &["EXAM NAME", "EXAM", "PROCEDURE", "STUDY DESCRIPTION"],
    ),
    (
        CanonicalField::ReportId,
        &["REPORT ID", "REPORT NO", "REPORT NUMBER"],
    ),
];

/// Returns true when the (already normalized) header belongs to any
/// canonical field.
pub fn is_known_header(normalized_header: &str) -> bool {
    FIELD_ALIASES
        .iter()
        .any(|(_, aliases)| aliases.contains(&normalized_header))
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a timestamp cell against the accepted formats, in order.
/// Unparseable values become `None`; the record still passes through.
pub fn parse_timestamp_cell(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Parse a date-only cell; falls back to the date part of a full timestamp.
pub fn parse_date_cell(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| parse_timestamp_cell(trimmed).map(|ts| ts.date()))
}
