//! Row normalization: workbook in, production events out.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use radprod_model::{PatientType, ProductionEvent, derive_event_id};

use crate::fields::{
    CanonicalField, FIELD_ALIASES, is_known_header, parse_date_cell, parse_timestamp_cell,
};
use crate::workbook::{Sheet, Workbook};

/// Vendor tokens that mark a sheet as a production export. A sheet is
/// eligible when its trimmed, uppercased name contains any of them.
const SHEET_KEYWORDS: &[&str] = &["PRODUCTION", "PROD", "WORKLIST", "EXAMS", "STUDIES", "LAUDOS"];

/// How the eligible sheet set was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSelection {
    /// At least one sheet name matched the vendor keyword list.
    Keyword,
    /// No sheet matched; every sheet was treated as eligible. Degraded
    /// mode, surfaced so operators can audit mis-imports.
    FallbackAll,
}

/// Output of one normalization pass.
#[derive(Debug)]
pub struct NormalizedBatch {
    pub events: Vec<ProductionEvent>,
    pub selection: SheetSelection,
    /// (normalized sheet name, data rows emitted) per eligible sheet.
    pub sheet_counts: Vec<(String, usize)>,
}

impl NormalizedBatch {
    /// Number of emitted records lacking both accession and report ids.
    pub fn missing_identifiers(&self) -> usize {
        self.events
            .iter()
            .filter(|event| !event.has_identifiers())
            .count()
    }
}

fn normalize_sheet_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Select the sheets to normalize.
///
/// Falls back to every sheet when no name matches the keyword list, so a
/// renamed export is still ingested rather than silently producing zero
/// records.
pub fn eligible_sheets(workbook: &Workbook) -> (Vec<&Sheet>, SheetSelection) {
    let matched: Vec<&Sheet> = workbook
        .sheets
        .iter()
        .filter(|sheet| {
            let name = normalize_sheet_name(&sheet.name);
            SHEET_KEYWORDS.iter().any(|keyword| name.contains(keyword))
        })
        .collect();
    if matched.is_empty() {
        (workbook.sheets.iter().collect(), SheetSelection::FallbackAll)
    } else {
        (matched, SheetSelection::Keyword)
    }
}

/// Normalize a workbook into production events.
///
/// Pure transform: the workbook is not mutated, and the emitted record
/// count equals the number of data rows in eligible sheets. Rows missing
/// timestamps still pass through; their turnaround is later undefined.
pub fn normalize(workbook: &Workbook) -> NormalizedBatch {
    let (sheets, selection) = eligible_sheets(workbook);
    if selection == SheetSelection::FallbackAll && !workbook.sheets.is_empty() {
        warn!(
            source_id = %workbook.source_id,
            sheets = workbook.sheets.len(),
            "no sheet name matched the vendor keyword list; treating every sheet as eligible"
        );
    }

    let mut events = Vec::new();
    let mut sheet_counts = Vec::new();
    for sheet in sheets {
        let sheet_name = normalize_sheet_name(&sheet.name);
        let before = events.len();
        normalize_rows(&workbook.source_id, &sheet_name, sheet, &mut events);
        let emitted = events.len() - before;
        debug!(sheet = %sheet_name, rows = emitted, "normalized sheet");
        sheet_counts.push((sheet_name, emitted));
    }

    NormalizedBatch {
        events,
        selection,
        sheet_counts,
    }
}

fn normalize_rows(
    source_id: &str,
    sheet_name: &str,
    sheet: &Sheet,
    events: &mut Vec<ProductionEvent>,
) {
    let normalized_headers: Vec<String> = sheet
        .headers
        .iter()
        .map(|header| header.trim().to_uppercase())
        .collect();

    for (index, row) in sheet.rows.iter().enumerate() {
        let row_number = index + 1;
        events.push(normalize_row(
            source_id,
            sheet_name,
            &sheet.headers,
            &normalized_headers,
            row,
            row_number,
        ));
    }
}

/// First non-empty cell among a field's aliases, in priority order.
fn field_value<'a>(
    field: CanonicalField,
    normalized_headers: &[String],
    row: &'a [String],
) -> Option<&'a str> {
    let aliases = FIELD_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, aliases)| *aliases)?;
    for alias in aliases {
        for (column, header) in normalized_headers.iter().enumerate() {
            if header == alias {
                let cell = row.get(column).map(|c| c.trim()).unwrap_or_default();
                if !cell.is_empty() {
                    return Some(cell);
                }
            }
        }
    }
    None
}

fn string_field(
    field: CanonicalField,
    normalized_headers: &[String],
    row: &[String],
) -> String {
    field_value(field, normalized_headers, row)
        .unwrap_or_default()
        .to_string()
}

fn normalize_row(
    source_id: &str,
    sheet_name: &str,
    headers: &[String],
    normalized_headers: &[String],
    row: &[String],
    row_number: usize,
) -> ProductionEvent {
    let addendum = field_value(CanonicalField::AddendumText, normalized_headers, row)
        .map(|text| text.to_string());

    // Unknown columns are preserved verbatim for audit, never dropped.
    let mut raw_fields = BTreeMap::new();
    for (column, header) in normalized_headers.iter().enumerate() {
        if header.is_empty() || is_known_header(header) {
            continue;
        }
        let original = headers.get(column).cloned().unwrap_or_default();
        let cell = row.get(column).cloned().unwrap_or_default();
        raw_fields.insert(original, cell);
    }

    ProductionEvent {
        event_id: derive_event_id(source_id, sheet_name, row_number),
        modality: string_field(CanonicalField::Modality, normalized_headers, row)
            .to_uppercase(),
        patient_type: PatientType::parse(&string_field(
            CanonicalField::PatientType,
            normalized_headers,
            row,
        )),
        exam_date: field_value(CanonicalField::ExamDate, normalized_headers, row)
            .and_then(parse_date_cell),
        assigned_at: field_value(CanonicalField::AssignedAt, normalized_headers, row)
            .and_then(parse_timestamp_cell),
        validated_at: field_value(CanonicalField::ValidatedAt, normalized_headers, row)
            .and_then(parse_timestamp_cell),
        institution_raw: string_field(CanonicalField::Institution, normalized_headers, row),
        physician_assigned_raw: string_field(
            CanonicalField::PhysicianAssigned,
            normalized_headers,
            row,
        ),
        physician_reported_raw: string_field(
            CanonicalField::PhysicianReported,
            normalized_headers,
            row,
        ),
        physician_validated_raw: string_field(
            CanonicalField::PhysicianValidated,
            normalized_headers,
            row,
        ),
        addendum_text: addendum,
        accession_number: string_field(CanonicalField::AccessionNumber, normalized_headers, row),
        patient_id: string_field(CanonicalField::PatientId, normalized_headers, row),
        patient_name: string_field(CanonicalField::PatientName, normalized_headers, row),
        exam_name: string_field(CanonicalField::ExamName, normalized_headers, row),
        report_id: string_field(CanonicalField::ReportId, normalized_headers, row),
        source_sheet: sheet_name.to_string(),
        source_row: row_number,
        raw_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Sheet;

    fn sheet(name: &str, headers: &[&str], rows: &[&[&str]]) -> Sheet {
        let mut sheet = Sheet::new(
            name,
            headers.iter().map(|h| (*h).to_string()).collect(),
        );
        for row in rows {
            sheet
                .rows
                .push(row.iter().map(|c| (*c).to_string()).collect());
        }
        sheet
    }

    #[test]
    fn keyword_sheets_are_selected() {
        let workbook = Workbook::new("export")
            .with_sheet(sheet("Production March", &["MODALITY"], &[&["CT"]]))
            .with_sheet(sheet("Notes", &["TEXT"], &[&["ignore"]]));
        let (selected, selection) = eligible_sheets(&workbook);
        assert_eq!(selection, SheetSelection::Keyword);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Production March");
    }

    #[test]
    fn fallback_selects_every_sheet() {
        let workbook = Workbook::new("export")
            .with_sheet(sheet("Sheet1", &["MODALITY"], &[&["CT"]]))
            .with_sheet(sheet("Sheet2", &["MODALITY"], &[&["MR"]]));
        let (selected, selection) = eligible_sheets(&workbook);
        assert_eq!(selection, SheetSelection::FallbackAll);
        assert_eq!(selected.len(), 2);

        let batch = normalize(&workbook);
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.selection, SheetSelection::FallbackAll);
    }

    #[test]
    fn first_non_empty_alias_wins() {
        // "VALIDATED AT" outranks "SIGNED AT" but its cell is empty here.
        let workbook = Workbook::new("export").with_sheet(sheet(
            "PRODUCTION",
            &["VALIDATED AT", "SIGNED AT", "MODALITY"],
            &[&["", "2026-03-14 09:30:00", "ct"]],
        ));
        let batch = normalize(&workbook);
        let event = &batch.events[0];
        assert_eq!(
            event.validated_at.unwrap().to_string(),
            "2026-03-14 09:30:00"
        );
        assert_eq!(event.modality, "CT");
    }

    #[test]
    fn unknown_columns_land_in_raw_fields() {
        let workbook = Workbook::new("export").with_sheet(sheet(
            "PRODUCTION",
            &["MODALITY", "Scanner Room", "ACCESSION"],
            &[&["CT", "Room 4", "ACC-1"]],
        ));
        let batch = normalize(&workbook);
        let event = &batch.events[0];
        assert_eq!(event.raw_fields.len(), 1);
        assert_eq!(event.raw_fields.get("Scanner Room").unwrap(), "Room 4");
        assert!(event.has_identifiers());
    }

    #[test]
    fn rows_missing_timestamps_pass_through() {
        let workbook = Workbook::new("export").with_sheet(sheet(
            "WORKLIST",
            &["MODALITY", "ASSIGNED AT"],
            &[&["DX", ""]],
        ));
        let batch = normalize(&workbook);
        assert_eq!(batch.events.len(), 1);
        assert!(batch.events[0].assigned_at.is_none());
        assert_eq!(batch.events[0].turnaround_minutes(), None);
        assert_eq!(batch.missing_identifiers(), 1);
    }

    #[test]
    fn empty_sheet_emits_zero_records() {
        let workbook = Workbook::new("export")
            .with_sheet(sheet("PRODUCTION", &["MODALITY"], &[]));
        let batch = normalize(&workbook);
        assert!(batch.events.is_empty());
        assert_eq!(batch.sheet_counts, vec![("PRODUCTION".to_string(), 0)]);
    }

    #[test]
    fn record_count_matches_data_rows() {
        let workbook = Workbook::new("export")
            .with_sheet(sheet("PROD A", &["MODALITY"], &[&["CT"], &["MR"]]))
            .with_sheet(sheet("PROD B", &["MODALITY"], &[&["US"]]));
        let batch = normalize(&workbook);
        assert_eq!(batch.events.len(), 3);
        assert_eq!(batch.events[0].source_sheet, "PROD A");
        assert_eq!(batch.events[2].source_sheet, "PROD B");
        assert_eq!(batch.events[0].source_row, 1);
        assert_eq!(batch.events[1].source_row, 2);
    }
}
