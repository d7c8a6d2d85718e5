//! Table rendering for command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use radprod_core::IngestReport;
use radprod_model::{ConsolidatedStat, NameMapping, SlaRule, Upload, UploadStatus};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: UploadStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        UploadStatus::Completed => cell.fg(Color::Green),
        UploadStatus::Error => cell.fg(Color::Red),
        UploadStatus::Processing => cell.fg(Color::Yellow),
    }
}

pub fn print_ingest_summary(report: &IngestReport) {
    println!("Upload #{}: {}", report.upload_id, report.status);
    if let Some(message) = &report.message {
        println!("Message: {message}");
    }
    if report.sheet_fallback {
        println!("Note: no sheet name matched the vendor keyword list; all sheets were ingested.");
    }

    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![header_cell("Measure"), header_cell("Count")]);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Rows normalized"), Cell::new(report.normalized)]);
    table.add_row(vec![
        Cell::new("Raw rows persisted"),
        Cell::new(report.persisted_rows),
    ]);
    table.add_row(vec![
        Cell::new("Failed batches"),
        Cell::new(report.failed_batches),
    ]);
    table.add_row(vec![
        Cell::new("Skipped (not validated)"),
        Cell::new(report.skipped_unvalidated),
    ]);
    table.add_row(vec![
        Cell::new("Missing identifiers"),
        Cell::new(report.missing_identifiers),
    ]);
    table.add_row(vec![
        Cell::new("Institutions discovered"),
        Cell::new(report.institutions_discovered),
    ]);
    table.add_row(vec![
        Cell::new("Physicians discovered"),
        Cell::new(report.physicians_discovered),
    ]);
    table.add_row(vec![
        Cell::new("SLA rules seeded"),
        Cell::new(report.sla_rules_seeded),
    ]);
    table.add_row(vec![
        Cell::new("Stat groups written"),
        Cell::new(report.stat_groups_written),
    ]);
    println!("{table}");
}

pub fn print_stats_table(stats: &[ConsolidatedStat]) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Date"),
        header_cell("Institution"),
        header_cell("Physician"),
        header_cell("Modality"),
        header_cell("Type"),
        header_cell("Exams"),
        header_cell("Mean TAT (min)"),
        header_cell("Addenda"),
        header_cell("Within SLA"),
    ]);
    for index in 5..9 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for stat in stats {
        table.add_row(vec![
            Cell::new(stat.key.report_date),
            Cell::new(&stat.key.institution_raw),
            Cell::new(&stat.key.physician_raw),
            Cell::new(&stat.key.modality),
            Cell::new(&stat.key.patient_type),
            Cell::new(stat.measures.exam_count),
            Cell::new(format!("{:.1}", stat.measures.mean_turnaround_minutes)),
            Cell::new(stat.measures.addendum_count),
            Cell::new(stat.measures.sla_compliant_count),
        ]);
    }
    println!("{table}");
}

pub fn print_rules_table(rules: &[SlaRule]) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Institution"),
        header_cell("Modality"),
        header_cell("Type"),
        header_cell("Target (min)"),
    ]);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(rule.institution.as_deref().unwrap_or("(global)")),
            Cell::new(&rule.modality),
            Cell::new(&rule.patient_type),
            Cell::new(rule.target_minutes),
        ]);
    }
    println!("{table}");
}

pub fn print_mappings_table(mappings: &[NameMapping]) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Raw name"),
        header_cell("Formal name"),
        header_cell("Edited"),
        header_cell("First seen"),
    ]);
    for mapping in mappings {
        table.add_row(vec![
            Cell::new(&mapping.raw_name),
            Cell::new(&mapping.formal_name),
            Cell::new(if mapping.operator_edited { "yes" } else { "" }),
            Cell::new(mapping.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    println!("{table}");
}

pub fn print_uploads_table(uploads: &[Upload]) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Filename"),
        header_cell("Rows"),
        header_cell("Status"),
        header_cell("Started"),
        header_cell("Message"),
    ]);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for upload in uploads {
        table.add_row(vec![
            Cell::new(upload.id),
            Cell::new(&upload.filename),
            Cell::new(upload.total_rows),
            status_cell(upload.status),
            Cell::new(upload.started_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(upload.message.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
}
