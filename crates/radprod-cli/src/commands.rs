//! Command implementations over the JSON-backed store.

use std::path::Path;

use anyhow::{Context, Result};

use radprod_core::{IngestPipeline, PipelineOptions, SlaResolver};
use radprod_model::NewSlaRule;
use radprod_store::{JsonStore, Store};

use crate::cli::{EntityCommand, IngestArgs, SlaCommand, StatsArgs};
use crate::summary::{
    print_ingest_summary, print_mappings_table, print_rules_table, print_stats_table,
    print_uploads_table,
};

fn open_store(data_dir: &Path) -> Result<JsonStore> {
    JsonStore::open(data_dir)
        .with_context(|| format!("open store in {}", data_dir.display()))
}

/// Run one ingestion; returns true when the upload ended in error.
pub fn run_ingest(args: &IngestArgs, data_dir: &Path) -> Result<bool> {
    let store = open_store(data_dir)?;
    let filename = args
        .workbook_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("workbook")
        .to_string();
    let report = IngestPipeline::new(&store)
        .with_options(PipelineOptions {
            batch_size: args.batch_size,
            cancel: None,
        })
        .run_dir(&args.workbook_dir, &filename)
        .with_context(|| format!("ingest workbook from {}", args.workbook_dir.display()))?;
    store.flush().context("flush store state")?;

    print_ingest_summary(&report);
    let stats = store.list_consolidated_stats()?;
    if !stats.is_empty() {
        print_stats_table(&stats);
    }
    Ok(report.status == radprod_model::UploadStatus::Error)
}

pub fn run_sla(command: &SlaCommand, data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    match command {
        SlaCommand::List { institution } => {
            let rules = store.list_sla_rules(institution.as_deref())?;
            print_rules_table(&rules);
        }
        SlaCommand::Set {
            institution,
            modality,
            patient_type,
            target_minutes,
        } => {
            let resolver = SlaResolver::new(&store);
            let rule = resolver.upsert_rule(NewSlaRule {
                institution: institution.clone(),
                modality: modality.trim().to_uppercase(),
                patient_type: patient_type.trim().to_uppercase(),
                target_minutes: *target_minutes,
            })?;
            store.flush()?;
            println!(
                "Rule #{} set: {}/{}/{} -> {} min",
                rule.id,
                rule.institution.as_deref().unwrap_or("(global)"),
                rule.modality,
                rule.patient_type,
                rule.target_minutes
            );
        }
        SlaCommand::Delete { id } => {
            let resolver = SlaResolver::new(&store);
            resolver.delete_rule(*id)?;
            store.flush()?;
            println!("Rule #{id} deleted");
        }
    }
    Ok(())
}

pub fn run_entities(command: &EntityCommand, data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    match command {
        EntityCommand::List { category } => {
            let mappings = store.list_name_mappings(*category)?;
            print_mappings_table(&mappings);
        }
        EntityCommand::Rename {
            category,
            raw_name,
            formal_name,
        } => {
            let mapping = store.set_formal_name(*category, raw_name, formal_name)?;
            store.flush()?;
            println!(
                "{} '{}' now maps to '{}'",
                mapping.category, mapping.raw_name, mapping.formal_name
            );
        }
    }
    Ok(())
}

pub fn run_stats(args: &StatsArgs, data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let mut stats = store.list_consolidated_stats()?;
    if let Some(date) = args.date {
        stats.retain(|stat| stat.key.report_date == date);
    }
    if let Some(institution) = &args.institution {
        stats.retain(|stat| &stat.key.institution_raw == institution);
    }
    print_stats_table(&stats);
    Ok(())
}

pub fn run_uploads(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir)?;
    let uploads = store.list_uploads()?;
    print_uploads_table(&uploads);
    Ok(())
}
