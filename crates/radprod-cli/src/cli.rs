//! CLI argument definitions for the radprod consolidation tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use radprod_model::EntityCategory;

#[derive(Parser)]
#[command(
    name = "radprod",
    version,
    about = "Radiology production consolidation - ingest exports, resolve entities, evaluate SLAs",
    long_about = "Ingest heterogeneous spreadsheet exports of imaging production events,\n\
                  resolve raw institution and physician names into canonical entities,\n\
                  evaluate per-record SLA compliance, and consolidate a daily summary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory holding the persistent store state.
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = "radprod-data",
        global = true
    )]
    pub data_dir: PathBuf,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest a workbook directory of CSV sheets into the consolidated summary.
    Ingest(IngestArgs),

    /// Manage SLA target-turnaround rules.
    Sla {
        #[command(subcommand)]
        command: SlaCommand,
    },

    /// Inspect and rename discovered institutions and physicians.
    Entities {
        #[command(subcommand)]
        command: EntityCommand,
    },

    /// List consolidated daily statistics.
    Stats(StatsArgs),

    /// Show ingestion runs and their terminal status.
    Uploads,
}

#[derive(Parser)]
pub struct IngestArgs {
    /// Directory containing one CSV file per workbook sheet.
    #[arg(value_name = "WORKBOOK_DIR")]
    pub workbook_dir: PathBuf,

    /// Raw-row batch size for event persistence.
    #[arg(long = "batch-size", default_value_t = 100)]
    pub batch_size: usize,
}

#[derive(Subcommand)]
pub enum SlaCommand {
    /// List rules, optionally for one institution.
    List {
        #[arg(long)]
        institution: Option<String>,
    },
    /// Insert or replace the rule on (institution, modality, patient type).
    Set {
        /// Omit for a global fallback rule.
        #[arg(long)]
        institution: Option<String>,
        #[arg(long)]
        modality: String,
        #[arg(long = "patient-type")]
        patient_type: String,
        #[arg(long = "target-minutes")]
        target_minutes: i64,
    },
    /// Delete a rule by id.
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum EntityCommand {
    /// List name mappings for a category.
    List {
        #[arg(value_name = "CATEGORY")]
        category: EntityCategory,
    },
    /// Set the formal name for a raw name (authoritative operator edit).
    Rename {
        #[arg(value_name = "CATEGORY")]
        category: EntityCategory,
        #[arg(value_name = "RAW_NAME")]
        raw_name: String,
        #[arg(value_name = "FORMAL_NAME")]
        formal_name: String,
    },
}

#[derive(Parser)]
pub struct StatsArgs {
    /// Only rows for this report date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,

    /// Only rows for this raw institution name.
    #[arg(long)]
    pub institution: Option<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
