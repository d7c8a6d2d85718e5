pub mod aggregate;
pub mod pipeline;
pub mod resolve;
pub mod sla;

pub use aggregate::{AggregationOutcome, aggregate, persist_stats};
pub use pipeline::{IngestPipeline, IngestReport, PipelineError, PipelineOptions};
pub use resolve::EntityResolver;
pub use sla::{SEED_MODALITIES, SEED_PATIENT_TYPES, SlaResolver};
