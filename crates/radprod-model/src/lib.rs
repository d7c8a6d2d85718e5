pub mod entity;
pub mod event;
pub mod sla;
pub mod stats;
pub mod upload;

pub use entity::{EntityCategory, NameMapping};
pub use event::{PatientType, ProductionEvent, derive_event_id};
pub use sla::{DEFAULT_TARGET_MINUTES, NewSlaRule, SlaRule};
pub use stats::{ConsolidatedStat, StatKey, StatMeasures};
pub use upload::{Upload, UploadStatus};
