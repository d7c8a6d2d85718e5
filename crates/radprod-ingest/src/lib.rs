pub mod error;
pub mod fields;
pub mod normalize;
pub mod workbook;

pub use error::{IngestError, Result};
pub use fields::{CanonicalField, FIELD_ALIASES, parse_date_cell, parse_timestamp_cell};
pub use normalize::{NormalizedBatch, SheetSelection, eligible_sheets, normalize};
pub use workbook::{Sheet, Workbook, load_workbook_dir};
