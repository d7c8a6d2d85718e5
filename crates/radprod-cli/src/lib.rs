//! CLI library components for the radprod consolidation tool.

pub mod logging;
