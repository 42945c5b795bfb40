#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod pivot;
mod record;

pub use config::PreviewConfig;
pub use pivot::{PivotRow, PivotTable, build_pivot, preview_stage};
pub use record::{ValidationRecord, ValidationStatus, ValueSource, is_empty_value};

/// Tracing target for preview construction.
pub const TRACING_TARGET: &str = "sieve_preview";
