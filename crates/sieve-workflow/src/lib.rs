#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod binding;
pub mod definition;
pub mod import;
pub mod reference;
pub mod store;
pub mod tool;
pub mod view;

#[doc(hidden)]
pub mod prelude;

pub use sieve_core::{Error, ErrorKind, Result};

/// Tracing target for workflow model mutations.
pub const TRACING_TARGET: &str = "sieve_workflow";

/// Tracing target for binding validation and audits.
pub const TRACING_TARGET_BINDING: &str = "sieve_workflow::binding";

/// Tracing target for legacy schema import.
pub const TRACING_TARGET_IMPORT: &str = "sieve_workflow::import";

/// Tracing target for workflow persistence.
pub const TRACING_TARGET_STORE: &str = "sieve_workflow::store";
