#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for order-index maintenance.
pub const TRACING_TARGET_ORDER: &str = "sieve_core::order";

mod error;
mod id;
pub mod order;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use id::{DocumentId, StageId, ToolId, ValueId, WorkflowId};
pub use order::{Direction, Ordered};
