//! Batch roster transform pipeline.
//!
//! Two stages move roster records from raw newline-delimited objects into
//! warehouse-loadable artifacts:
//!
//! - **ISF** ([`pipeline::stages::IsfStage`]): normalizes raw records into
//!   chunked tabular artifacts — column name standardization, date coercion,
//!   last-wins deduplication, provenance annotation.
//! - **DART** ([`pipeline::stages::DartStage`]): validates normalized chunks
//!   against the required-field contract, partitions rows into loadable and
//!   rejected sets, and remaps accepted rows to the load schema.
//!
//! Stages run against an [`store::ObjectStore`] and communicate only through
//! written artifacts and their returned result summaries; an external
//! orchestrator threads the job id between invocations.

pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod record;
pub mod store;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
