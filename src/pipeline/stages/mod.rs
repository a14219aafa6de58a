//! Stage drivers. Both stages share one control pattern: iterate the input
//! key list, process each key inside an isolated failure boundary, fold the
//! per-key outcomes into one aggregate result. A fault on one key never
//! aborts the rest of the batch.

use serde::{Deserialize, Serialize};

/// Aggregate status of one stage invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
    /// Nothing to do: zero input keys. Distinct from a processing failure so
    /// the orchestrator can short-circuit without raising.
    #[serde(rename = "NO_FILES")]
    NoFiles,
}

/// Per-key error descriptor carried in stage results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyError {
    pub key: String,
    pub error: String,
}

pub mod dart;
pub mod isf;

pub use dart::{DartErrorEntry, DartRequest, DartResponse, DartStage};
pub use isf::{IsfRequest, IsfResponse, IsfStage};
