use super::StageStatus;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::chunk::NormalizedChunk;
use crate::pipeline::keys;
use crate::pipeline::validate::{
    to_loadable_csv, validate_chunk, RejectedChunk, SchemaMapping,
};
use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Invocation payload: normalized chunk keys plus the job token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DartRequest {
    #[serde(default)]
    pub isf_keys: Vec<String>,
    pub job_id: String,
}

/// Entry in the DART error list: either the key of a written rejected-records
/// artifact, or a descriptor for a chunk that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DartErrorEntry {
    Key(String),
    Failure { isf_key: String, error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DartResponse {
    pub status: StageStatus,
    pub dart_keys: Vec<String>,
    pub error_keys: Vec<DartErrorEntry>,
    pub total_valid: usize,
    pub total_invalid: usize,
}

/// Per-chunk outcome inside the failure boundary.
#[derive(Debug)]
enum KeyOutcome {
    Processed {
        dart_key: Option<String>,
        rejected_key: Option<String>,
        valid: usize,
        invalid: usize,
    },
    Failed {
        isf_key: String,
        error: String,
    },
}

/// DART stage: validates normalized chunks against the required-field
/// contract, partitions rows, and remaps accepted rows to the load schema.
pub struct DartStage {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    mapping: SchemaMapping,
}

impl DartStage {
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let mapping = SchemaMapping::roster_load_schema()?;
        Ok(Self {
            config,
            store,
            mapping,
        })
    }

    pub async fn run(&self, request: &DartRequest) -> DartResponse {
        if request.isf_keys.is_empty() {
            info!("DART transform for job {}: no input keys", request.job_id);
            return DartResponse {
                status: StageStatus::NoFiles,
                dart_keys: Vec::new(),
                error_keys: Vec::new(),
                total_valid: 0,
                total_invalid: 0,
            };
        }

        info!(
            "🛡️ DART transform for job {}: {} normalized chunks",
            request.job_id,
            request.isf_keys.len()
        );
        metrics::stage_run("dart");
        let started = Instant::now();

        let mut status = StageStatus::Ok;
        let mut dart_keys = Vec::new();
        let mut error_keys = Vec::new();
        let mut total_valid = 0;
        let mut total_invalid = 0;

        for key in &request.isf_keys {
            let outcome = match self.transform_chunk(key, &request.job_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("DART transform failed for {}: {}", key, e);
                    metrics::key_failed("dart");
                    KeyOutcome::Failed {
                        isf_key: key.clone(),
                        error: e.to_string(),
                    }
                }
            };
            match outcome {
                KeyOutcome::Processed {
                    dart_key,
                    rejected_key,
                    valid,
                    invalid,
                } => {
                    dart_keys.extend(dart_key);
                    error_keys.extend(rejected_key.map(DartErrorEntry::Key));
                    total_valid += valid;
                    total_invalid += invalid;
                }
                KeyOutcome::Failed { isf_key, error } => {
                    status = StageStatus::Error;
                    error_keys.push(DartErrorEntry::Failure { isf_key, error });
                }
            }
        }

        metrics::stage_duration("dart", started.elapsed().as_secs_f64());
        info!(
            "✅ DART transform finished for job {}: {} loadable artifacts, {} valid rows, {} invalid rows",
            request.job_id,
            dart_keys.len(),
            total_valid,
            total_invalid
        );

        DartResponse {
            status,
            dart_keys,
            error_keys,
            total_valid,
            total_invalid,
        }
    }

    /// Validate one normalized chunk and write its partitions.
    async fn transform_chunk(&self, key: &str, job_id: &str) -> Result<KeyOutcome> {
        let bytes = self.store.get(&self.config.isf_bucket, key).await?;
        let chunk = NormalizedChunk::from_bytes(key, &bytes)?;
        let outcome = validate_chunk(chunk, &self.config.required_fields);

        let valid = outcome.accepted.len();
        let invalid = outcome.rejected.len();
        metrics::rows_accepted(valid);
        metrics::rows_rejected(invalid);

        let mut dart_key = None;
        if !outcome.accepted.is_empty() {
            let csv = to_loadable_csv(&outcome.accepted, &self.mapping)?;
            let out_key = keys::dart_key(&self.config.dart_prefix, job_id, key);
            self.store
                .put(&self.config.dart_bucket, &out_key, csv)
                .await?;
            debug!("Wrote loadable artifact {} ({} rows)", out_key, valid);
            dart_key = Some(out_key);
        }

        let mut rejected_key = None;
        if !outcome.rejected.is_empty() {
            let rejected = RejectedChunk {
                provenance: outcome.provenance,
                rows: outcome.rejected,
            };
            let out_key = keys::rejected_key(&self.config.error_prefix, job_id, key);
            self.store
                .put(&self.config.error_bucket, &out_key, rejected.to_bytes()?)
                .await?;
            debug!("Wrote rejected artifact {} ({} rows)", out_key, invalid);
            rejected_key = Some(out_key);
        }

        Ok(KeyOutcome::Processed {
            dart_key,
            rejected_key,
            valid,
            invalid,
        })
    }
}
