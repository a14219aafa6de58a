use super::{KeyError, StageStatus};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::chunk::Provenance;
use crate::pipeline::keys;
use crate::pipeline::normalize::normalize_chunk;
use crate::record::{raw_records, RawRecord};
use crate::store::ObjectStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Invocation payload: raw object keys plus the job token that namespaces
/// every output key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsfRequest {
    #[serde(default)]
    pub s3_keys: Vec<String>,
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsfResponse {
    pub status: StageStatus,
    pub isf_keys: Vec<String>,
    pub processed_count: usize,
    pub errors: Vec<KeyError>,
}

/// Outcome of one source object inside the per-key failure boundary.
#[derive(Debug)]
enum KeyOutcome {
    Produced { keys: Vec<String>, rows: usize },
    Failed(KeyError),
}

/// ISF stage: normalizes raw newline-delimited roster objects into chunked
/// tabular artifacts.
pub struct IsfStage {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
}

impl IsfStage {
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    pub async fn run(&self, request: &IsfRequest) -> IsfResponse {
        if request.s3_keys.is_empty() {
            info!("ISF transform for job {}: no input keys", request.job_id);
            return IsfResponse {
                status: StageStatus::NoFiles,
                isf_keys: Vec::new(),
                processed_count: 0,
                errors: Vec::new(),
            };
        }

        info!(
            "🔧 ISF transform for job {}: {} raw objects",
            request.job_id,
            request.s3_keys.len()
        );
        metrics::stage_run("isf");
        let started = Instant::now();

        let mut isf_keys = Vec::new();
        let mut errors = Vec::new();
        let mut processed_count = 0;

        for key in &request.s3_keys {
            let outcome = match self.transform_object(key, &request.job_id).await {
                Ok((keys, rows)) => KeyOutcome::Produced { keys, rows },
                Err(e) => {
                    error!("ISF transform failed for {}: {}", key, e);
                    metrics::key_failed("isf");
                    KeyOutcome::Failed(KeyError {
                        key: key.clone(),
                        error: e.to_string(),
                    })
                }
            };
            match outcome {
                KeyOutcome::Produced { keys, rows } => {
                    isf_keys.extend(keys);
                    processed_count += rows;
                }
                KeyOutcome::Failed(key_error) => errors.push(key_error),
            }
        }

        metrics::stage_duration("isf", started.elapsed().as_secs_f64());

        let status = if errors.is_empty() {
            StageStatus::Ok
        } else {
            StageStatus::Error
        };
        info!(
            "✅ ISF transform finished for job {}: {} artifacts, {} rows, {} errors",
            request.job_id,
            isf_keys.len(),
            processed_count,
            errors.len()
        );

        IsfResponse {
            status,
            isf_keys,
            processed_count,
            errors,
        }
    }

    /// Normalize one raw object into zero or more chunk artifacts.
    async fn transform_object(&self, key: &str, job_id: &str) -> Result<(Vec<String>, usize)> {
        let bytes = self.store.get(&self.config.raw_bucket, key).await?;
        let text = String::from_utf8(bytes).map_err(|source| PipelineError::Encoding {
            key: key.to_string(),
            source,
        })?;
        let records: Vec<RawRecord> = raw_records(&text).collect();
        if records.is_empty() {
            debug!("Raw object {} has no records, producing no artifacts", key);
            return Ok((Vec::new(), 0));
        }

        let chunk_size = self.config.max_rows_per_chunk.max(1);
        let mut produced = Vec::new();
        let mut rows_written = 0;

        for (part, slice) in records.chunks(chunk_size).enumerate() {
            let provenance = Provenance {
                source_bucket: self.config.raw_bucket.clone(),
                source_key: key.to_string(),
                ingested_at: Utc::now(),
            };
            let chunk = normalize_chunk(slice, provenance);
            let out_key = keys::isf_part_key(&self.config.isf_prefix, job_id, key, part);
            self.store
                .put(&self.config.isf_bucket, &out_key, chunk.to_bytes()?)
                .await?;
            debug!(
                "Wrote normalized chunk {} ({} rows)",
                out_key,
                chunk.rows.len()
            );
            metrics::rows_normalized(chunk.rows.len());
            rows_written += chunk.rows.len();
            produced.push(out_key);
        }
        metrics::chunks_written("isf", produced.len());

        Ok((produced, rows_written))
    }
}
