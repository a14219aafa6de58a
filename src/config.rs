use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "roster-pipeline.toml";

/// Configuration for both transform stages. Defaults mirror the deployed
/// environment; every field can be overridden from a TOML file or the
/// environment (environment wins).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_bucket: String,
    pub isf_bucket: String,
    pub dart_bucket: String,
    pub error_bucket: String,
    pub isf_prefix: String,
    pub dart_prefix: String,
    pub error_prefix: String,
    /// Upper bound on rows per normalized output object.
    pub max_rows_per_chunk: usize,
    /// Fields a row must carry to be loadable.
    pub required_fields: Vec<String>,
    /// Root directory backing the filesystem object store.
    pub data_root: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_bucket: "plm-raw-bucket".to_string(),
            isf_bucket: "plm-isf-bucket".to_string(),
            dart_bucket: "plm-dart-bucket".to_string(),
            error_bucket: "plm-error-bucket".to_string(),
            isf_prefix: "isf/".to_string(),
            dart_prefix: "dart/".to_string(),
            error_prefix: "errors/".to_string(),
            max_rows_per_chunk: 100_000,
            required_fields: vec![
                "provider_id".to_string(),
                "date".to_string(),
                "name".to_string(),
            ],
            data_root: "data".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration: `roster-pipeline.toml` if present, then
    /// environment variable overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!(
                    "failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str(&content).map_err(|e| {
                PipelineError::Config(format!(
                    "failed to parse config file '{}': {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        for (var, target) in [
            ("S3_RAW_BUCKET", &mut self.raw_bucket),
            ("ISF_BUCKET", &mut self.isf_bucket),
            ("DART_BUCKET", &mut self.dart_bucket),
            ("ERROR_BUCKET", &mut self.error_bucket),
            ("ISF_PREFIX", &mut self.isf_prefix),
            ("DART_PREFIX", &mut self.dart_prefix),
            ("ERROR_PREFIX", &mut self.error_prefix),
            ("ROSTER_DATA_ROOT", &mut self.data_root),
        ] {
            if let Ok(value) = env::var(var) {
                if !value.trim().is_empty() {
                    *target = value;
                }
            }
        }
        if let Ok(value) = env::var("MAX_ROWS_PER_CHUNK") {
            if let Ok(parsed) = value.trim().parse::<usize>() {
                self.max_rows_per_chunk = parsed;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_rows_per_chunk == 0 {
            return Err(PipelineError::Config(
                "max_rows_per_chunk must be at least 1".to_string(),
            ));
        }
        if self.required_fields.is_empty() {
            return Err(PipelineError::Config(
                "required_fields must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
