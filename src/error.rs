use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("object store error: {message}")]
    Store { message: String },

    #[error("object {key} is not valid UTF-8: {source}")]
    Encoding {
        key: String,
        source: std::string::FromUtf8Error,
    },

    #[error("malformed chunk document at {key}: {message}")]
    MalformedChunk { key: String, message: String },

    #[error("invalid schema mapping: {0}")]
    SchemaMapping(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
