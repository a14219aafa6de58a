use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A date-typed column value after normalization. Unparsable input is kept
/// with its original text instead of being collapsed to null, so the
/// validation stage can tell "present but unparsable" from "absent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DateValue {
    Valid(NaiveDate),
    Invalid(String),
}

impl DateValue {
    pub fn as_valid(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Valid(date) => Some(*date),
            DateValue::Invalid(_) => None,
        }
    }
}

/// One normalized row. Recognized columns are explicit fields; everything
/// else lands in `extra` under its normalized column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub provider_id: Option<String>,
    pub date: Option<DateValue>,
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Where and when a chunk's rows entered the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_bucket: String,
    pub source_key: String,
    pub ingested_at: DateTime<Utc>,
}

/// One normalized output artifact: ordered rows plus the batch-level column
/// set. Column presence lives here, not on rows, because validation checks
/// presence column-wise over the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedChunk {
    pub columns: BTreeSet<String>,
    pub provenance: Provenance,
    pub rows: Vec<NormalizedRecord>,
}

impl NormalizedChunk {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| PipelineError::MalformedChunk {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            source_bucket: "plm-raw-bucket".to_string(),
            source_key: "raw/run1/export_1.jsonl".to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn chunk_document_roundtrips() {
        let chunk = NormalizedChunk {
            columns: ["provider_id", "date"].iter().map(|s| s.to_string()).collect(),
            provenance: provenance(),
            rows: vec![NormalizedRecord {
                provider_id: Some("1".to_string()),
                date: Some(DateValue::Valid(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
                name: None,
                extra: BTreeMap::new(),
            }],
        };

        let bytes = chunk.to_bytes().unwrap();
        let decoded = NormalizedChunk::from_bytes("k", &bytes).unwrap();
        assert_eq!(decoded.rows, chunk.rows);
        assert_eq!(decoded.columns, chunk.columns);
        assert!(decoded.has_column("date"));
        assert!(!decoded.has_column("name"));
    }

    #[test]
    fn invalid_date_keeps_original_text() {
        let value = DateValue::Invalid("not-a-date".to_string());
        assert_eq!(value.as_valid(), None);
        let json = serde_json::to_string(&value).unwrap();
        let back: DateValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn malformed_document_names_the_key() {
        let err = NormalizedChunk::from_bytes("isf/j/bad.json", b"not json").unwrap_err();
        assert!(err.to_string().contains("isf/j/bad.json"));
    }
}
