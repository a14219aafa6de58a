//! Validation of normalized chunks against the required-field contract and
//! remapping of accepted rows to the warehouse load schema.

use crate::error::{PipelineError, Result};
use crate::pipeline::chunk::{DateValue, NormalizedChunk, NormalizedRecord, Provenance};
use crate::pipeline::normalize::{scalar_text, COLUMN_DATE, COLUMN_NAME, COLUMN_PROVIDER_ID};
use serde::{Deserialize, Serialize};

/// One violated validation rule. Rendered with the legacy tag vocabulary so
/// downstream consumers of the error artifacts keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingField(String),
    BadDate,
}

impl Violation {
    pub fn tag(&self) -> String {
        match self {
            Violation::MissingField(field) => format!("missing:{field}"),
            Violation::BadDate => "bad_date".to_string(),
        }
    }
}

/// Join violations into the legacy semicolon-delimited reason string,
/// e.g. `"missing:date;bad_date;"`.
pub fn render_reason(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{};", violation.tag()))
        .collect()
}

/// A rejected row: the original record plus its accumulated reason string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    #[serde(flatten)]
    pub record: NormalizedRecord,
    pub error_reason: String,
}

/// Rejected-records output artifact: original schema plus the reason field,
/// provenance carried over from the normalized chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedChunk {
    pub provenance: Provenance,
    pub rows: Vec<RejectedRecord>,
}

impl RejectedChunk {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// A normalized chunk split into loadable and rejected partitions.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub provenance: Provenance,
    pub accepted: Vec<NormalizedRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Evaluate the required-field contract over one chunk.
///
/// Presence is checked column-wise: a required column absent from the batch
/// rejects every row. The `date` rule is additionally checked row-wise when
/// the column exists, so `missing:date` and `bad_date` never co-occur on one
/// row. Every input row lands in exactly one partition.
pub fn validate_chunk(chunk: NormalizedChunk, required_fields: &[String]) -> ValidationOutcome {
    let mut violations: Vec<Vec<Violation>> = vec![Vec::new(); chunk.rows.len()];

    for field in required_fields {
        if !chunk.columns.contains(field) {
            for row_violations in &mut violations {
                row_violations.push(Violation::MissingField(field.clone()));
            }
        } else if field == COLUMN_DATE {
            for (row, row_violations) in chunk.rows.iter().zip(&mut violations) {
                let has_valid_date = matches!(row.date, Some(DateValue::Valid(_)));
                if !has_valid_date {
                    row_violations.push(Violation::BadDate);
                }
            }
        }
    }

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for (row, row_violations) in chunk.rows.into_iter().zip(violations) {
        if row_violations.is_empty() {
            accepted.push(row);
        } else {
            rejected.push(RejectedRecord {
                record: row,
                error_reason: render_reason(&row_violations),
            });
        }
    }

    ValidationOutcome {
        provenance: chunk.provenance,
        accepted,
        rejected,
    }
}

/// Fixed source-to-target column rename table for the warehouse load schema,
/// validated at construction.
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    entries: Vec<(String, String)>,
}

/// The roster staging table's load schema.
pub const ROSTER_LOAD_SCHEMA: [(&str, &str); 3] = [
    (COLUMN_PROVIDER_ID, "providerId"),
    (COLUMN_DATE, "rosterDate"),
    (COLUMN_NAME, "providerName"),
];

impl SchemaMapping {
    pub fn new<S: Into<String> + Clone>(entries: &[(S, S)]) -> Result<Self> {
        if entries.is_empty() {
            return Err(PipelineError::SchemaMapping(
                "mapping must have at least one column".to_string(),
            ));
        }
        let entries: Vec<(String, String)> = entries
            .iter()
            .map(|(source, target)| (source.clone().into(), target.clone().into()))
            .collect();
        for (idx, (source, target)) in entries.iter().enumerate() {
            for (other_source, other_target) in &entries[idx + 1..] {
                if source == other_source {
                    return Err(PipelineError::SchemaMapping(format!(
                        "duplicate source column '{source}'"
                    )));
                }
                if target == other_target {
                    return Err(PipelineError::SchemaMapping(format!(
                        "duplicate target column '{target}'"
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn roster_load_schema() -> Result<Self> {
        Self::new(&ROSTER_LOAD_SCHEMA)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(source, _)| source.as_str())
    }

    pub fn targets(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, target)| target.as_str()).collect()
    }
}

/// Serialize accepted rows as the loadable delimited-text artifact: header of
/// target column names, one line per row, dates as `YYYY-MM-DD`.
pub fn to_loadable_csv(records: &[NormalizedRecord], mapping: &SchemaMapping) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(mapping.targets())?;
    for record in records {
        let row: Vec<String> = mapping
            .sources()
            .map(|source| csv_value(record, source))
            .collect();
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Store {
            message: format!("failed to flush csv buffer: {e}"),
        })
}

fn csv_value(record: &NormalizedRecord, column: &str) -> String {
    match column {
        COLUMN_PROVIDER_ID => record.provider_id.clone().unwrap_or_default(),
        COLUMN_NAME => record.name.clone().unwrap_or_default(),
        COLUMN_DATE => match &record.date {
            Some(DateValue::Valid(date)) => date.format("%Y-%m-%d").to_string(),
            Some(DateValue::Invalid(text)) => text.clone(),
            None => String::new(),
        },
        other => record
            .extra
            .get(other)
            .and_then(scalar_text)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::{BTreeMap, BTreeSet};

    fn required() -> Vec<String> {
        vec![
            "provider_id".to_string(),
            "date".to_string(),
            "name".to_string(),
        ]
    }

    fn provenance() -> Provenance {
        Provenance {
            source_bucket: "plm-raw-bucket".to_string(),
            source_key: "raw/run1/export_1.jsonl".to_string(),
            ingested_at: Utc::now(),
        }
    }

    fn columns(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn complete_row(provider: &str, name: &str) -> NormalizedRecord {
        NormalizedRecord {
            provider_id: Some(provider.to_string()),
            date: Some(DateValue::Valid(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
            name: Some(name.to_string()),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn absent_column_rejects_every_row() {
        let chunk = NormalizedChunk {
            columns: columns(&["provider_id", "name"]),
            provenance: provenance(),
            rows: vec![complete_row("1", "A"), complete_row("2", "B")],
        };
        let outcome = validate_chunk(chunk, &required());
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 2);
        for rejected in &outcome.rejected {
            assert_eq!(rejected.error_reason, "missing:date;");
        }
    }

    #[test]
    fn unparsable_date_is_flagged_bad_date() {
        let mut row = complete_row("1", "A");
        row.date = Some(DateValue::Invalid("not-a-date".to_string()));
        let chunk = NormalizedChunk {
            columns: columns(&["provider_id", "date", "name"]),
            provenance: provenance(),
            rows: vec![row],
        };
        let outcome = validate_chunk(chunk, &required());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].error_reason, "bad_date;");
    }

    #[test]
    fn missing_date_and_bad_date_never_co_occur() {
        let mut row = complete_row("1", "A");
        row.date = None;
        let chunk = NormalizedChunk {
            // date column absent from the batch entirely
            columns: columns(&["provider_id", "name"]),
            provenance: provenance(),
            rows: vec![row],
        };
        let outcome = validate_chunk(chunk, &required());
        assert_eq!(outcome.rejected[0].error_reason, "missing:date;");
    }

    #[test]
    fn reasons_accumulate_in_required_field_order() {
        let row = NormalizedRecord {
            provider_id: None,
            date: Some(DateValue::Invalid("??".to_string())),
            name: None,
            extra: BTreeMap::new(),
        };
        let chunk = NormalizedChunk {
            columns: columns(&["date"]),
            provenance: provenance(),
            rows: vec![row],
        };
        let outcome = validate_chunk(chunk, &required());
        assert_eq!(
            outcome.rejected[0].error_reason,
            "missing:provider_id;bad_date;missing:name;"
        );
    }

    #[test]
    fn every_row_lands_in_exactly_one_partition() {
        let mut bad = complete_row("2", "B");
        bad.date = Some(DateValue::Invalid("nope".to_string()));
        let chunk = NormalizedChunk {
            columns: columns(&["provider_id", "date", "name"]),
            provenance: provenance(),
            rows: vec![complete_row("1", "A"), bad, complete_row("3", "C")],
        };
        let total = chunk.rows.len();
        let outcome = validate_chunk(chunk, &required());
        assert_eq!(outcome.accepted.len() + outcome.rejected.len(), total);
        assert_eq!(outcome.accepted.len(), 2);
    }

    #[test]
    fn loadable_csv_uses_target_schema() {
        let mapping = SchemaMapping::roster_load_schema().unwrap();
        let csv = to_loadable_csv(&[complete_row("1", "B")], &mapping).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "providerId,rosterDate,providerName\n1,2024-01-01,B\n"
        );
    }

    #[test]
    fn duplicate_mapping_columns_are_rejected_at_construction() {
        assert!(SchemaMapping::new(&[("a", "x"), ("a", "y")]).is_err());
        assert!(SchemaMapping::new(&[("a", "x"), ("b", "x")]).is_err());
        let empty: [(&str, &str); 0] = [];
        assert!(SchemaMapping::new(&empty).is_err());
    }

    #[test]
    fn rejected_chunk_serializes_reason_alongside_record() {
        let chunk = RejectedChunk {
            provenance: provenance(),
            rows: vec![RejectedRecord {
                record: complete_row("1", "A"),
                error_reason: "missing:date;".to_string(),
            }],
        };
        let bytes = chunk.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["rows"][0]["error_reason"], "missing:date;");
        assert_eq!(value["rows"][0]["provider_id"], "1");
    }
}
