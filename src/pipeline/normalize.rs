//! Normalization of raw roster records into tabular chunks: column name
//! standardization, date coercion, and last-wins deduplication.

use crate::pipeline::chunk::{DateValue, NormalizedChunk, NormalizedRecord, Provenance};
use crate::record::RawRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub const COLUMN_PROVIDER_ID: &str = "provider_id";
pub const COLUMN_DATE: &str = "date";
pub const COLUMN_NAME: &str = "name";

/// Lower-case and map every whitespace character to an underscore.
pub fn normalize_field_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Lenient date parsing for the formats the source system emits.
pub fn parse_roster_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Some(date);
    }
    None
}

/// Build one normalized chunk from a slice of raw records.
///
/// Guarantees on the result:
/// - every column name is lower-cased with whitespace collapsed to `_`
/// - a `provider_id` column exists (null-valued where absent)
/// - the `date` column holds parsed dates; unparsable values survive as
///   [`DateValue::Invalid`] rather than failing the stage
/// - rows are deduplicated on whichever of `(provider_id, date)` are present
///   as columns, keeping the last occurrence in input order
pub fn normalize_chunk(records: &[RawRecord], provenance: Provenance) -> NormalizedChunk {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let mut row = NormalizedRecord::default();
        for (raw_name, value) in &record.fields {
            let column = normalize_field_name(raw_name);
            match column.as_str() {
                COLUMN_PROVIDER_ID => row.provider_id = scalar_text(value),
                COLUMN_DATE => row.date = coerce_date(value),
                COLUMN_NAME => row.name = scalar_text(value),
                _ => {
                    row.extra.insert(column.clone(), value.clone());
                }
            }
            columns.insert(column);
        }
        rows.push(row);
    }

    // provider_id is guaranteed as a column even when no record carried it
    columns.insert(COLUMN_PROVIDER_ID.to_string());

    let rows = dedupe_last(rows, &columns);
    NormalizedChunk {
        columns,
        provenance,
        rows,
    }
}

/// Render a scalar value as text; null stays absent.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn coerce_date(value: &Value) -> Option<DateValue> {
    let text = scalar_text(value)?;
    Some(match parse_roster_date(&text) {
        Some(date) => DateValue::Valid(date),
        None => DateValue::Invalid(text),
    })
}

/// Composite dedupe key over the columns that are actually present. Invalid
/// dates collapse to no-date, so they compare equal to each other, matching
/// how the batch behaves once invalid values are treated as missing.
type DedupeKey = (Option<Option<String>>, Option<Option<NaiveDate>>);

fn dedupe_key(row: &NormalizedRecord, on_provider: bool, on_date: bool) -> DedupeKey {
    (
        on_provider.then(|| row.provider_id.clone()),
        on_date.then(|| row.date.as_ref().and_then(DateValue::as_valid)),
    )
}

/// Keep the last row for each key, preserving the input order of survivors.
fn dedupe_last(rows: Vec<NormalizedRecord>, columns: &BTreeSet<String>) -> Vec<NormalizedRecord> {
    let on_provider = columns.contains(COLUMN_PROVIDER_ID);
    let on_date = columns.contains(COLUMN_DATE);
    if !on_provider && !on_date {
        return rows;
    }

    let mut last_index: HashMap<DedupeKey, usize> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        last_index.insert(dedupe_key(row, on_provider, on_date), idx);
    }

    rows.into_iter()
        .enumerate()
        .filter(|(idx, row)| last_index.get(&dedupe_key(row, on_provider, on_date)) == Some(idx))
        .map(|(_, row)| row)
        .collect()
}
