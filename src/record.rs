use serde_json::{Map, Value};

/// Field under which an unparsable line is preserved verbatim.
pub const RAW_PASSTHROUGH_FIELD: &str = "_raw";

/// One line of a raw roster object: an open mapping of field name to value.
/// Lines that fail to parse as a JSON object are preserved under
/// [`RAW_PASSTHROUGH_FIELD`] instead of failing the read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn from_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => Self { fields },
            _ => Self::passthrough(line),
        }
    }

    pub fn passthrough(line: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(
            RAW_PASSTHROUGH_FIELD.to_string(),
            Value::String(line.to_string()),
        );
        Self { fields }
    }

    pub fn is_passthrough(&self) -> bool {
        self.fields.len() == 1 && self.fields.contains_key(RAW_PASSTHROUGH_FIELD)
    }
}

/// Lazily decode newline-delimited records. Blank lines are skipped; nothing
/// in here can fail.
pub fn raw_records(text: &str) -> impl Iterator<Item = RawRecord> + '_ {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(RawRecord::from_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_object_lines() {
        let records: Vec<_> =
            raw_records("{\"Provider ID\":\"1\",\"Name\":\"A\"}\n{\"Name\":\"B\"}").collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["Provider ID"], json!("1"));
        assert_eq!(records[1].fields["Name"], json!("B"));
    }

    #[test]
    fn skips_blank_lines() {
        let records: Vec<_> = raw_records("\n{\"a\":1}\n   \n\n{\"b\":2}\n").collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_line_becomes_passthrough() {
        let records: Vec<_> = raw_records("not json at all").collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_passthrough());
        assert_eq!(
            records[0].fields[RAW_PASSTHROUGH_FIELD],
            json!("not json at all")
        );
    }

    #[test]
    fn non_object_json_becomes_passthrough() {
        let records: Vec<_> = raw_records("[1,2,3]\n42").collect();
        assert!(records.iter().all(RawRecord::is_passthrough));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(raw_records("").count(), 0);
    }
}
