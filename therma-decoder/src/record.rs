//! Decoded state records and where they go
//!
//! A [`Record`] is the unit handed to persistence: the raw contents of every
//! page read (or bus packet seen) plus the decoded values, both keyed by
//! strings so the record maps directly onto JSON.

use crate::engine::DecodeResult;
use crate::types::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Heat pump state at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the state was captured
    pub timestamp: DateTime<Utc>,
    /// Raw bytes per page (serial) or packet type (bus)
    pub raw_contents: BTreeMap<String, Vec<u8>>,
    /// Decoded values keyed by stringified variable identifier
    pub variable_values: BTreeMap<String, serde_json::Value>,
}

impl Record {
    /// Empty record stamped with `timestamp`
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            raw_contents: BTreeMap::new(),
            variable_values: BTreeMap::new(),
        }
    }

    /// Add decoded values, overwriting earlier values for the same identifiers
    pub fn add_values(&mut self, result: &DecodeResult<'_>) {
        self.variable_values.extend(result.to_json_map());
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.raw_contents.is_empty() && self.variable_values.is_empty()
    }
}

/// Persistence collaborator receiving every completed record
pub trait RecordSink {
    /// Store one record
    fn store(&mut self, record: &Record) -> Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn store(&mut self, record: &Record) -> Result<()> {
        (**self).store(record)
    }
}

/// Sink keeping records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<Record>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records stored so far, oldest first
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn store(&mut self, record: &Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let timestamp = DateTime::parse_from_rfc3339("2026-01-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut record = Record::new(timestamp);
        assert!(record.is_empty());

        record.raw_contents.insert("17".to_string(), vec![2, 49]);
        record
            .variable_values
            .insert("47".to_string(), serde_json::json!(2));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["raw_contents"]["17"], serde_json::json!([2, 49]));
        assert_eq!(json["variable_values"]["47"], serde_json::json!(2));
        assert_eq!(json["timestamp"], serde_json::json!("2026-01-05T10:00:00Z"));
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.store(&Record::new(Utc::now())).unwrap();
        sink.store(&Record::new(Utc::now())).unwrap();
        assert_eq!(sink.records().len(), 2);
    }
}
