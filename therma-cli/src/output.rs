//! JSON-lines record output

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use therma_decoder::{Record, RecordSink};

/// Writes each record as one line of JSON
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn store(&mut self, record: &Record) -> therma_decoder::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        log::debug!(
            "Stored record with {} values",
            record.variable_values.len()
        );
        Ok(())
    }
}

/// Sink appending to `path`, or writing to stdout if no path is given
pub fn open_sink(path: Option<&Path>) -> Result<JsonLinesSink<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open output file: {:?}", path))?;
            log::info!("Appending records to {:?}", path);
            Box::new(file)
        }
        None => Box::new(io::stdout()),
    };
    Ok(JsonLinesSink::new(writer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let mut record = Record::new(Utc::now());
        record
            .variable_values
            .insert("21".to_string(), serde_json::json!(6.0));
        sink.store(&record).unwrap();
        sink.store(&Record::new(Utc::now())).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Record = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        for _ in 0..2 {
            let mut sink = open_sink(Some(&path)).unwrap();
            sink.store(&Record::new(Utc::now())).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
