//! Bus monitor
//!
//! Consumes the text output of a bus monitor adapter, one line per packet:
//!
//! ```text
//! R 0.024: 400010010081013700180015001A000000000000400000 CRC=87
//! ```
//!
//! Packets are decoded with [`bus_table`](crate::bus::bus_table) and merged
//! into a running [`Record`]. The main controller's status packet opens each
//! polling round; at a round start the accumulated record is emitted, but at
//! most once per flush interval.

use crate::bus::{decode_bus_message, is_round_start, ROUND_START_PREFIX};
use crate::config::MonitorConfig;
use crate::record::{Record, RecordSink};
use crate::types::{hex, DecoderError, Result};
use chrono::Utc;
use regex::Regex;
use std::io::{self, BufRead};
use std::time::{Duration, Instant};

/// One line of monitor adapter output
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorLine {
    /// A packet read from the bus
    Read { time_secs: f64, packet: Vec<u8>, crc: u8 },
    /// Adapter status in JSON, currently ignored
    Json(String),
    /// Anything else
    Other(String),
}

/// Parses adapter lines
pub struct MonitorLineParser {
    read_line: Regex,
}

impl MonitorLineParser {
    pub fn new() -> Result<Self> {
        let read_line = Regex::new(r"^R ([0-9.]+): ([0-9A-Fa-f]+) CRC=([0-9A-Fa-f]+)")
            .map_err(|e| DecoderError::MonitorLine(e.to_string()))?;
        Ok(Self { read_line })
    }

    /// Classify and parse one line
    ///
    /// An `R ` line that does not match the read format is an error.
    pub fn parse(&self, line: &str) -> Result<MonitorLine> {
        let line = line.trim_end();
        if line.starts_with("R ") {
            let caps = self
                .read_line
                .captures(line)
                .ok_or_else(|| DecoderError::MonitorLine(line.to_string()))?;
            let bad_line = || DecoderError::MonitorLine(line.to_string());

            let time_secs = caps[1].parse::<f64>().map_err(|_| bad_line())?;
            let packet = parse_hex(&caps[2]).ok_or_else(bad_line)?;
            let crc = u8::from_str_radix(&caps[3], 16).map_err(|_| bad_line())?;
            Ok(MonitorLine::Read {
                time_secs,
                packet,
                crc,
            })
        } else if line.starts_with("J ") {
            Ok(MonitorLine::Json(line[2..].to_string()))
        } else {
            Ok(MonitorLine::Other(line.to_string()))
        }
    }
}

/// Parse one line with a throwaway parser
pub fn parse_monitor_line(line: &str) -> Result<MonitorLine> {
    MonitorLineParser::new()?.parse(line)
}

fn parse_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Raw contents key for a packet: its leading bytes in hex
fn packet_key(packet: &[u8]) -> String {
    packet
        .iter()
        .take(ROUND_START_PREFIX.len())
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Accumulates decoded bus packets into records
pub struct BusMonitor {
    parser: MonitorLineParser,
    interval: Duration,
    last_flush: Instant,
    record: Option<Record>,
}

impl BusMonitor {
    /// Monitor whose flush interval starts counting at `now`
    pub fn new(config: &MonitorConfig, now: Instant) -> Result<Self> {
        Ok(Self {
            parser: MonitorLineParser::new()?,
            interval: config.interval(),
            last_flush: now,
            record: None,
        })
    }

    /// Values gathered since the last emitted record
    pub fn pending(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Handle one adapter line received at `now`
    ///
    /// Returns the previous round's record when this line starts a new round
    /// and the flush interval has elapsed.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Result<Option<Record>> {
        let packet = match self.parser.parse(line)? {
            MonitorLine::Read { packet, .. } => packet,
            MonitorLine::Json(_) => return Ok(None),
            MonitorLine::Other(other) => {
                if !other.is_empty() {
                    log::info!("Ignoring unknown monitor line: {}", other);
                }
                return Ok(None);
            }
        };

        let mut flushed = None;
        if is_round_start(&packet)
            && now.saturating_duration_since(self.last_flush) >= self.interval
        {
            flushed = self.record.take();
            self.last_flush = now;
        }

        let result = decode_bus_message(&packet);
        log::debug!("< {} ({} values)", hex(&packet), result.len());

        let record = self.record.get_or_insert_with(|| Record::new(Utc::now()));
        record.raw_contents.insert(packet_key(&packet), packet.clone());
        record.add_values(&result);

        Ok(flushed)
    }

    /// Read lines until end of input, storing every emitted record
    ///
    /// A read timeout ends the run with an error; interrupted reads are resumed.
    pub fn run<R, S>(&mut self, reader: &mut R, sink: &mut S) -> Result<()>
    where
        R: BufRead + ?Sized,
        S: RecordSink + ?Sized,
    {
        log::info!("Monitoring bus, flushing at most every {:?}", self.interval);
        let mut line = Vec::new();
        loop {
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Monitor read failed after {} byte(s) of a line: {}", line.len(), e);
                    return Err(e.into());
                }
            }
            let text = String::from_utf8_lossy(&line);
            if let Some(record) = self.handle_line(&text, Instant::now())? {
                sink.store(&record)?;
            }
            line.clear();
        }
    }
}
