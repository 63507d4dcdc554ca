//! Serial poller
//!
//! Reads every page named by a decoder table from a device at a fixed
//! interval and hands one [`Record`] per cycle to a [`RecordSink`].

use crate::checksum::with_checksum;
use crate::config::PollerConfig;
use crate::device::Device;
use crate::engine::DecodeEngine;
use crate::framing::execute_command;
use crate::record::{Record, RecordSink};
use crate::table::DecoderTable;
use crate::types::Result;
use chrono::Utc;
use std::thread;

/// Header bytes (sender, page, length) in front of a page response's data
const PAGE_HEADER_LEN: usize = 3;

/// Read every page in `table` once
///
/// Raw contents are keyed by the page number (the last prefix byte) and hold
/// the response data without header and checksum; error replies leave an
/// empty entry.
pub fn poll_once<D: Device + ?Sized>(device: &mut D, table: &DecoderTable) -> Result<Record> {
    let mut record = Record::new(Utc::now());

    for prefix in table.prefixes() {
        let command = with_checksum(prefix);
        let response = execute_command(device, &command)?;

        let data = response
            .len()
            .checked_sub(1)
            .and_then(|end| response.get(PAGE_HEADER_LEN..end))
            .unwrap_or(&[]);
        let page = prefix.last().copied().unwrap_or_default();
        record.raw_contents.insert(page.to_string(), data.to_vec());

        let result = DecodeEngine::decode(&command, &response, table);
        record.add_values(&result);
    }

    log::debug!(
        "Polled {} pages, {} values",
        record.raw_contents.len(),
        record.variable_values.len()
    );
    Ok(record)
}

/// Polls a device repeatedly
pub struct Poller<'t> {
    table: &'t DecoderTable,
    config: PollerConfig,
}

impl<'t> Poller<'t> {
    pub fn new(table: &'t DecoderTable, config: PollerConfig) -> Self {
        Self { table, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Sleep, poll, store; repeat until an error or the configured cycle limit
    ///
    /// Returns the number of cycles completed.
    pub fn run<D, S>(&self, device: &mut D, sink: &mut S) -> Result<u64>
    where
        D: Device + ?Sized,
        S: RecordSink + ?Sized,
    {
        let stats = self.table.stats();
        log::info!(
            "Polling {} pages ({} decoders) every {:?}",
            stats.num_prefixes,
            stats.num_decoders,
            self.config.interval()
        );

        let mut cycles = 0;
        while self.config.max_cycles.map_or(true, |max| cycles < max) {
            thread::sleep(self.config.interval());
            let record = poll_once(device, self.table)?;
            sink.store(&record)?;
            cycles += 1;
        }
        Ok(cycles)
    }
}
