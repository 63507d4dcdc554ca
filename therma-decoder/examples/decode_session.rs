//! Standalone session decoder
//!
//! Sends every captured command to the simulated heat pump through a framer,
//! in small chunks like a slow serial line would deliver them, and prints
//! what each response decodes to.
//!
//! Usage:
//!   decode_session [definitions.h] [--chunk <bytes>]
//!
//! Example:
//!   decode_session ESPAltherma/include/def/Altherma.h --chunk 2

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use therma_decoder::{
    parse_definitions_file, serial_table, DecodeEngine, Framer, SimulatedDevice,
};

struct SessionStats {
    exchanges: usize,
    silent: usize,
    values_decoded: usize,
    empty_values: usize,
    per_page: BTreeMap<u8, usize>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            exchanges: 0,
            silent: 0,
            values_decoded: 0,
            empty_values: 0,
            per_page: BTreeMap::new(),
        }
    }

    fn print_summary(&self) {
        println!("\n=== SESSION SUMMARY ===");
        println!("Exchanges: {}", self.exchanges);
        println!("Without response: {}", self.silent);
        println!("Values decoded: {}", self.values_decoded);
        println!("Fields without value: {}", self.empty_values);
        for (page, count) in &self.per_page {
            println!("  page 0x{:02x}: {} values", page, count);
        }
    }
}

fn main() {
    let mut definitions: Option<PathBuf> = None;
    let mut chunk = 3usize;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--chunk" => {
                i += 1;
                chunk = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or_else(|| {
                        eprintln!("--chunk needs a positive number");
                        std::process::exit(1);
                    });
            }
            path => definitions = Some(PathBuf::from(path)),
        }
        i += 1;
    }

    let imported = definitions.map(|path| match parse_definitions_file(&path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Failed to load {:?}: {}", path, e);
            std::process::exit(1);
        }
    });
    let table = imported.as_ref().unwrap_or_else(|| serial_table());

    let commands: Vec<Vec<u8>> = SimulatedDevice::with_seed(0)
        .commands()
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect();

    let mut framer = Framer::new(SimulatedDevice::new());
    let mut stats = SessionStats::new();

    for command in &commands {
        for piece in command.chunks(chunk) {
            if let Err(e) = framer.write(piece) {
                eprintln!("Write failed: {}", e);
                std::process::exit(1);
            }
        }
        let response = framer.read();
        stats.exchanges += 1;

        println!(
            "> {}\n< {}",
            therma_decoder::types::hex(command),
            therma_decoder::types::hex(&response)
        );
        if response.is_empty() {
            stats.silent += 1;
            continue;
        }

        let result = DecodeEngine::decode(command, &response, table);
        for (id, field) in result.iter() {
            match field.value {
                Some(value) => {
                    stats.values_decoded += 1;
                    *stats.per_page.entry(command[command.len() - 2]).or_default() += 1;
                    println!("    {:>10}  {:<44} {}", id.to_string(), field.decoder.display_name(), value);
                }
                None => stats.empty_values += 1,
            }
        }
    }

    stats.print_summary();
}
