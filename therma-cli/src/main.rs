//! Altherma CLI Application
//!
//! Command-line front end for the therma-decoder library. It adds what the
//! library leaves out:
//! - Serial port access
//! - TOML configuration merged with command-line flags
//! - Logging setup
//! - JSON-lines output of polled and monitored records

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use therma_decoder::{
    parse_definitions_file, serial_table, serve, BusMonitor, DecodeEngine, DecoderTable, Device,
    Framer, LinkDevice, Poller, SimulatedDevice,
};

mod config;
mod output;
mod serial;

use config::{AppConfig, Parity};
use serial::{open_port, SerialPortLink};

/// Command/response protocol line settings
const SERIAL_BAUD: u32 = 9600;
const SERIAL_PARITY: Parity = Parity::Even;

/// Bus monitor adapter line settings
const MONITOR_BAUD: u32 = 115200;
const MONITOR_PARITY: Parity = Parity::None;

/// Altherma - Talk to, impersonate and listen to Daikin Altherma heat pumps
#[derive(Parser, Debug)]
#[command(name = "therma-cli")]
#[command(about = "Decode the Daikin Altherma serial protocol", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the heat pump at a fixed interval and write one record per cycle
    Poll {
        /// Serial port connected to the heat pump
        #[arg(short, long)]
        port: Option<String>,

        /// Poll the built-in simulator instead of a serial port
        #[arg(long, conflicts_with = "port")]
        simulated: bool,

        /// Register definitions file (default: built-in table)
        #[arg(short, long, value_name = "FILE")]
        definitions: Option<PathBuf>,

        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many polls
        #[arg(long)]
        cycles: Option<u64>,

        /// JSON-lines output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Answer requests arriving on a serial port like a heat pump would
    Simulate {
        /// Serial port the controller is connected to
        #[arg(short, long)]
        port: Option<String>,

        /// Forward requests to a real heat pump on this port instead of using canned responses
        #[arg(long, value_name = "PORT")]
        passthrough: Option<String>,
    },

    /// Record bus state from a monitor adapter
    Monitor {
        /// Serial port the monitor adapter is connected to
        #[arg(short, long)]
        port: Option<String>,

        /// Read adapter output from a capture file instead
        #[arg(long, value_name = "FILE", conflicts_with = "port")]
        replay: Option<PathBuf>,

        /// Minimum seconds between records
        #[arg(short, long)]
        interval: Option<u64>,

        /// JSON-lines output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check a decoder table for overlapping or ambiguous decoders
    Validate {
        /// Register definitions file (default: built-in table)
        #[arg(short, long, value_name = "FILE")]
        definitions: Option<PathBuf>,
    },

    /// Decode a single request/response pair given in hex
    Decode {
        /// Request bytes, e.g. "03 40 21 9b"
        command: String,

        /// Response bytes
        response: String,

        /// Register definitions file (default: built-in table)
        #[arg(short, long, value_name = "FILE")]
        definitions: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Altherma CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", therma_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    match args.command {
        Command::Poll {
            port,
            simulated,
            definitions,
            interval,
            cycles,
            output,
        } => {
            let mut config = config;
            if let Some(secs) = interval {
                config.poll.interval_secs = secs;
            }
            if cycles.is_some() {
                config.poll.max_cycles = cycles;
            }
            config.validate()?;
            let definitions = definitions.or_else(|| config.decoding.definitions.clone());
            let output = output.or_else(|| config.output.path.clone());
            poll_mode(&config, port.as_deref(), simulated, definitions.as_deref(), output.as_deref())
        }
        Command::Simulate { port, passthrough } => {
            simulate_mode(&config, port.as_deref(), passthrough.as_deref())
        }
        Command::Monitor {
            port,
            replay,
            interval,
            output,
        } => {
            let mut config = config;
            if let Some(secs) = interval {
                config.monitor.interval_secs = secs;
            }
            let output = output.or_else(|| config.output.path.clone());
            monitor_mode(&config, port.as_deref(), replay.as_deref(), output.as_deref())
        }
        Command::Validate { definitions } => {
            let definitions = definitions.or_else(|| config.decoding.definitions.clone());
            validate_mode(definitions.as_deref())
        }
        Command::Decode {
            command,
            response,
            definitions,
        } => {
            let definitions = definitions.or_else(|| config.decoding.definitions.clone());
            decode_mode(&command, &response, definitions.as_deref())
        }
    }
}

/// Import a definitions file if one is given
fn load_definitions(path: Option<&Path>) -> Result<Option<DecoderTable>> {
    let Some(path) = path else {
        let stats = serial_table().stats();
        log::info!(
            "Using built-in table: {} pages, {} decoders",
            stats.num_prefixes,
            stats.num_decoders
        );
        return Ok(None);
    };

    let table = parse_definitions_file(path)
        .with_context(|| format!("Failed to load definitions: {:?}", path))?;
    Ok(Some(table))
}

/// Serial device on the far end of a port, with poll timing
fn open_device(config: &AppConfig, port: Option<&str>) -> Result<LinkDevice<SerialPortLink>> {
    let settings = config.link.resolve(port, SERIAL_BAUD, SERIAL_PARITY)?;
    let port = open_port(&settings, config.poll.read_timeout())?;
    Ok(LinkDevice::new(
        SerialPortLink::new(port),
        config.poll.read_timeout(),
        config.poll.response_wait(),
    ))
}

/// Poll mode - read every page at a fixed interval
fn poll_mode(
    config: &AppConfig,
    port: Option<&str>,
    simulated: bool,
    definitions: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let imported = load_definitions(definitions)?;
    let table = imported.as_ref().unwrap_or_else(|| serial_table());

    let mut device: Box<dyn Device> = if simulated {
        Box::new(SimulatedDevice::new())
    } else {
        Box::new(open_device(config, port)?)
    };
    let mut sink = output::open_sink(output)?;

    let poller = Poller::new(table, config.poll.clone());
    let cycles = poller.run(&mut device, &mut sink)?;
    log::info!("Finished after {} polls", cycles);
    Ok(())
}

/// Simulate mode - serve a controller from canned responses or a real heat pump
fn simulate_mode(config: &AppConfig, port: Option<&str>, passthrough: Option<&str>) -> Result<()> {
    let settings = config.link.resolve(port, SERIAL_BAUD, SERIAL_PARITY)?;
    let mut controller = SerialPortLink::new(open_port(&settings, config.poll.read_timeout())?);

    let device: Box<dyn Device> = match passthrough {
        Some(name) => {
            log::info!("Forwarding requests to {}", name);
            Box::new(open_device(config, Some(name))?)
        }
        None => Box::new(SimulatedDevice::new()),
    };

    let mut framer = Framer::new(device);
    serve(&mut controller, &mut framer)?;
    Ok(())
}

/// Monitor mode - turn bus monitor output into records
fn monitor_mode(
    config: &AppConfig,
    port: Option<&str>,
    replay: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let mut sink = output::open_sink(output)?;
    let mut monitor = BusMonitor::new(&config.monitor, Instant::now())?;

    match replay {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open capture: {:?}", path))?;
            monitor.run(&mut BufReader::new(file), &mut sink)?;
        }
        None => {
            let settings = config.link.resolve(port, MONITOR_BAUD, MONITOR_PARITY)?;
            let port = open_port(&settings, Duration::from_secs(5))?;
            monitor.run(&mut BufReader::new(port), &mut sink)?;
        }
    }
    Ok(())
}

/// Validate mode - report every table issue
fn validate_mode(definitions: Option<&Path>) -> Result<()> {
    let imported = load_definitions(definitions)?;
    let table = imported.as_ref().unwrap_or_else(|| serial_table());

    let stats = table.stats();
    println!("Pages:    {}", stats.num_prefixes);
    println!("Decoders: {}", stats.num_decoders);

    let issues = therma_decoder::validate_table(table);
    if issues.is_empty() {
        println!("No issues found");
        return Ok(());
    }
    for issue in &issues {
        println!("  {}", issue);
    }
    bail!("{} issue(s) found", issues.len())
}

/// Decode mode - decode one exchange and print the values
fn decode_mode(command: &str, response: &str, definitions: Option<&Path>) -> Result<()> {
    let command = parse_hex_arg(command).context("Invalid command bytes")?;
    let response = parse_hex_arg(response).context("Invalid response bytes")?;

    let imported = load_definitions(definitions)?;
    let table = imported.as_ref().unwrap_or_else(|| serial_table());

    let result = DecodeEngine::decode(&command, &response, table);
    if result.is_empty() {
        println!("No decoders match {}", therma_decoder::types::hex(&command));
        return Ok(());
    }
    for (id, field) in result.iter() {
        let value = field
            .value
            .map_or_else(|| "-".to_string(), |value| value.to_string());
        println!("{:>10}  {:<44} {}", id.to_string(), field.decoder.display_name(), value);
    }
    Ok(())
}

/// Parse hex bytes, ignoring whitespace and an optional 0x prefix
fn parse_hex_arg(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        bail!("Bad hex digit {:?} in {:?}", bad, text);
    }
    if digits.len() % 2 != 0 {
        bail!("Odd number of hex digits in {:?}", text);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Bad hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
