//! Serial port link

use crate::config::{Parity, PortSettings};
use anyhow::{Context, Result};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use therma_decoder::Link;

/// Open a serial port with the given settings and per-read timeout
pub fn open_port(settings: &PortSettings, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let parity = match settings.parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    };

    log::info!(
        "Opening {} at {} baud, {:?} parity",
        settings.port,
        settings.baud_rate,
        settings.parity
    );
    serialport::new(&settings.port, settings.baud_rate)
        .parity(parity)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .timeout(timeout)
        .open()
        .with_context(|| format!("Failed to open serial port {}", settings.port))
}

/// [`Link`] over an open serial port
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Link for SerialPortLink {
    fn send(&mut self, bytes: &[u8]) -> therma_decoder::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> therma_decoder::Result<usize> {
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn bytes_available(&mut self) -> therma_decoder::Result<usize> {
        let count = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(count as usize)
    }
}
