//! Byte links
//!
//! A [`Link`] is a raw, unframed byte channel such as a serial port. This
//! module adapts links to the [`Device`] contract and back:
//!
//! - [`LinkDevice`] talks to a real unit on the far end of a link (the
//!   passthrough device).
//! - [`FramerLink`] presents a [`Framer`] as a link, so passthrough code can be
//!   exercised against a simulator without hardware.

use crate::device::Device;
use crate::framer::Framer;
use crate::types::{hex, DecoderError, Result};
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

/// Raw byte channel
pub trait Link {
    /// Write all of `bytes`
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most the link's own timeout
    ///
    /// Returns 0 when nothing arrived in time.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Bytes that can be received without waiting
    fn bytes_available(&mut self) -> Result<usize>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(buf)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(buf)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }
}

/// Device on the far end of a link
pub struct LinkDevice<L: Link> {
    link: L,
    read_timeout: Duration,
    response_wait: Duration,
    awaiting_response: bool,
}

impl<L: Link> LinkDevice<L> {
    /// Wrap a link with the given read timeout and response wait
    pub fn new(link: L, read_timeout: Duration, response_wait: Duration) -> Self {
        Self {
            link,
            read_timeout,
            response_wait,
            awaiting_response: false,
        }
    }

    /// The underlying link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the device, returning its link
    pub fn into_link(self) -> L {
        self.link
    }
}

impl<L: Link> Device for LinkDevice<L> {
    fn write(&mut self, command: &[u8]) -> Result<()> {
        log::trace!("Link send: {}", hex(command));
        self.link.send(command)?;
        self.awaiting_response = true;
        Ok(())
    }

    /// Read exactly `len` bytes, failing once the read timeout has elapsed
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.read_timeout;
        let mut received = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let count = self.link.receive(&mut received[filled..])?;
            filled += count;
            if count == 0 {
                if Instant::now() >= deadline {
                    return Err(DecoderError::Timeout {
                        requested: len,
                        received: filled,
                    });
                }
                thread::sleep(Duration::from_millis(1));
            }
        }

        self.awaiting_response = false;
        Ok(received)
    }

    /// Bytes waiting on the link
    ///
    /// Right after a write, waits up to the response wait for the first
    /// bytes of a response to arrive.
    fn available(&mut self) -> Result<usize> {
        let available = self.link.bytes_available()?;
        if available > 0 || !self.awaiting_response {
            return Ok(available);
        }

        let deadline = Instant::now() + self.response_wait;
        while Instant::now() < deadline {
            let available = self.link.bytes_available()?;
            if available > 0 {
                return Ok(available);
            }
            thread::sleep(Duration::from_millis(5));
        }

        self.awaiting_response = false;
        self.link.bytes_available()
    }
}

/// A framer in front of a device, presented as a link
pub struct FramerLink<D: Device> {
    framer: Framer<D>,
    incoming: VecDeque<u8>,
}

impl<D: Device> FramerLink<D> {
    /// Wrap a framer
    pub fn new(framer: Framer<D>) -> Self {
        Self {
            framer,
            incoming: VecDeque::new(),
        }
    }

    /// The wrapped framer
    pub fn framer(&self) -> &Framer<D> {
        &self.framer
    }

    fn collect(&mut self) {
        self.incoming.extend(self.framer.read());
    }
}

impl<D: Device> Link for FramerLink<D> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.framer.write(bytes)?;
        self.collect();
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.incoming.is_empty() {
            self.collect();
        }
        let count = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.collect();
        Ok(self.incoming.len())
    }
}
