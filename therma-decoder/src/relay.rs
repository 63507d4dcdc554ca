//! Device simulator loop
//!
//! Reads whatever a controller sends on a port, feeds it through a
//! [`Framer`] and writes the device's responses back to the port.

use crate::device::Device;
use crate::framer::Framer;
use crate::link::Link;
use crate::types::Result;

/// Serve one chunk of incoming bytes
///
/// Returns the number of bytes received, which is 0 when the port timed out
/// with nothing to read.
pub fn serve_once<L, D>(port: &mut L, framer: &mut Framer<D>, buf: &mut [u8]) -> Result<usize>
where
    L: Link + ?Sized,
    D: Device,
{
    let received = port.receive(buf)?;
    if received > 0 {
        framer.write(&buf[..received])?;
    }

    let response = framer.read();
    if !response.is_empty() {
        port.send(&response)?;
    }
    Ok(received)
}

/// Serve a port until an error occurs
pub fn serve<L, D>(port: &mut L, framer: &mut Framer<D>) -> Result<()>
where
    L: Link + ?Sized,
    D: Device,
{
    log::info!("Serving requests");
    let mut buf = [0u8; 10];
    loop {
        serve_once(port, framer, &mut buf)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedDevice;
    use crate::types::DecoderError;
    use std::collections::VecDeque;

    /// Port fed from a script of incoming chunks, recording what is sent back
    #[derive(Default)]
    struct ScriptedPort {
        incoming: VecDeque<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Link for ScriptedPort {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.incoming.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(DecoderError::IoError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "script finished",
                ))),
            }
        }

        fn bytes_available(&mut self) -> Result<usize> {
            Ok(self.incoming.front().map_or(0, Vec::len))
        }
    }

    #[test]
    fn test_serve_once_answers_complete_requests() {
        let mut port = ScriptedPort {
            incoming: vec![vec![36, 36], vec![36, 3, 64, 17], vec![], vec![171]].into(),
            ..Default::default()
        };
        let mut framer = Framer::new(SimulatedDevice::with_seed(2));
        let mut buf = [0u8; 10];

        assert_eq!(serve_once(&mut port, &mut framer, &mut buf).unwrap(), 2);
        assert!(port.sent.is_empty());
        assert_eq!(serve_once(&mut port, &mut framer, &mut buf).unwrap(), 4);
        assert_eq!(port.sent, vec![21, 234]);
        assert_eq!(serve_once(&mut port, &mut framer, &mut buf).unwrap(), 0);
        assert_eq!(serve_once(&mut port, &mut framer, &mut buf).unwrap(), 1);
        assert_eq!(&port.sent[2..], &[64, 17, 8, 2, 49, 149, 1, 2, 5, 214]);
    }

    #[test]
    fn test_serve_stops_on_error() {
        let mut port = ScriptedPort {
            incoming: vec![vec![3, 64, 33, 155]].into(),
            ..Default::default()
        };
        let mut framer = Framer::new(SimulatedDevice::with_seed(2));
        assert!(matches!(
            serve(&mut port, &mut framer),
            Err(DecoderError::IoError(_))
        ));
        assert_eq!(port.sent.len(), 20);
    }
}
