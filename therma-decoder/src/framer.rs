//! Request framer
//!
//! Collects bytes arriving from a controller, in whatever chunks the serial
//! port delivers them, into complete command frames. Each complete command
//! is dispatched to a [`Device`] and its response, if any, is read back
//! frame by frame and verified.

use crate::device::Device;
use crate::framing::{read_response_frame, request_length, FrameLength};
use crate::types::{hex, DecoderError, Result};

/// Where the framer is in the request/response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Buffering bytes of the next request
    AwaitingRequest,
    /// A complete request has been taken from the buffer
    RequestComplete,
    /// Reading the device's response
    AwaitingResponse,
    /// A verified response is waiting to be read
    ResponseComplete,
}

/// Frames a raw byte stream into commands for a device
pub struct Framer<D: Device> {
    device: D,
    state: FramerState,
    request_buffer: Vec<u8>,
    response_buffer: Vec<u8>,
    last_request: Vec<u8>,
}

impl<D: Device> Framer<D> {
    /// Create a framer in front of `device`
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: FramerState::AwaitingRequest,
            request_buffer: Vec::new(),
            response_buffer: Vec::new(),
            last_request: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Bytes of an incomplete request buffered so far
    pub fn pending_request(&self) -> &[u8] {
        &self.request_buffer
    }

    /// The device behind this framer
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device behind this framer, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the framer, returning its device
    pub fn into_device(self) -> D {
        self.device
    }

    /// Buffer received bytes, dispatching every request they complete
    ///
    /// Returns how many more bytes the next request needs (0 when the buffer
    /// ended exactly on a request boundary), so callers can size their next
    /// serial read.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Err(DecoderError::EmptyWrite);
        }

        let pending = self.device.available()?;
        if pending > 0 {
            return Err(DecoderError::DeviceBusy { pending });
        }

        self.request_buffer.extend_from_slice(bytes);
        log::trace!("Request buffer: {}", hex(&self.request_buffer));

        loop {
            if self.request_buffer.is_empty() {
                self.state = self.idle_state();
                return Ok(0);
            }

            let total = match request_length(&self.request_buffer) {
                FrameLength::Complete(total) => total,
                FrameLength::NeedMore(count) => return Ok(count),
                FrameLength::Malformed => {
                    return Err(DecoderError::MalformedFrame {
                        bytes: self.request_buffer.clone(),
                        request: None,
                    })
                }
            };

            if self.request_buffer.len() < total {
                self.state = FramerState::AwaitingRequest;
                return Ok(total - self.request_buffer.len());
            }

            let request: Vec<u8> = self.request_buffer.drain(..total).collect();
            self.state = FramerState::RequestComplete;
            self.dispatch(request)?;
        }
    }

    fn dispatch(&mut self, request: Vec<u8>) -> Result<()> {
        log::debug!("> {}", hex(&request));
        self.device.write(&request)?;

        if self.device.available()? > 0 {
            self.state = FramerState::AwaitingResponse;
            let response = read_response_frame(&mut self.device, &request)?;
            self.response_buffer.extend_from_slice(&response);
        }

        self.last_request = request;
        self.state = self.idle_state();
        Ok(())
    }

    fn idle_state(&self) -> FramerState {
        if self.response_buffer.is_empty() {
            FramerState::AwaitingRequest
        } else {
            FramerState::ResponseComplete
        }
    }

    /// Take every response byte collected so far
    ///
    /// Never blocks and never fails: returns an empty vector if nothing has
    /// arrived. A response the device produced late is collected first; if it
    /// cannot be read as a valid frame it is logged and dropped.
    pub fn read(&mut self) -> Vec<u8> {
        match self.device.available() {
            Ok(0) => {}
            Ok(_) => match read_response_frame(&mut self.device, &self.last_request) {
                Ok(late) => self.response_buffer.extend_from_slice(&late),
                Err(e) => log::error!("Dropping late response to {}: {}", hex(&self.last_request), e),
            },
            Err(e) => log::error!("Failed to poll device: {}", e),
        }

        self.state = FramerState::AwaitingRequest;
        std::mem::take(&mut self.response_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedDevice;

    #[test]
    fn test_whole_request() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert_eq!(framer.write(&[3, 64, 17, 171]).unwrap(), 0);
        assert_eq!(framer.state(), FramerState::ResponseComplete);
        assert_eq!(framer.read(), vec![64, 17, 8, 2, 49, 149, 1, 2, 5, 214]);
        assert_eq!(framer.state(), FramerState::AwaitingRequest);
    }

    #[test]
    fn test_split_request_reports_remaining() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert_eq!(framer.write(&[3]).unwrap(), 3);
        assert_eq!(framer.write(&[64, 33]).unwrap(), 1);
        assert_eq!(framer.state(), FramerState::AwaitingRequest);
        assert!(framer.read().is_empty());
        assert_eq!(framer.write(&[155]).unwrap(), 0);
        assert_eq!(&framer.read()[..2], &[64, 33]);
    }

    #[test]
    fn test_several_requests_in_one_write() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert_eq!(framer.write(&[2, 80, 173, 36, 36, 36, 3, 64]).unwrap(), 2);
        assert_eq!(framer.pending_request(), &[3, 64]);
        assert_eq!(framer.read(), vec![21, 234, 21, 234]);
    }

    #[test]
    fn test_request_without_response() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert_eq!(framer.write(&[2, 78, 175]).unwrap(), 0);
        assert_eq!(framer.state(), FramerState::AwaitingRequest);
        assert!(framer.read().is_empty());
    }

    #[test]
    fn test_read_when_idle_is_empty() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert!(framer.read().is_empty());
        assert!(framer.read().is_empty());
    }

    #[test]
    fn test_errors() {
        let mut framer = Framer::new(SimulatedDevice::with_seed(5));
        assert!(matches!(framer.write(&[]), Err(DecoderError::EmptyWrite)));
        assert!(matches!(
            framer.write(&[0x40, 1]),
            Err(DecoderError::MalformedFrame { request: None, .. })
        ));
    }

    #[test]
    fn test_busy_device() {
        let mut device = SimulatedDevice::with_seed(5);
        device.write(&[2, 80, 173]).unwrap();
        let mut framer = Framer::new(device);
        assert!(matches!(
            framer.write(&[3]),
            Err(DecoderError::DeviceBusy { pending: 2 })
        ));
    }

    #[test]
    fn test_bad_checksum_names_request() {
        let device = SimulatedDevice::with_responses(
            vec![(vec![3, 64, 17, 171], vec![64, 17, 2, 0])],
            5,
        );
        let mut framer = Framer::new(device);
        match framer.write(&[3, 64, 17, 171]) {
            Err(DecoderError::ChecksumMismatch { request, frame, .. }) => {
                assert_eq!(request, vec![3, 64, 17, 171]);
                assert_eq!(frame, vec![64, 17, 2, 0]);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }
}
