//! Simulated heat pump
//!
//! Answers commands from a list of canned responses captured from a real
//! unit. Some commands have more than one captured response; one of them is
//! picked at random for every write.

use crate::device::Device;
use crate::types::{hex, DecoderError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Captured (command, response) pairs
pub const CANNED_RESPONSES: &[(&[u8], &[u8])] = &[
    (&[2, 78, 175], &[]),
    (&[2, 83, 170], &[83, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 172]),
    (&[2, 80, 173], &[21, 234]),
    (&[2, 84, 169], &[84, 180, 26, 84, 27, 104, 33, 156, 26, 24, 53, 1, 26, 0, 0, 0, 0, 199]),
    (&[2, 85, 168], &[85, 1, 0, 0, 0, 0, 132, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 34]),
    (&[2, 84, 169], &[84, 204, 26, 84, 27, 104, 33, 156, 26, 24, 53, 1, 26, 0, 0, 0, 0, 175]),
    (&[36, 36, 36], &[21, 234]),
    (&[3, 64, 160, 28], &[21, 234]),
    (&[3, 64, 161, 27], &[21, 234]),
    (&[3, 64, 0, 188], &[64, 0, 15, 4, 1, 0, 1, 1, 1, 0, 2, 1, 1, 4, 57, 60, 43]),
    (&[3, 64, 16, 172], &[64, 16, 18, 0, 0, 0, 0, 0, 0, 72, 3, 0, 0, 0, 0, 0, 0, 0, 0, 82]),
    (&[3, 64, 17, 171], &[64, 17, 8, 2, 49, 149, 1, 2, 5, 214]),
    (&[3, 64, 32, 156], &[64, 32, 19, 205, 0, 0, 0, 24, 1, 0, 0, 190, 0, 0, 0, 255, 0, 131, 0, 1, 101]),
    (&[3, 64, 33, 155], &[64, 33, 18, 5, 0, 0, 0, 19, 0, 0, 190, 0, 0, 0, 0, 0, 0, 0, 0, 182]),
    (&[3, 64, 48, 140], &[64, 48, 13, 0, 0, 0, 194, 1, 0, 0, 0, 0, 0, 0, 191]),
    (&[3, 64, 96, 92], &[64, 96, 19, 128, 0, 64, 0, 0, 0, 71, 38, 2, 250, 0, 160, 0, 27, 242, 118, 0, 0]),
    (&[3, 64, 97, 91], &[64, 97, 18, 128, 0, 78, 1, 10, 1, 11, 1, 17, 1, 18, 2, 4, 1, 0, 0, 59]),
    (&[3, 64, 98, 90], &[64, 98, 19, 128, 0, 128, 94, 1, 210, 0, 0, 1, 253, 255, 0, 100, 0, 0, 0, 0, 184]),
    (&[3, 64, 99, 89], &[64, 99, 10, 128, 0, 1, 112, 100, 50, 21, 1, 181]),
    (&[3, 64, 100, 88], &[64, 100, 14, 128, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 203]),
    (&[3, 64, 97, 91], &[64, 97, 18, 128, 0, 79, 1, 10, 1, 11, 1, 17, 1, 18, 2, 4, 1, 0, 0, 58]),
];

/// Device answering from a fixed response list
pub struct SimulatedDevice {
    responses: Vec<(Vec<u8>, Vec<u8>)>,
    response_buffer: Vec<u8>,
    rng: StdRng,
}

impl SimulatedDevice {
    /// Simulator with the captured responses and an entropy-seeded choice
    pub fn new() -> Self {
        Self::build(Self::canned(), StdRng::from_entropy())
    }

    /// Simulator with the captured responses and a reproducible choice
    pub fn with_seed(seed: u64) -> Self {
        Self::build(Self::canned(), StdRng::seed_from_u64(seed))
    }

    /// Simulator with a custom response list
    pub fn with_responses(responses: Vec<(Vec<u8>, Vec<u8>)>, seed: u64) -> Self {
        Self::build(responses, StdRng::seed_from_u64(seed))
    }

    fn canned() -> Vec<(Vec<u8>, Vec<u8>)> {
        CANNED_RESPONSES
            .iter()
            .map(|(command, response)| (command.to_vec(), response.to_vec()))
            .collect()
    }

    fn build(responses: Vec<(Vec<u8>, Vec<u8>)>, rng: StdRng) -> Self {
        Self {
            responses,
            response_buffer: Vec::new(),
            rng,
        }
    }

    /// Commands this simulator knows, without duplicates, in list order
    pub fn commands(&self) -> Vec<&[u8]> {
        let mut commands: Vec<&[u8]> = Vec::new();
        for (command, _) in &self.responses {
            if !commands.contains(&command.as_slice()) {
                commands.push(command);
            }
        }
        commands
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for SimulatedDevice {
    /// Queue the response to `command`
    ///
    /// The previous response must have been read completely.
    fn write(&mut self, command: &[u8]) -> Result<()> {
        if !self.response_buffer.is_empty() {
            return Err(DecoderError::DeviceBusy {
                pending: self.response_buffer.len(),
            });
        }

        let candidates: Vec<&Vec<u8>> = self
            .responses
            .iter()
            .filter(|(canned, _)| canned.as_slice() == command)
            .map(|(_, response)| response)
            .collect();

        let response = candidates
            .choose(&mut self.rng)
            .ok_or_else(|| DecoderError::UnknownCommand(command.to_vec()))?;

        log::trace!("Simulator queued {} for {}", hex(response), hex(command));
        self.response_buffer = response.to_vec();
        Ok(())
    }

    /// Take `len` bytes from the front of the queued response
    ///
    /// Asking for more than is queued is an error: a real link would block
    /// forever.
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.response_buffer.len() {
            return Err(DecoderError::ReadOverrun {
                requested: len,
                available: self.response_buffer.len(),
            });
        }
        Ok(self.response_buffer.drain(..len).collect())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.response_buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::verify_checksum;
    use crate::framing::{response_length, FrameLength};

    #[test]
    fn test_canned_responses_are_well_formed() {
        for (command, response) in CANNED_RESPONSES {
            assert!(verify_checksum(command) || command == b"$$$", "{:?}", command);
            if response.is_empty() {
                continue;
            }
            assert_eq!(
                response_length(response),
                FrameLength::Complete(response.len()),
                "{:?}",
                response
            );
            if response[0] != 21 {
                assert!(verify_checksum(response), "{:?}", response);
            }
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut device = SimulatedDevice::with_seed(3);
        device.write(&[3, 64, 17, 171]).unwrap();
        assert_eq!(device.available().unwrap(), 10);
        assert_eq!(device.read(2).unwrap(), vec![64, 17]);
        assert_eq!(device.read(8).unwrap(), vec![8, 2, 49, 149, 1, 2, 5, 214]);
        assert_eq!(device.available().unwrap(), 0);
    }

    #[test]
    fn test_command_without_response() {
        let mut device = SimulatedDevice::with_seed(3);
        device.write(&[2, 78, 175]).unwrap();
        assert_eq!(device.available().unwrap(), 0);
    }

    #[test]
    fn test_read_overrun() {
        let mut device = SimulatedDevice::with_seed(3);
        device.write(&[2, 80, 173]).unwrap();
        assert!(matches!(
            device.read(3),
            Err(DecoderError::ReadOverrun { requested: 3, available: 2 })
        ));
    }

    #[test]
    fn test_busy_and_unknown() {
        let mut device = SimulatedDevice::with_seed(3);
        device.write(&[2, 80, 173]).unwrap();
        assert!(matches!(
            device.write(&[2, 80, 173]),
            Err(DecoderError::DeviceBusy { pending: 2 })
        ));

        device.read(2).unwrap();
        assert!(matches!(
            device.write(&[3, 64, 1, 187]),
            Err(DecoderError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_alternative_responses() {
        let mut device = SimulatedDevice::with_seed(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            device.write(&[3, 64, 97, 91]).unwrap();
            let response = device.read(20).unwrap();
            seen.insert(response[5]);
        }
        assert_eq!(seen, [78, 79].into_iter().collect());
    }

    #[test]
    fn test_commands_are_deduplicated() {
        let device = SimulatedDevice::with_seed(0);
        let commands = device.commands();
        assert_eq!(commands.len(), 19);
        assert_eq!(commands[0], &[2, 78, 175]);
    }
}
