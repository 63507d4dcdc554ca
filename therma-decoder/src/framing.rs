//! Frame length rules and response reading
//!
//! Nothing on the wire marks where a frame ends. The length of every frame
//! follows from its leading byte(s):
//!
//! | Leading byte   | Family          | Length                 |
//! |----------------|-----------------|------------------------|
//! | `02`           | short command   | 3                      |
//! | `03`           | page read       | 4                      |
//! | `24 24 24`     | greeting `$$$`  | 3                      |
//! | `53`..=`55`    | fixed response  | 18                     |
//! | `15`           | error response  | 2                      |
//! | `40`           | page response   | 2 + byte 2             |
//!
//! Page responses carry the number of bytes following the length byte, plus
//! one, in byte 2. Everything except the greeting and error families ends in a
//! checksum byte.

use crate::checksum::calc_checksum;
use crate::device::Device;
use crate::types::{hex, DecoderError, Result};

/// The greeting frame, sent as a request and echoed as a response
pub const GREETING: &[u8] = b"$$$";

/// Frame families, identified by their leading byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `02 ..`: short command
    ShortCommand,
    /// `03 40 <page> <checksum>`: page read command
    PageRead,
    /// `$$$`
    Greeting,
    /// `53`..`55`: fixed length response
    FixedResponse,
    /// `15 ea`: error response
    Error,
    /// `40 <page> <len> ..`: page response
    PageResponse,
}

impl FrameKind {
    /// Classify a request by its leading byte
    pub fn of_request(first: u8) -> Option<Self> {
        match first {
            0x02 => Some(FrameKind::ShortCommand),
            0x03 => Some(FrameKind::PageRead),
            b'$' => Some(FrameKind::Greeting),
            _ => None,
        }
    }

    /// Classify a response by its leading byte
    pub fn of_response(first: u8) -> Option<Self> {
        match first {
            b'$' => Some(FrameKind::Greeting),
            0x53..=0x55 => Some(FrameKind::FixedResponse),
            0x15 => Some(FrameKind::Error),
            0x40 => Some(FrameKind::PageResponse),
            _ => None,
        }
    }

    /// True if frames of this kind end with a checksum that must be verified
    pub fn is_checksummed(self) -> bool {
        !matches!(self, FrameKind::Greeting | FrameKind::Error)
    }
}

/// What is known about a frame's length from the bytes seen so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    /// The frame is this many bytes long in total
    Complete(usize),
    /// This many more bytes are needed before the length is known
    NeedMore(usize),
    /// The leading bytes match no known frame
    Malformed,
}

/// Length of the request starting at `buffer[0]`
pub fn request_length(buffer: &[u8]) -> FrameLength {
    let first = match buffer.first() {
        Some(&first) => first,
        None => return FrameLength::NeedMore(1),
    };

    match FrameKind::of_request(first) {
        Some(FrameKind::ShortCommand) => FrameLength::Complete(3),
        Some(FrameKind::PageRead) => FrameLength::Complete(4),
        Some(FrameKind::Greeting) => FrameLength::Complete(GREETING.len()),
        _ => FrameLength::Malformed,
    }
}

/// Length of the response starting at `buffer[0]`
pub fn response_length(buffer: &[u8]) -> FrameLength {
    let first = match buffer.first() {
        Some(&first) => first,
        None => return FrameLength::NeedMore(1),
    };

    match FrameKind::of_response(first) {
        Some(FrameKind::Greeting) => FrameLength::Complete(GREETING.len()),
        Some(FrameKind::FixedResponse) => FrameLength::Complete(18),
        Some(FrameKind::Error) => FrameLength::Complete(2),
        Some(FrameKind::PageResponse) => match buffer.get(2) {
            None => FrameLength::NeedMore(3 - buffer.len()),
            Some(0) => FrameLength::Malformed,
            Some(&remaining) => FrameLength::Complete(2 + remaining as usize),
        },
        _ => FrameLength::Malformed,
    }
}

/// Check a complete response frame
///
/// Greeting responses must be exactly `$$$`; error responses are accepted as
/// they are; every other family must carry a valid checksum.
pub fn verify_response(frame: &[u8], request: &[u8]) -> Result<()> {
    let kind = match frame.first().and_then(|&first| FrameKind::of_response(first)) {
        Some(kind) => kind,
        None => {
            return Err(DecoderError::MalformedFrame {
                bytes: frame.to_vec(),
                request: Some(request.to_vec()),
            })
        }
    };

    if kind == FrameKind::Greeting && frame != GREETING {
        return Err(DecoderError::MalformedFrame {
            bytes: frame.to_vec(),
            request: Some(request.to_vec()),
        });
    }

    if kind.is_checksummed() {
        if let Some((&actual, contents)) = frame.split_last() {
            let expected = calc_checksum(contents);
            if expected != actual {
                return Err(DecoderError::ChecksumMismatch {
                    expected,
                    actual,
                    frame: frame.to_vec(),
                    request: request.to_vec(),
                });
            }
        }
    }

    Ok(())
}

/// Read exactly one response frame from `device` and verify it
///
/// Reads only as many bytes as the frame rules call for, so the device is
/// never asked for bytes that are not part of this response.
pub fn read_response_frame<D: Device + ?Sized>(device: &mut D, request: &[u8]) -> Result<Vec<u8>> {
    let mut frame = Vec::new();

    loop {
        match response_length(&frame) {
            FrameLength::NeedMore(count) => frame.extend(device.read(count)?),
            FrameLength::Complete(total) => {
                if frame.len() < total {
                    frame.extend(device.read(total - frame.len())?);
                }
                break;
            }
            FrameLength::Malformed => {
                return Err(DecoderError::MalformedFrame {
                    bytes: frame,
                    request: Some(request.to_vec()),
                })
            }
        }
    }

    log::debug!("< {}", hex(&frame));
    verify_response(&frame, request)?;
    Ok(frame)
}

/// Write a command to a device and read back its verified response
pub fn execute_command<D: Device + ?Sized>(device: &mut D, command: &[u8]) -> Result<Vec<u8>> {
    log::debug!("> {}", hex(command));
    device.write(command)?;
    read_response_frame(device, command)
}
