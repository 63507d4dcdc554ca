//! Device abstraction
//!
//! A device accepts complete command frames and hands back response bytes on
//! request. The caller must know how many bytes to ask for (see
//! [`crate::framing`]): a device has no way to say where a response ends.

use crate::types::Result;

/// Something that answers command frames
pub trait Device {
    /// Send one complete command frame
    fn write(&mut self, command: &[u8]) -> Result<()>;

    /// Read exactly `len` response bytes
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Number of response bytes ready to be read
    ///
    /// Not every command has a response, so this can be zero right after a
    /// write.
    fn available(&mut self) -> Result<usize>;
}

impl<D: Device + ?Sized> Device for &mut D {
    fn write(&mut self, command: &[u8]) -> Result<()> {
        (**self).write(command)
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        (**self).read(len)
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn write(&mut self, command: &[u8]) -> Result<()> {
        (**self).write(command)
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        (**self).read(len)
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }
}
