//! [`BlockDriver`] implementations used to exercise the core without a real
//! block device.

use crate::driver::BlockDriver;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// An in-memory block device, for fast unit and property tests.
pub struct MemDriver {
    data: Vec<u8>,
    io_size: u64,
}

impl MemDriver {
    /// Creates a zero-initialized device of `size` bytes with the given
    /// I/O unit.
    pub fn new(size: u64, io_size: u64) -> Self {
        Self {
            data: vec![0u8; size as usize],
            io_size,
        }
    }
}

impl BlockDriver for MemDriver {
    fn device_size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn io_size(&self) -> Result<u64> {
        Ok(self.io_size)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let offset = offset as usize;
        if buf.len() as u64 != self.io_size || offset + buf.len() > self.data.len() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read past end of device",
            )));
        }
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let offset = offset as usize;
        if buf.len() as u64 != self.io_size || offset + buf.len() > self.data.len() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "write past end of device",
            )));
        }
        self.data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(())
    }
}

/// A block device backed by a regular file, for end-to-end tests that need
/// mount/unmount cycles to actually persist across separate [`Filesystem`]
/// instances.
///
/// [`Filesystem`]: crate::Filesystem
pub struct FileDriver {
    file: File,
    io_size: u64,
}

impl FileDriver {
    /// Opens `file` as a device with the given fixed I/O unit. The caller
    /// is responsible for sizing the file beforehand (e.g. with
    /// `File::set_len`).
    pub fn new(file: File, io_size: u64) -> Self {
        Self { file, io_size }
    }
}

impl BlockDriver for FileDriver {
    fn device_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn io_size(&self) -> Result<u64> {
        Ok(self.io_size)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}
