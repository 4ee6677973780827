//! The block-device abstraction and the read-modify-write adapter built on
//! top of it.
//!
//! A [`BlockDriver`] stands in for the external driver described by the
//! system this crate implements: something that can report its size and
//! I/O unit, and transfer exactly one I/O unit per call. [`DriverIo`] hides
//! that fixed-unit constraint behind arbitrary byte-range reads and writes,
//! the way the filesystem layers above it expect.

use crate::error::Result;
use log::trace;

/// A byte-addressable block device with a fixed I/O transfer unit.
///
/// Implementations are expected to already be open when handed to
/// [`crate::Filesystem::mount`]; there is no `open`/`close` pair in this
/// trait, since Rust expresses "closed" as "dropped".
pub trait BlockDriver {
    /// Total size of the device in bytes.
    fn device_size(&self) -> Result<u64>;

    /// The device's fixed I/O transfer unit, in bytes. Every [`read_at`]
    /// and [`write_at`] call transfers exactly this many bytes.
    ///
    /// [`read_at`]: BlockDriver::read_at
    /// [`write_at`]: BlockDriver::write_at
    fn io_size(&self) -> Result<u64>;

    /// Reads exactly one I/O unit at `offset`, which must be a multiple of
    /// [`io_size`](BlockDriver::io_size). `buf.len()` must equal `io_size()`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes exactly one I/O unit at `offset`, which must be a multiple of
    /// [`io_size`](BlockDriver::io_size). `buf.len()` must equal `io_size()`.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;
}

/// Rounds `value` down to the nearest multiple of `round`.
fn round_down(value: u64, round: u64) -> u64 {
    (value / round) * round
}

/// Rounds `value` up to the nearest multiple of `round`.
fn round_up(value: u64, round: u64) -> u64 {
    round_down(value + round - 1, round)
}

/// Adapts an arbitrary byte range read/write onto a [`BlockDriver`] whose
/// transfers must be aligned to, and sized as, a single I/O unit.
pub struct DriverIo<D> {
    driver: D,
    io_size: u64,
}

impl<D: BlockDriver> DriverIo<D> {
    /// Wraps `driver`, caching its I/O size for the lifetime of the adapter.
    pub fn new(driver: D) -> Result<Self> {
        let io_size = driver.io_size()?;
        Ok(Self { driver, io_size })
    }

    /// The driver's fixed I/O unit, in bytes.
    pub fn io_size(&self) -> u64 {
        self.io_size
    }

    /// The device's total size, in bytes.
    pub fn device_size(&self) -> Result<u64> {
        self.driver.device_size()
    }

    /// Reads `buf.len()` bytes starting at `offset`, neither of which need
    /// be aligned to the driver's I/O unit.
    pub fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let aligned_off = round_down(offset, self.io_size);
        let bias = offset - aligned_off;
        let aligned_size = round_up(bias + buf.len() as u64, self.io_size);

        let mut scratch = vec![0u8; aligned_size as usize];
        let mut cur = aligned_off;
        for chunk in scratch.chunks_mut(self.io_size as usize) {
            self.driver.read_at(cur, chunk)?;
            cur += self.io_size;
        }

        let bias = bias as usize;
        buf.copy_from_slice(&scratch[bias..bias + buf.len()]);
        trace!("driver_read offset={offset} size={}", buf.len());
        Ok(())
    }

    /// Writes `buf` starting at `offset`, neither of which need be aligned
    /// to the driver's I/O unit. Implemented as a read-modify-write of the
    /// aligned window so partial I/O units are preserved.
    pub fn write(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let aligned_off = round_down(offset, self.io_size);
        let bias = offset - aligned_off;
        let aligned_size = round_up(bias + buf.len() as u64, self.io_size);

        let mut scratch = vec![0u8; aligned_size as usize];
        let mut cur = aligned_off;
        for chunk in scratch.chunks_mut(self.io_size as usize) {
            self.driver.read_at(cur, chunk)?;
            cur += self.io_size;
        }

        let bias = bias as usize;
        scratch[bias..bias + buf.len()].copy_from_slice(buf);

        let mut cur = aligned_off;
        for chunk in scratch.chunks(self.io_size as usize) {
            self.driver.write_at(cur, chunk)?;
            cur += self.io_size;
        }
        trace!("driver_write offset={offset} size={}", buf.len());
        Ok(())
    }
}
