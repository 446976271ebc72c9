//! Flash operation engine
//!
//! Executes erase/program/read against one device using a resolved
//! [`DeviceProfile`]. Every operation validates its range against the
//! profile before the first bus transaction, splits the work into
//! device- and bus-sized chunks, and waits out the device busy flag after
//! each destructive command.

use crate::bus::FlashBus;
use crate::error::OperationError;
use crate::profile::DeviceProfile;
use crate::protocol::{self, PollError};
use crate::spi::AddressWidth;

/// Value every byte holds after a successful erase
pub const ERASED_VALUE: u8 = 0xFF;

/// Chunk size for read-back verification
const VERIFY_CHUNK: usize = 4096;

/// Busy-poll pacing for destructive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status reads, in microseconds
    pub interval_us: u32,
    /// Total budget per erase block or program page, in microseconds.
    /// Zero means poll without bound.
    pub timeout_us: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_us: 100,
            timeout_us: 1_000_000,
        }
    }
}

/// A byte range in the device address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    /// Start offset in bytes
    pub offset: u32,
    /// Length in bytes
    pub len: u32,
}

impl AddressRange {
    /// Create a range from start offset and length
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// One past the last byte, widened so `offset + len` cannot wrap
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.len as u64
    }
}

/// Operation engine bound to one device
///
/// Owns the bus for its chip-select; the profile is fixed at construction.
pub struct FlashEngine<B: FlashBus> {
    bus: B,
    profile: DeviceProfile,
    poll: PollConfig,
    addr_width: AddressWidth,
}

impl<B: FlashBus> FlashEngine<B> {
    /// Create an engine from a bus and a resolved profile
    ///
    /// The address width is fixed here from the profile geometry, so every
    /// subsequent command encodes addresses consistently.
    pub fn new(bus: B, profile: DeviceProfile) -> Self {
        let addr_width = AddressWidth::for_density(profile.total_size);
        Self {
            bus,
            profile,
            poll: PollConfig::default(),
            addr_width,
        }
    }

    /// Replace the busy-poll pacing
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// The resolved profile this engine operates under
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Access the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the engine, returning the bus
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// The byte value erased regions read back as
    pub const fn erased_value(&self) -> u8 {
        ERASED_VALUE
    }

    /// Check whether the device currently reports busy
    pub fn is_busy(&mut self) -> Result<bool, OperationError> {
        let status = protocol::read_status(&mut self.bus, &self.profile.opcodes)
            .map_err(|source| OperationError::Bus {
                source,
                bytes_transferred: 0,
            })?;
        Ok(status & (1 << self.profile.busy_bit) != 0)
    }

    /// Erase a block-aligned range
    ///
    /// Both the offset and the length must be multiples of the erase-block
    /// size. Blocks are erased lowest address first; on failure the error
    /// carries the bytes belonging to blocks the device had already
    /// confirmed erased.
    pub fn erase(&mut self, range: AddressRange) -> Result<(), OperationError> {
        if !self.profile.is_erase_aligned(range.offset, range.len) {
            return Err(OperationError::UnalignedRange);
        }
        if !self.profile.is_valid_range(range.offset, range.len as usize) {
            return Err(OperationError::RangeOutOfBounds);
        }

        let block = self.profile.erase_size;
        log::debug!(
            "erase 0x{:08X}..0x{:08X} in {} byte blocks",
            range.offset,
            range.end(),
            block
        );

        let mut done: usize = 0;
        let mut addr = range.offset;
        while (done as u64) < range.len as u64 {
            protocol::erase_block(&mut self.bus, &self.profile.opcodes, self.addr_width, addr)
                .map_err(|source| OperationError::Bus {
                    source,
                    bytes_transferred: done,
                })?;
            self.wait_ready(done)?;
            done += block as usize;
            addr += block;
        }
        Ok(())
    }

    /// Program a range with the given data
    ///
    /// `data.len()` must equal the range length and the range must lie
    /// inside the device. The range is split at page boundaries so no
    /// single command crosses one; programming only clears bits, so the
    /// range is normally erased first.
    pub fn program(&mut self, range: AddressRange, data: &[u8]) -> Result<(), OperationError> {
        if data.len() != range.len as usize {
            return Err(OperationError::SizeMismatch {
                expected: range.len as usize,
                actual: data.len(),
            });
        }
        if !self.profile.is_valid_range(range.offset, data.len()) {
            return Err(OperationError::RangeOutOfBounds);
        }

        let page = self.profile.page_size as usize;
        let max_write = self.bus.max_write_len();
        log::debug!(
            "program 0x{:08X}..0x{:08X} in {} byte pages",
            range.offset,
            range.end(),
            page
        );

        let mut done: usize = 0;
        while done < data.len() {
            let addr = range.offset + done as u32;
            let page_offset = addr as usize % page;
            let to_page_end = page - page_offset;
            let chunk = (data.len() - done).min(to_page_end).min(max_write);

            protocol::program_page(
                &mut self.bus,
                &self.profile.opcodes,
                self.addr_width,
                addr,
                &data[done..done + chunk],
            )
            .map_err(|source| OperationError::Bus {
                source,
                bytes_transferred: done,
            })?;
            self.wait_ready(done)?;
            done += chunk;
        }
        Ok(())
    }

    /// Read a range into `buf`
    ///
    /// `buf.len()` must equal the range length. Reads in bus-sized chunks;
    /// nothing about device pages constrains reads.
    pub fn read(&mut self, range: AddressRange, buf: &mut [u8]) -> Result<(), OperationError> {
        if buf.len() != range.len as usize {
            return Err(OperationError::SizeMismatch {
                expected: range.len as usize,
                actual: buf.len(),
            });
        }
        if !self.profile.is_valid_range(range.offset, buf.len()) {
            return Err(OperationError::RangeOutOfBounds);
        }

        let max_read = self.bus.max_read_len();
        let mut done: usize = 0;
        while done < buf.len() {
            let chunk = (buf.len() - done).min(max_read);
            protocol::read_at(
                &mut self.bus,
                &self.profile.opcodes,
                self.addr_width,
                range.offset + done as u32,
                &mut buf[done..done + chunk],
            )
            .map_err(|source| OperationError::Bus {
                source,
                bytes_transferred: done,
            })?;
            done += chunk;
        }
        Ok(())
    }

    /// Read a range back and compare against `expected`
    ///
    /// Stops at the first differing byte and reports its device offset and
    /// both values.
    pub fn verify(&mut self, range: AddressRange, expected: &[u8]) -> Result<(), OperationError> {
        if expected.len() != range.len as usize {
            return Err(OperationError::SizeMismatch {
                expected: range.len as usize,
                actual: expected.len(),
            });
        }
        if !self.profile.is_valid_range(range.offset, expected.len()) {
            return Err(OperationError::RangeOutOfBounds);
        }

        let mut chunk_buf = [0u8; VERIFY_CHUNK];
        let mut done: usize = 0;
        while done < expected.len() {
            let chunk = (expected.len() - done).min(VERIFY_CHUNK);
            let addr = range.offset + done as u32;
            self.read(AddressRange::new(addr, chunk as u32), &mut chunk_buf[..chunk])
                .map_err(|e| match e {
                    OperationError::Bus {
                        source,
                        bytes_transferred,
                    } => OperationError::Bus {
                        source,
                        bytes_transferred: done + bytes_transferred,
                    },
                    OperationError::DeviceTimeout { bytes_transferred } => {
                        OperationError::DeviceTimeout {
                            bytes_transferred: done + bytes_transferred,
                        }
                    }
                    other => other,
                })?;
            for i in 0..chunk {
                if chunk_buf[i] != expected[done + i] {
                    return Err(OperationError::VerifyMismatch {
                        offset: addr + i as u32,
                        expected: expected[done + i],
                        found: chunk_buf[i],
                    });
                }
            }
            done += chunk;
        }
        Ok(())
    }

    fn wait_ready(&mut self, bytes_transferred: usize) -> Result<(), OperationError> {
        protocol::wait_ready(
            &mut self.bus,
            &self.profile.opcodes,
            self.profile.busy_bit,
            self.poll.interval_us,
            self.poll.timeout_us,
        )
        .map_err(|e| match e {
            PollError::Bus(source) => OperationError::Bus {
                source,
                bytes_transferred,
            },
            PollError::Timeout => OperationError::DeviceTimeout { bytes_transferred },
        })
    }
}
