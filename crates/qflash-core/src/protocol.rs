//! Single-transaction command sequences
//!
//! Thin helpers that each issue exactly one bus transaction (or, for
//! [`wait_ready`], a loop of status reads). The engine composes these into
//! whole operations; nothing here validates ranges or splits pages.

use crate::bus::FlashBus;
use crate::error::BusError;
use crate::profile::OpcodeSet;
use crate::spi::{opcodes, AddressWidth, BusCommand};

/// Dummy clock cycles between the discovery-read address and the first data byte
pub const SFDP_DUMMY_CYCLES: u8 = 8;

/// Outcome of a busy-poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollError {
    /// Status read failed
    Bus(BusError),
    /// Busy flag stayed set for the whole poll budget
    Timeout,
}

impl From<BusError> for PollError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

/// Set the write-enable latch
pub fn write_enable<B: FlashBus>(bus: &mut B, ops: &OpcodeSet) -> Result<(), BusError> {
    bus.transfer(&mut BusCommand::simple(ops.write_enable))
}

/// Read the status register
pub fn read_status<B: FlashBus>(bus: &mut B, ops: &OpcodeSet) -> Result<u8, BusError> {
    let mut status = [0u8; 1];
    bus.transfer(&mut BusCommand::read_reg(ops.read_status, &mut status))?;
    Ok(status[0])
}

/// Poll the status register until the busy bit clears
///
/// Polls every `interval_us` microseconds. A `timeout_us` of zero polls
/// without bound; otherwise the busy flag must clear within roughly
/// `timeout_us` microseconds or the loop gives up with
/// [`PollError::Timeout`]. The first status read happens immediately so a
/// device that is already idle costs one transaction and no delay.
pub(crate) fn wait_ready<B: FlashBus>(
    bus: &mut B,
    ops: &OpcodeSet,
    busy_bit: u8,
    interval_us: u32,
    timeout_us: u32,
) -> Result<(), PollError> {
    let busy_mask = 1u8 << busy_bit;
    let interval = interval_us.max(1);
    let max_polls = if timeout_us == 0 {
        u64::MAX
    } else {
        // At least one poll even for a budget shorter than the interval
        (u64::from(timeout_us) / u64::from(interval)).max(1)
    };

    let mut polls: u64 = 0;
    loop {
        let status = read_status(bus, ops)?;
        if status & busy_mask == 0 {
            return Ok(());
        }
        polls += 1;
        if polls >= max_polls {
            return Err(PollError::Timeout);
        }
        bus.delay_us(interval);
    }
}

/// Read data starting at `addr` into `buf` with a single transaction
///
/// `buf` must not exceed the bus's per-transaction read limit.
pub fn read_at<B: FlashBus>(
    bus: &mut B,
    ops: &OpcodeSet,
    width: AddressWidth,
    addr: u32,
    buf: &mut [u8],
) -> Result<(), BusError> {
    bus.transfer(&mut BusCommand::read(ops.read, width, addr, buf))
}

/// Program one run of bytes within a single page
///
/// Issues write-enable then the program command. The caller is responsible
/// for keeping `data` inside one page and within the bus write limit, and
/// for waiting on the busy flag afterwards.
pub fn program_page<B: FlashBus>(
    bus: &mut B,
    ops: &OpcodeSet,
    width: AddressWidth,
    addr: u32,
    data: &[u8],
) -> Result<(), BusError> {
    write_enable(bus, ops)?;
    bus.transfer(&mut BusCommand::write(ops.page_program, width, addr, data))
}

/// Erase the block containing `addr`
///
/// Issues write-enable then the erase command. The caller waits on the busy
/// flag afterwards.
pub fn erase_block<B: FlashBus>(
    bus: &mut B,
    ops: &OpcodeSet,
    width: AddressWidth,
    addr: u32,
) -> Result<(), BusError> {
    write_enable(bus, ops)?;
    bus.transfer(&mut BusCommand::erase(ops.erase, width, addr))
}

/// Read from the discovery parameter space
///
/// The discovery address space is separate from the data array and is always
/// addressed with 3 bytes plus [`SFDP_DUMMY_CYCLES`] dummy cycles. Splits
/// the read into bus-sized chunks.
pub fn read_sfdp<B: FlashBus>(bus: &mut B, addr: u32, buf: &mut [u8]) -> Result<(), BusError> {
    let max_chunk = bus.max_read_len();
    let mut done = 0usize;
    while done < buf.len() {
        let chunk = (buf.len() - done).min(max_chunk);
        let mut cmd = BusCommand::read(
            opcodes::RDSFDP,
            AddressWidth::ThreeByte,
            addr + done as u32,
            &mut buf[done..done + chunk],
        )
        .with_dummy_cycles(SFDP_DUMMY_CYCLES);
        bus.transfer(&mut cmd)?;
        done += chunk;
    }
    Ok(())
}
