//! Bus-transaction primitive
//!
//! The engine drives the device through this single narrow trait. It does
//! not know how many physical data lines are used or what clock rate the
//! controller runs at - only that a command either completes or fails with
//! a transport error.

use crate::error::BusError;
use crate::spi::BusCommand;

/// A blocking request/response transaction primitive bound to one chip-select
///
/// Implementations own the controller handle (or emulation state) for
/// exactly one physical device. The engine assumes nothing else issues
/// transactions to the same chip-select while it holds the bus.
pub trait FlashBus {
    /// Maximum number of bytes one transaction can read
    fn max_read_len(&self) -> usize;

    /// Maximum number of bytes one transaction can write
    fn max_write_len(&self) -> usize;

    /// Execute a single bus transaction
    ///
    /// The command carries the opcode, optional address, dummy-cycle count,
    /// outgoing data, and the buffer any response is read into. On error
    /// the contents of `cmd.read_buf` are undefined.
    fn transfer(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError>;

    /// Delay for the specified number of microseconds
    ///
    /// Used by the busy-poll loop between status reads. Emulated buses may
    /// treat this as a no-op.
    fn delay_us(&mut self, us: u32);
}

// Blanket impl for boxed buses to allow trait objects
#[cfg(feature = "alloc")]
impl FlashBus for alloc::boxed::Box<dyn FlashBus + Send> {
    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn transfer(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
        (**self).transfer(cmd)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
