//! Bus command descriptor

use super::AddressWidth;

/// A single request/response bus transaction
///
/// Designed to avoid allocation - uses borrowed slices for data. The
/// lifetime parameter `'a` ties the command to the buffers it references.
/// The engine fills in opcode and address from the resolved profile; the
/// bus implementation decides how the phases appear on the wire.
pub struct BusCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of dummy clock cycles after the address phase
    pub dummy_cycles: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> BusCommand<'a> {
    /// Create a command with no address or data (e.g., write-enable)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a register read with no address (e.g., read-status)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create an addressed read command
    pub fn read(opcode: u8, width: AddressWidth, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create an addressed write command (e.g., page-program)
    pub fn write(opcode: u8, width: AddressWidth, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            dummy_cycles: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an addressed command with no data phase (e.g., block-erase)
    pub fn erase(opcode: u8, width: AddressWidth, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Length of the opcode+address+dummy header in bytes
    ///
    /// Dummy cycles are counted assuming a single data line (8 cycles per
    /// byte); multi-line bus implementations may need to adjust.
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + (self.dummy_cycles as usize) / 8
    }

    /// Encode the opcode/address/dummy header into `buf`
    ///
    /// `buf` must be at least `header_len()` bytes. Useful for bus
    /// implementations that transmit the header as a plain byte stream.
    pub fn encode_header(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[1..]);
        }
        let dummy_start = 1 + self.address_width.bytes() as usize;
        for b in &mut buf[dummy_start..self.header_len()] {
            *b = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_encoding_three_byte() {
        let mut buf = [0u8; 8];
        let cmd = BusCommand::read(0x03, AddressWidth::ThreeByte, 0x123456, &mut buf);
        assert_eq!(cmd.header_len(), 4);

        let mut header = [0u8; 4];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x03, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn header_encoding_with_dummy_cycles() {
        let mut buf = [0u8; 8];
        let cmd =
            BusCommand::read(0x5A, AddressWidth::ThreeByte, 0x08, &mut buf).with_dummy_cycles(8);
        assert_eq!(cmd.header_len(), 5);

        let mut header = [0xAAu8; 5];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x5A, 0x00, 0x00, 0x08, 0x00]);
    }

    #[test]
    fn simple_command_has_no_phases() {
        let cmd = BusCommand::simple(0x06);
        assert!(!cmd.has_read());
        assert!(!cmd.has_write());
        assert_eq!(cmd.header_len(), 1);
    }
}
